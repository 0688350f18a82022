#![no_main]

use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use milli_tls::crypto::rustcrypto::RustCrypto;
use milli_tls::{Config, Connection, PrivateKey, Rng, StaticCertificates, TicketKey};

struct CounterRng(u8);

impl Rng for CounterRng {
    fn fill(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.0;
            self.0 = self.0.wrapping_add(1);
        }
    }
}

static CONFIG: LazyLock<Arc<Config>> = LazyLock::new(|| {
    let key = PrivateKey::Ed25519([1; 32]);
    let cert = key.self_signed_certificate("fuzz").unwrap();
    let config = Config::server()
        .with_alpn(&[b"h3"])
        .unwrap()
        .with_ticket_key(TicketKey::new("AES128-GCM", &[7; 28]).unwrap())
        .with_early_data(true)
        .with_certificates(Arc::new(StaticCertificates::new().with_identity(vec![cert], key)));
    Arc::new(config)
});

fuzz_target!(|data: &[u8]| {
    // A server fed arbitrary bytes, in arbitrary chunks, must fail cleanly.
    let mut server = Connection::new(RustCrypto, CONFIG.clone(), &mut CounterRng(0)).unwrap();
    let mut out = [0u8; 512];
    for chunk in data.chunks(97) {
        let p = server.process(chunk, &mut out);
        assert!(p.written <= out.len());
        assert!(p.consumed <= chunk.len());
        if p.result.is_error() {
            let again = server.process(chunk, &mut out);
            assert_eq!(again.result, p.result);
            assert_eq!((again.consumed, again.written), (0, 0));
            break;
        }
    }
});
