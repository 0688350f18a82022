#![no_main]

use libfuzzer_sys::fuzz_target;
use milli_tls::tls::TransportParams;

fuzz_target!(|data: &[u8]| {
    // Whatever decodes must encode and decode back to the same value.
    if let Ok(params) = TransportParams::decode(data) {
        let mut out = Vec::new();
        params.encode(&mut out).unwrap();
        assert_eq!(TransportParams::decode(&out).unwrap(), params);
    }
});
