#![no_main]

use libfuzzer_sys::fuzz_target;
use milli_tls::tls::{extensions, messages};

fuzz_target!(|data: &[u8]| {
    // Message and extension parsers must never panic.

    if let Ok((msg_type, body_len)) = messages::read_handshake_header(data) {
        if let Some(body) = data.get(4..4 + body_len) {
            match messages::HandshakeType::from_u8(msg_type) {
                Some(messages::HandshakeType::ClientHello) => {
                    if let Ok(ch) = messages::parse_client_hello(body) {
                        let _ = extensions::parse_client_hello_extensions(ch.extensions);
                    }
                    let _ = messages::hello_summary(data);
                }
                Some(messages::HandshakeType::ServerHello) => {
                    if let Ok(sh) = messages::parse_server_hello(body) {
                        let _ = extensions::parse_server_hello_extensions(
                            sh.extensions,
                            sh.is_retry_request(),
                        );
                    }
                }
                Some(messages::HandshakeType::EncryptedExtensions) => {
                    if let Ok(raw) = messages::parse_encrypted_extensions(body) {
                        let _ = extensions::parse_encrypted_extensions_data(raw);
                    }
                }
                Some(messages::HandshakeType::Certificate) => {
                    if let Ok(cert) = messages::parse_certificate(body) {
                        let _ = messages::certificate_chain(&cert);
                    }
                }
                Some(messages::HandshakeType::CertificateVerify) => {
                    let _ = messages::parse_certificate_verify(body);
                }
                Some(messages::HandshakeType::Finished) => {
                    let _ = messages::parse_finished(body, 32);
                    let _ = messages::parse_finished(body, 48);
                }
                Some(messages::HandshakeType::NewSessionTicket) => {
                    if let Ok(nst) = messages::parse_new_session_ticket(body) {
                        let _ = extensions::parse_ticket_extensions(nst.extensions);
                    }
                }
                _ => {}
            }
        }
    }

    // Also try each parser directly on the raw data
    let _ = messages::parse_client_hello(data);
    let _ = messages::parse_server_hello(data);
    let _ = messages::parse_encrypted_extensions(data);
    let _ = messages::parse_certificate(data);
    let _ = messages::parse_certificate_verify(data);
    let _ = messages::parse_new_session_ticket(data);
    let _ = extensions::parse_client_hello_extensions(data);
    let _ = extensions::find_custom_extension(data, 0xff00);
});
