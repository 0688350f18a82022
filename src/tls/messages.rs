//! TLS 1.3 handshake message encoding and decoding.
//!
//! Handshake message format:
//!   HandshakeType (1 byte)
//!   Length (3 bytes, big-endian)
//!   Body (Length bytes)
//!
//! Parsers take the body (after the 4-byte header) and borrow from it;
//! encoders return the complete message including the header.

use alloc::string::String;
use alloc::vec::Vec;

use crate::crypto::{AeadAlgorithm, HashAlgorithm};
use crate::error::{Error, Result};
use crate::pki;
use crate::tls::codec::{
    expect_end, get_bytes, get_u16, get_u24, get_u32, get_u8, get_vec16, get_vec24, get_vec8,
    put_u16, put_u32, put_vec16, put_vec24, put_vec8,
};
use crate::tls::extensions;

/// `supported_versions` value for TLS 1.3.
pub const TLS13: u16 = 0x0304;

/// `legacy_version` carried in ClientHello and ServerHello.
pub const LEGACY_VERSION: u16 = 0x0303;

/// ServerHello.random of a HelloRetryRequest (RFC 8446 section 4.1.3).
pub const HRR_RANDOM: [u8; 32] = [
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8, 0x91,
    0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8, 0x33, 0x9c,
];

/// Length of the handshake message header.
pub const HEADER_LEN: usize = 4;

/// TLS handshake message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandshakeType {
    ClientHello = 1,
    ServerHello = 2,
    NewSessionTicket = 4,
    EndOfEarlyData = 5,
    EncryptedExtensions = 8,
    Certificate = 11,
    CertificateRequest = 13,
    CertificateVerify = 15,
    Finished = 20,
    KeyUpdate = 24,
    MessageHash = 254,
}

impl HandshakeType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::ClientHello),
            2 => Some(Self::ServerHello),
            4 => Some(Self::NewSessionTicket),
            5 => Some(Self::EndOfEarlyData),
            8 => Some(Self::EncryptedExtensions),
            11 => Some(Self::Certificate),
            13 => Some(Self::CertificateRequest),
            15 => Some(Self::CertificateVerify),
            20 => Some(Self::Finished),
            24 => Some(Self::KeyUpdate),
            254 => Some(Self::MessageHash),
            _ => None,
        }
    }

    /// Message name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::ClientHello => "ClientHello",
            Self::ServerHello => "ServerHello",
            Self::NewSessionTicket => "NewSessionTicket",
            Self::EndOfEarlyData => "EndOfEarlyData",
            Self::EncryptedExtensions => "EncryptedExtensions",
            Self::Certificate => "Certificate",
            Self::CertificateRequest => "CertificateRequest",
            Self::CertificateVerify => "CertificateVerify",
            Self::Finished => "Finished",
            Self::KeyUpdate => "KeyUpdate",
            Self::MessageHash => "message_hash",
        }
    }
}

/// TLS 1.3 cipher suites we support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CipherSuite {
    TlsAes128GcmSha256,
    TlsAes256GcmSha384,
    TlsChacha20Poly1305Sha256,
}

impl CipherSuite {
    pub fn to_u16(self) -> u16 {
        match self {
            Self::TlsAes128GcmSha256 => 0x1301,
            Self::TlsAes256GcmSha384 => 0x1302,
            Self::TlsChacha20Poly1305Sha256 => 0x1303,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x1301 => Some(Self::TlsAes128GcmSha256),
            0x1302 => Some(Self::TlsAes256GcmSha384),
            0x1303 => Some(Self::TlsChacha20Poly1305Sha256),
            _ => None,
        }
    }

    /// IANA name, as used in policy strings.
    pub fn name(self) -> &'static str {
        match self {
            Self::TlsAes128GcmSha256 => "TLS_AES_128_GCM_SHA256",
            Self::TlsAes256GcmSha384 => "TLS_AES_256_GCM_SHA384",
            Self::TlsChacha20Poly1305Sha256 => "TLS_CHACHA20_POLY1305_SHA256",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::TlsAes128GcmSha256,
            Self::TlsAes256GcmSha384,
            Self::TlsChacha20Poly1305Sha256,
        ]
        .into_iter()
        .find(|suite| suite.name() == name)
    }

    pub fn hash(self) -> HashAlgorithm {
        match self {
            Self::TlsAes256GcmSha384 => HashAlgorithm::Sha384,
            Self::TlsAes128GcmSha256 | Self::TlsChacha20Poly1305Sha256 => HashAlgorithm::Sha256,
        }
    }

    pub fn aead(self) -> AeadAlgorithm {
        match self {
            Self::TlsAes128GcmSha256 => AeadAlgorithm::Aes128Gcm,
            Self::TlsAes256GcmSha384 => AeadAlgorithm::Aes256Gcm,
            Self::TlsChacha20Poly1305Sha256 => AeadAlgorithm::ChaCha20Poly1305,
        }
    }
}

/// Parsed ClientHello message.
pub struct ClientHello<'a> {
    pub random: &'a [u8; 32],
    pub session_id: &'a [u8],
    pub cipher_suites: &'a [u8],
    pub extensions: &'a [u8],
}

impl ClientHello<'_> {
    /// Offered cipher suites we know, in client order.
    pub fn known_cipher_suites(&self) -> impl Iterator<Item = CipherSuite> + '_ {
        iter_cipher_suites(self.cipher_suites).filter_map(CipherSuite::from_u16)
    }
}

/// Parsed ServerHello (or HelloRetryRequest) message.
pub struct ServerHello<'a> {
    pub random: &'a [u8; 32],
    pub session_id: &'a [u8],
    /// Raw suite code; the client checks it against what it offered.
    pub cipher_suite: u16,
    pub extensions: &'a [u8],
}

impl ServerHello<'_> {
    /// Whether this is a HelloRetryRequest.
    pub fn is_retry_request(&self) -> bool {
        self.random == &HRR_RANDOM
    }
}

/// Parsed Certificate message.
pub struct CertificatePayload<'a> {
    /// The certificate request context (empty for server certs).
    pub context: &'a [u8],
    /// Raw certificate entries data (list of CertificateEntry).
    pub entries: &'a [u8],
}

/// A single certificate entry from the Certificate message.
pub struct CertificateEntry<'a> {
    /// DER-encoded certificate data.
    pub cert_data: &'a [u8],
    /// Extensions (usually empty).
    pub extensions: &'a [u8],
}

/// Parsed CertificateVerify message.
pub struct CertificateVerify<'a> {
    pub algorithm: u16,
    pub signature: &'a [u8],
}

/// NewSessionTicket (RFC 8446 section 4.6.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionTicket<'a> {
    /// Seconds; at most 7 days.
    pub lifetime: u32,
    pub age_add: u32,
    pub nonce: &'a [u8],
    pub ticket: &'a [u8],
    pub extensions: &'a [u8],
}

/// Maximum ticket lifetime (RFC 8446 section 4.6.1).
pub const MAX_TICKET_LIFETIME: u32 = 604_800;

/// Wrap a body in the 4-byte handshake header.
pub fn encode_handshake(msg_type: HandshakeType, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.push(msg_type as u8);
    put_vec24(&mut out, body);
    out
}

/// Read the handshake header: returns (type_byte, body_length).
pub fn read_handshake_header(data: &[u8]) -> Result<(u8, usize)> {
    let mut off = 0;
    let msg_type = get_u8(data, &mut off, "handshake header")?;
    let length = get_u24(data, &mut off, "handshake header")?;
    Ok((msg_type, length))
}

/// Encode a ClientHello message.
///
/// `legacy_session_id` is always empty over QUIC (RFC 9001 section 8.4).
pub fn encode_client_hello(
    random: &[u8; 32],
    cipher_suites: &[CipherSuite],
    extensions_buf: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + 32 + 1 + 2 + cipher_suites.len() * 2 + 2 + 2 + extensions_buf.len());
    put_u16(&mut body, LEGACY_VERSION);
    body.extend_from_slice(random);
    put_vec8(&mut body, &[]);
    put_u16(&mut body, (cipher_suites.len() * 2) as u16);
    for cs in cipher_suites {
        put_u16(&mut body, cs.to_u16());
    }
    // Compression methods: only "null".
    put_vec8(&mut body, &[0]);
    put_vec16(&mut body, extensions_buf);
    encode_handshake(HandshakeType::ClientHello, &body)
}

/// Parse a ClientHello message body (after the 4-byte handshake header).
pub fn parse_client_hello(data: &[u8]) -> Result<ClientHello<'_>> {
    let mut off = 0;
    let _legacy_version = get_u16(data, &mut off, "ClientHello")?;
    let random: &[u8; 32] = get_bytes(data, &mut off, 32, "ClientHello")?
        .try_into()
        .map_err(|_| Error::Decode("ClientHello"))?;
    let session_id = get_vec8(data, &mut off, "ClientHello session id")?;
    if session_id.len() > 32 {
        return Err(Error::Decode("ClientHello session id"));
    }
    let cipher_suites = get_vec16(data, &mut off, "ClientHello cipher suites")?;
    if cipher_suites.is_empty() || cipher_suites.len() % 2 != 0 {
        return Err(Error::Decode("ClientHello cipher suites"));
    }
    let compression = get_vec8(data, &mut off, "ClientHello compression methods")?;
    if compression != [0] {
        return Err(Error::IllegalParameter("compression methods"));
    }
    // TLS 1.3 is only negotiated through extensions, so they are mandatory here.
    let extensions = get_vec16(data, &mut off, "ClientHello extensions")?;
    expect_end(data, off, "ClientHello")?;

    Ok(ClientHello {
        random,
        session_id,
        cipher_suites,
        extensions,
    })
}

/// Iterate over cipher suites in a ClientHello cipher_suites field.
pub fn iter_cipher_suites(data: &[u8]) -> impl Iterator<Item = u16> + '_ {
    data.chunks_exact(2).map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
}

/// Encode a ServerHello (or, with [`HRR_RANDOM`], a HelloRetryRequest).
pub fn encode_server_hello(
    random: &[u8; 32],
    session_id: &[u8],
    cipher_suite: CipherSuite,
    extensions_buf: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + 32 + 1 + session_id.len() + 2 + 1 + 2 + extensions_buf.len());
    put_u16(&mut body, LEGACY_VERSION);
    body.extend_from_slice(random);
    put_vec8(&mut body, session_id);
    put_u16(&mut body, cipher_suite.to_u16());
    body.push(0); // null compression
    put_vec16(&mut body, extensions_buf);
    encode_handshake(HandshakeType::ServerHello, &body)
}

/// Parse a ServerHello message body (after the 4-byte handshake header).
pub fn parse_server_hello(data: &[u8]) -> Result<ServerHello<'_>> {
    let mut off = 0;
    let legacy_version = get_u16(data, &mut off, "ServerHello")?;
    if legacy_version != LEGACY_VERSION {
        return Err(Error::ProtocolVersion);
    }
    let random: &[u8; 32] = get_bytes(data, &mut off, 32, "ServerHello")?
        .try_into()
        .map_err(|_| Error::Decode("ServerHello"))?;
    let session_id = get_vec8(data, &mut off, "ServerHello session id")?;
    let cipher_suite = get_u16(data, &mut off, "ServerHello")?;
    if get_u8(data, &mut off, "ServerHello")? != 0 {
        return Err(Error::IllegalParameter("compression method"));
    }
    let extensions = get_vec16(data, &mut off, "ServerHello extensions")?;
    expect_end(data, off, "ServerHello")?;

    Ok(ServerHello {
        random,
        session_id,
        cipher_suite,
        extensions,
    })
}

/// Encode an EncryptedExtensions message from already-encoded extensions.
pub fn encode_encrypted_extensions(extensions_buf: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + extensions_buf.len());
    put_vec16(&mut body, extensions_buf);
    encode_handshake(HandshakeType::EncryptedExtensions, &body)
}

/// Parse an EncryptedExtensions message body. Returns the raw extensions.
pub fn parse_encrypted_extensions(data: &[u8]) -> Result<&[u8]> {
    let mut off = 0;
    let extensions = get_vec16(data, &mut off, "EncryptedExtensions")?;
    expect_end(data, off, "EncryptedExtensions")?;
    Ok(extensions)
}

/// Encode a Certificate message from a chain (`u24 length || DER` entries,
/// leaf first). Every entry gets empty extensions.
pub fn encode_certificate(chain: &[u8]) -> Result<Vec<u8>> {
    let mut list = Vec::with_capacity(chain.len() + 8);
    for cert in pki::split_chain(chain)? {
        put_vec24(&mut list, cert);
        put_u16(&mut list, 0);
    }
    if list.is_empty() {
        return Err(Error::Certificate("empty certificate chain"));
    }
    let mut body = Vec::with_capacity(1 + 3 + list.len());
    put_vec8(&mut body, &[]);
    put_vec24(&mut body, &list);
    Ok(encode_handshake(HandshakeType::Certificate, &body))
}

/// Parse a Certificate message body (after header).
pub fn parse_certificate(data: &[u8]) -> Result<CertificatePayload<'_>> {
    let mut off = 0;
    let context = get_vec8(data, &mut off, "Certificate")?;
    let entries = get_vec24(data, &mut off, "Certificate")?;
    expect_end(data, off, "Certificate")?;
    Ok(CertificatePayload { context, entries })
}

/// Iterate over certificate entries in a CertificatePayload.
pub fn iter_certificate_entries(
    data: &[u8],
) -> impl Iterator<Item = Result<CertificateEntry<'_>>> + '_ {
    let mut off = 0;
    let mut failed = false;
    core::iter::from_fn(move || {
        if failed || off >= data.len() {
            return None;
        }
        let entry = get_vec24(data, &mut off, "CertificateEntry").and_then(|cert_data| {
            let extensions = get_vec16(data, &mut off, "CertificateEntry")?;
            Ok(CertificateEntry {
                cert_data,
                extensions,
            })
        });
        failed = entry.is_err();
        Some(entry)
    })
}

/// Rebuild the certificate chain (`u24 length || DER` per entry) from a
/// Certificate message, dropping per-entry extensions.
pub fn certificate_chain(payload: &CertificatePayload<'_>) -> Result<Vec<u8>> {
    let mut chain = Vec::with_capacity(payload.entries.len());
    for entry in iter_certificate_entries(payload.entries) {
        put_vec24(&mut chain, entry?.cert_data);
    }
    Ok(chain)
}

/// Encode a CertificateVerify message.
pub fn encode_certificate_verify(algorithm: u16, signature: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + signature.len());
    put_u16(&mut body, algorithm);
    put_vec16(&mut body, signature);
    encode_handshake(HandshakeType::CertificateVerify, &body)
}

/// Parse a CertificateVerify message body (after header).
pub fn parse_certificate_verify(data: &[u8]) -> Result<CertificateVerify<'_>> {
    let mut off = 0;
    let algorithm = get_u16(data, &mut off, "CertificateVerify")?;
    let signature = get_vec16(data, &mut off, "CertificateVerify")?;
    expect_end(data, off, "CertificateVerify")?;
    Ok(CertificateVerify {
        algorithm,
        signature,
    })
}

/// Encode a Finished message (header + verify_data).
pub fn encode_finished(verify_data: &[u8]) -> Vec<u8> {
    encode_handshake(HandshakeType::Finished, verify_data)
}

/// Parse a Finished message body. `verify_data` is exactly one hash long.
pub fn parse_finished(data: &[u8], hash_len: usize) -> Result<&[u8]> {
    if data.len() != hash_len {
        return Err(Error::Decode("Finished"));
    }
    Ok(data)
}

/// Encode a NewSessionTicket message.
pub fn encode_new_session_ticket(nst: &NewSessionTicket<'_>) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + 4 + 1 + nst.nonce.len() + 2 + nst.ticket.len() + 2 + nst.extensions.len());
    put_u32(&mut body, nst.lifetime);
    put_u32(&mut body, nst.age_add);
    put_vec8(&mut body, nst.nonce);
    put_vec16(&mut body, nst.ticket);
    put_vec16(&mut body, nst.extensions);
    encode_handshake(HandshakeType::NewSessionTicket, &body)
}

/// Parse a NewSessionTicket message body.
pub fn parse_new_session_ticket(data: &[u8]) -> Result<NewSessionTicket<'_>> {
    let mut off = 0;
    let lifetime = get_u32(data, &mut off, "NewSessionTicket")?;
    if lifetime > MAX_TICKET_LIFETIME {
        return Err(Error::IllegalParameter("ticket lifetime"));
    }
    let age_add = get_u32(data, &mut off, "NewSessionTicket")?;
    let nonce = get_vec8(data, &mut off, "NewSessionTicket nonce")?;
    let ticket = get_vec16(data, &mut off, "NewSessionTicket")?;
    if ticket.is_empty() {
        return Err(Error::Decode("NewSessionTicket"));
    }
    let extensions = get_vec16(data, &mut off, "NewSessionTicket extensions")?;
    expect_end(data, off, "NewSessionTicket")?;
    Ok(NewSessionTicket {
        lifetime,
        age_add,
        nonce,
        ticket,
        extensions,
    })
}

/// The synthetic `message_hash` message that replaces ClientHello1 in the
/// transcript after a HelloRetryRequest (RFC 8446 section 4.4.1).
pub fn encode_message_hash(client_hello_hash: &[u8]) -> Vec<u8> {
    encode_handshake(HandshakeType::MessageHash, client_hello_hash)
}

/// What a server may want to know about a ClientHello before creating a
/// connection for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelloSummary {
    pub server_name: Option<String>,
    pub alpn: Vec<Vec<u8>>,
    /// Raw extension block.
    pub extensions: Vec<u8>,
}

/// Summarize a complete ClientHello message (header included).
pub fn hello_summary(message: &[u8]) -> Result<HelloSummary> {
    let (msg_type, len) = read_handshake_header(message)?;
    if msg_type != HandshakeType::ClientHello as u8 {
        return Err(Error::UnexpectedMessage("non-ClientHello"));
    }
    let body = message
        .get(HEADER_LEN..HEADER_LEN + len)
        .ok_or(Error::Decode("ClientHello"))?;
    let ch = parse_client_hello(body)?;
    let exts = extensions::parse_client_hello_extensions(ch.extensions)?;
    Ok(HelloSummary {
        server_name: exts.server_name.map(String::from),
        alpn: exts.alpn_protocols.iter().map(|p| p.to_vec()).collect(),
        extensions: ch.extensions.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_suite_roundtrip() {
        for suite in [
            CipherSuite::TlsAes128GcmSha256,
            CipherSuite::TlsAes256GcmSha384,
            CipherSuite::TlsChacha20Poly1305Sha256,
        ] {
            assert_eq!(CipherSuite::from_u16(suite.to_u16()), Some(suite));
            assert_eq!(CipherSuite::from_name(suite.name()), Some(suite));
        }
        assert_eq!(CipherSuite::from_u16(0xFFFF), None);
        assert_eq!(CipherSuite::TlsAes256GcmSha384.hash(), HashAlgorithm::Sha384);
        assert_eq!(
            CipherSuite::TlsChacha20Poly1305Sha256.aead(),
            AeadAlgorithm::ChaCha20Poly1305
        );
    }

    #[test]
    fn handshake_type_roundtrip() {
        assert_eq!(HandshakeType::from_u8(1), Some(HandshakeType::ClientHello));
        assert_eq!(HandshakeType::from_u8(4), Some(HandshakeType::NewSessionTicket));
        assert_eq!(HandshakeType::from_u8(254), Some(HandshakeType::MessageHash));
        assert_eq!(HandshakeType::from_u8(99), None);
        assert_eq!(HandshakeType::Finished.name(), "Finished");
    }

    #[test]
    fn encode_parse_client_hello() {
        let random = [0x42u8; 32];
        let suites = [
            CipherSuite::TlsAes128GcmSha256,
            CipherSuite::TlsChacha20Poly1305Sha256,
        ];
        let extensions = [0xAA, 0xBB, 0x00, 0x00];
        let buf = encode_client_hello(&random, &suites, &extensions);

        let (msg_type, body_len) = read_handshake_header(&buf).unwrap();
        assert_eq!(msg_type, HandshakeType::ClientHello as u8);
        assert_eq!(body_len + 4, buf.len());

        // legacy_version, random, empty session id, suites, compression
        assert_eq!(&buf[4..6], &[0x03, 0x03]);
        assert_eq!(&buf[6..38], &[0x42u8; 32]);
        assert_eq!(buf[38], 0);
        assert_eq!(&buf[39..45], &[0x00, 0x04, 0x13, 0x01, 0x13, 0x03]);
        assert_eq!(&buf[45..47], &[1, 0]);

        let ch = parse_client_hello(&buf[4..]).unwrap();
        assert_eq!(ch.random, &random);
        assert!(ch.session_id.is_empty());
        assert_eq!(ch.known_cipher_suites().collect::<Vec<_>>(), suites);
        assert_eq!(ch.extensions, &extensions);
    }

    #[test]
    fn client_hello_with_compression_rejected() {
        let mut buf = encode_client_hello(&[0u8; 32], &[CipherSuite::TlsAes128GcmSha256], &[]);
        // compression method list [0] -> [1]
        buf[44] = 1;
        assert_eq!(
            parse_client_hello(&buf[4..]).err(),
            Some(Error::IllegalParameter("compression methods"))
        );
    }

    #[test]
    fn server_hello_and_retry_request() {
        let sh = encode_server_hello(&[7u8; 32], &[], CipherSuite::TlsAes128GcmSha256, &[]);
        let parsed = parse_server_hello(&sh[4..]).unwrap();
        assert_eq!(parsed.cipher_suite, 0x1301);
        assert!(!parsed.is_retry_request());

        let hrr = encode_server_hello(&HRR_RANDOM, &[], CipherSuite::TlsAes128GcmSha256, &[]);
        assert!(parse_server_hello(&hrr[4..]).unwrap().is_retry_request());
    }

    #[test]
    fn finished_length_must_match_hash() {
        let buf = encode_finished(&[0xAB; 32]);
        assert_eq!(buf.len(), 36);
        assert_eq!(parse_finished(&buf[4..], 32).unwrap(), &[0xAB; 32]);
        assert!(parse_finished(&buf[4..], 48).is_err());
    }

    #[test]
    fn parse_encrypted_extensions_basic() {
        let data = [0x00, 0x04, 0x01, 0x02, 0x03, 0x04];
        assert_eq!(parse_encrypted_extensions(&data).unwrap(), &[0x01, 0x02, 0x03, 0x04]);
        assert!(parse_encrypted_extensions(&data[..5]).is_err());
    }

    #[test]
    fn parse_certificate_verify_basic() {
        let data = [0x08, 0x07, 0x00, 0x04, 0xDE, 0xAD, 0xBE, 0xEF];
        let cv = parse_certificate_verify(&data).unwrap();
        assert_eq!(cv.algorithm, 0x0807);
        assert_eq!(cv.signature, &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn certificate_chain_roundtrip() {
        let chain = pki::encode_chain(&[&[1u8, 2, 3, 4, 5][..], &[9u8][..]]);
        let msg = encode_certificate(&chain).unwrap();
        let payload = parse_certificate(&msg[4..]).unwrap();
        assert!(payload.context.is_empty());

        let certs: Vec<_> = iter_certificate_entries(payload.entries)
            .map(|e| e.unwrap().cert_data)
            .collect();
        assert_eq!(certs, [&[1u8, 2, 3, 4, 5][..], &[9u8][..]]);
        assert_eq!(certificate_chain(&payload).unwrap(), chain);
    }

    #[test]
    fn truncated_certificate_entry_is_error() {
        // cert of 5 bytes claimed, 2 present
        let entries = [0x00, 0x00, 0x05, 0x01, 0x02];
        let mut it = iter_certificate_entries(&entries);
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }

    #[test]
    fn new_session_ticket_roundtrip() {
        let nst = NewSessionTicket {
            lifetime: 3600,
            age_add: 0x01020304,
            nonce: &[0, 1],
            ticket: &[0xAA; 40],
            extensions: &[0x00, 0x2a, 0x00, 0x04, 0xff, 0xff, 0xff, 0xff],
        };
        let buf = encode_new_session_ticket(&nst);
        assert_eq!(buf[0], HandshakeType::NewSessionTicket as u8);
        assert_eq!(parse_new_session_ticket(&buf[4..]).unwrap(), nst);
    }

    #[test]
    fn excessive_ticket_lifetime_rejected() {
        let nst = NewSessionTicket {
            lifetime: MAX_TICKET_LIFETIME + 1,
            age_add: 0,
            nonce: &[],
            ticket: &[1],
            extensions: &[],
        };
        let buf = encode_new_session_ticket(&nst);
        assert!(parse_new_session_ticket(&buf[4..]).is_err());
    }

    #[test]
    fn message_hash_format() {
        let buf = encode_message_hash(&[0x11; 32]);
        assert_eq!(&buf[..4], &[254, 0, 0, 32]);
        assert_eq!(&buf[4..], &[0x11; 32]);
    }
}
