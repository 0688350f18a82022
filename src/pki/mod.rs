//! Certificate selection, signing and verification hooks.
//!
//! The handshake engine never parses X.509 itself. The server asks a
//! [`CertificateCallbacks`] implementation which certificate to present and
//! to sign the CertificateVerify content; the client hands it the received
//! chain together with the signature to check. [`StaticCertificates`] is a
//! small in-memory implementation with pinned trust anchors.

mod der;
pub mod ecdsa_p256;
pub mod ed25519;
mod static_certs;

use alloc::vec::Vec;

pub use static_certs::{PrivateKey, StaticCertificates};

use crate::error::{Error, Result};

/// Signature schemes (RFC 8446 section 4.2.3) usable in CertificateVerify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SignatureScheme {
    EcdsaSecp256r1Sha256 = 0x0403,
    Ed25519 = 0x0807,
}

impl SignatureScheme {
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0403 => Some(Self::EcdsaSecp256r1Sha256),
            0x0807 => Some(Self::Ed25519),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

/// Opaque reference to a certificate owned by the callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateHandle(pub usize);

/// PKI collaborator.
///
/// A chain is the concatenation of `u24 length || DER certificate`
/// entries, leaf first.
pub trait CertificateCallbacks: Send + Sync {
    /// Pick a certificate and scheme for a ClientHello.
    ///
    /// `offered` is the client's list filtered to the server's policy, in
    /// server preference order. `None` aborts the handshake.
    fn select(
        &self,
        version: u16,
        server_name: Option<&str>,
        alpn: Option<&[u8]>,
        offered: &[SignatureScheme],
    ) -> Option<(CertificateHandle, SignatureScheme)>;

    /// The chain to send for `handle`.
    fn format_chain(&self, handle: CertificateHandle) -> Result<Vec<u8>>;

    /// Sign the CertificateVerify content.
    fn sign(
        &self,
        handle: CertificateHandle,
        scheme: SignatureScheme,
        tbs: &[u8],
    ) -> Result<Vec<u8>>;

    /// Check the peer's chain and its signature over `tbs`.
    fn verify(&self, chain: &[u8], scheme: SignatureScheme, tbs: &[u8], signature: &[u8]) -> bool;
}

const SERVER_CONTEXT: &[u8] = b"TLS 1.3, server CertificateVerify";

/// The content covered by a server CertificateVerify (RFC 8446 section 4.4.3):
/// 64 spaces, the context string, a zero byte, then the transcript hash.
pub fn certificate_verify_content(transcript_hash: &[u8]) -> Vec<u8> {
    let mut content = Vec::with_capacity(64 + SERVER_CONTEXT.len() + 1 + transcript_hash.len());
    content.resize(64, 0x20);
    content.extend_from_slice(SERVER_CONTEXT);
    content.push(0x00);
    content.extend_from_slice(transcript_hash);
    content
}

/// Encode DER certificates as a chain.
pub fn encode_chain<C: AsRef<[u8]>>(certificates: &[C]) -> Vec<u8> {
    let mut out = Vec::new();
    for cert in certificates {
        let cert = cert.as_ref();
        out.extend_from_slice(&(cert.len() as u32).to_be_bytes()[1..]);
        out.extend_from_slice(cert);
    }
    out
}

/// Split a chain into its DER certificates.
pub fn split_chain(chain: &[u8]) -> Result<Vec<&[u8]>> {
    let mut certs = Vec::new();
    let mut off = 0;
    while off < chain.len() {
        if off + 3 > chain.len() {
            return Err(Error::Decode("truncated certificate chain"));
        }
        let len = ((chain[off] as usize) << 16)
            | ((chain[off + 1] as usize) << 8)
            | chain[off + 2] as usize;
        off += 3;
        let cert = chain
            .get(off..off + len)
            .ok_or(Error::Decode("truncated certificate chain"))?;
        certs.push(cert);
        off += len;
    }
    Ok(certs)
}
