//! Cryptographic traits the handshake engine calls out to.
//!
//! The engine never implements primitives itself. A [`CryptoProvider`]
//! hands out HKDF instances, transcript hashers, AEAD ciphers (for ticket
//! sealing) and key-exchange groups, selected at runtime by the negotiated
//! cipher suite and named group. [`rustcrypto::RustCrypto`] is the bundled
//! software implementation.

mod aead;
mod hkdf;
mod kx;

#[cfg(any(feature = "rustcrypto-chacha", feature = "rustcrypto-aes"))]
pub mod rustcrypto;

use alloc::boxed::Box;

pub use aead::Aead;
pub use hkdf::{expand_label, expand_label_secret, hmac, Hkdf};
pub use kx::{KeyExchange, NamedGroup, SharedSecret};

use crate::error::Result;

/// Largest digest produced by a supported hash (SHA-384).
pub const MAX_HASH_LEN: usize = 48;

/// A hash output or secret sized to the negotiated hash.
pub type HashOutput = heapless::Vec<u8, MAX_HASH_LEN>;

/// Copy `bytes` into a [`HashOutput`].
pub fn hash_output(bytes: &[u8]) -> Result<HashOutput> {
    HashOutput::from_slice(bytes).map_err(|_| crate::error::Error::Crypto("digest too long"))
}

/// Hash function of a cipher suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
}

impl HashAlgorithm {
    /// Output length in bytes.
    pub const fn output_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
        }
    }
}

/// AEAD algorithm of a cipher suite, also used for ticket sealing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl AeadAlgorithm {
    pub const fn key_len(self) -> usize {
        match self {
            AeadAlgorithm::Aes128Gcm => 16,
            AeadAlgorithm::Aes256Gcm | AeadAlgorithm::ChaCha20Poly1305 => 32,
        }
    }

    /// Nonce length (12 for every TLS 1.3 AEAD).
    pub const fn nonce_len(self) -> usize {
        12
    }

    pub const fn tag_len(self) -> usize {
        16
    }

    /// Parse the ticket-key algorithm names used in configuration
    /// (`"AES128-GCM"`, `"AES256-GCM"`, `"CHACHA20-POLY1305"`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AES128-GCM" => Some(AeadAlgorithm::Aes128Gcm),
            "AES256-GCM" => Some(AeadAlgorithm::Aes256Gcm),
            "CHACHA20-POLY1305" => Some(AeadAlgorithm::ChaCha20Poly1305),
            _ => None,
        }
    }
}

/// Incremental hash over handshake messages.
pub trait TranscriptHasher: Send {
    fn update(&mut self, data: &[u8]);

    /// Digest of everything fed so far, without consuming the state.
    fn current(&self) -> HashOutput;

    /// Independent copy of the running state.
    fn fork(&self) -> Box<dyn TranscriptHasher>;
}

/// Source of randomness.
///
/// A `Connection` draws everything it will ever need from this at creation
/// time; `process` itself never asks for entropy.
pub trait Rng {
    /// Fill `buf` with random bytes.
    fn fill(&mut self, buf: &mut [u8]);
}

/// Bundle of cryptographic primitives needed by the handshake.
pub trait CryptoProvider {
    /// HKDF (and thereby HMAC) over `hash`.
    fn hkdf(&self, hash: HashAlgorithm) -> Result<&dyn Hkdf>;

    /// A fresh transcript hasher for `hash`.
    fn hasher(&self, hash: HashAlgorithm) -> Result<Box<dyn TranscriptHasher>>;

    /// Create an AEAD instance from a key.
    fn aead(&self, alg: AeadAlgorithm, key: &[u8]) -> Result<Box<dyn Aead>>;

    /// Create an ephemeral key pair for `group` from 32 bytes of entropy.
    fn key_exchange(&self, group: NamedGroup, seed: &[u8; 32]) -> Result<Box<dyn KeyExchange>>;

    /// One-shot hash of `data`.
    fn hash(&self, hash: HashAlgorithm, data: &[u8]) -> Result<HashOutput> {
        let mut h = self.hasher(hash)?;
        h.update(data);
        Ok(h.current())
    }
}
