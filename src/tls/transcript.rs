//! Running transcript hash for the TLS 1.3 handshake.
//!
//! The hash function is only known once the cipher suite is negotiated, so
//! messages seen before that (the ClientHello) are buffered and fed into
//! the hasher when [`Transcript::start`] is called.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::crypto::{CryptoProvider, HashAlgorithm, HashOutput, TranscriptHasher};
use crate::error::{Error, Result};
use crate::tls::messages::encode_message_hash;

/// Transcript of handshake messages, hashed once the suite is known.
#[derive(Default)]
pub struct Transcript {
    pending: Vec<u8>,
    hasher: Option<Box<dyn TranscriptHasher>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a complete handshake message (header included).
    pub fn update(&mut self, message: &[u8]) {
        match &mut self.hasher {
            Some(h) => h.update(message),
            None => self.pending.extend_from_slice(message),
        }
    }

    /// Switch to hashing with `hasher`, replaying buffered messages.
    pub fn start(&mut self, mut hasher: Box<dyn TranscriptHasher>) {
        if self.hasher.is_some() {
            return;
        }
        hasher.update(&self.pending);
        self.pending = Vec::new();
        self.hasher = Some(hasher);
    }

    pub fn is_started(&self) -> bool {
        self.hasher.is_some()
    }

    /// Hash of everything fed so far.
    pub fn current_hash(&self) -> Result<HashOutput> {
        self.hasher
            .as_ref()
            .map(|h| h.current())
            .ok_or(Error::InvalidState)
    }

    /// Hash of the transcript followed by `extra`, without recording
    /// `extra`. Used for PSK binders over a truncated ClientHello, possibly
    /// before the transcript has started.
    pub fn hash_with<C: CryptoProvider + ?Sized>(
        &self,
        provider: &C,
        alg: HashAlgorithm,
        extra: &[u8],
    ) -> Result<HashOutput> {
        let mut h = match &self.hasher {
            Some(h) => h.fork(),
            None => {
                let mut h = provider.hasher(alg)?;
                h.update(&self.pending);
                h
            }
        };
        h.update(extra);
        Ok(h.current())
    }

    /// Replace ClientHello1 by its `message_hash` stand-in after a
    /// HelloRetryRequest (RFC 8446 section 4.4.1).
    pub fn rollup_for_retry(&mut self, fresh: Box<dyn TranscriptHasher>) -> Result<()> {
        let ch1_hash = self.current_hash()?;
        let mut hasher = fresh;
        hasher.update(&encode_message_hash(&ch1_hash));
        self.hasher = Some(hasher);
        Ok(())
    }
}
