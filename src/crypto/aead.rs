use crate::error::Result;

/// Authenticated Encryption with Associated Data.
///
/// The handshake itself never encrypts (QUIC protects its own packets);
/// the server uses an AEAD to seal session state into ticket identities.
pub trait Aead: Send + Sync {
    /// Authentication tag length in bytes (16 for every TLS 1.3 AEAD).
    fn tag_len(&self) -> usize;

    /// Encrypt in place.
    ///
    /// `buf[..payload_len]` contains the plaintext. The buffer must have
    /// room for the authentication tag (`buf.len() >= payload_len + tag_len()`).
    ///
    /// Returns the total length of ciphertext + tag.
    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize>;

    /// Decrypt in place.
    ///
    /// `buf[..ciphertext_len]` contains ciphertext + authentication tag.
    ///
    /// Returns the plaintext length on success.
    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize>;
}
