use crate::crypto::HashOutput;
use crate::error::{Error, Result};

/// HMAC-based Key Derivation Function (RFC 5869).
///
/// Every secret in the TLS 1.3 key schedule, every Finished MAC and every
/// PSK binder is built from these two operations.
pub trait Hkdf: Sync {
    /// Hash output length in bytes (32 for SHA-256, 48 for SHA-384).
    fn hash_len(&self) -> usize;

    /// HKDF-Extract: derive a pseudorandom key from salt and input keying material.
    fn extract(&self, salt: &[u8], ikm: &[u8]) -> HashOutput;

    /// HKDF-Expand: expand a pseudorandom key with info into output keying material.
    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<()>;
}

/// `opaque label<7..255>`, so exporter labels up to 249 bytes.
const MAX_LABEL_LEN: usize = u8::MAX as usize;

/// 2 + 1 + label + 1 + context (a context is at most 255 bytes).
const MAX_INFO_LEN: usize = 4 + MAX_LABEL_LEN + 255;

/// HKDF-Expand-Label (RFC 8446 section 7.1).
///
/// Constructs the HkdfLabel structure:
///   uint16 length = out.len()
///   opaque label<7..255> = "tls13 " + label
///   opaque context<0..255> = context
///
/// Then calls HKDF-Expand(secret, HkdfLabel, out.len()).
pub fn expand_label(
    hkdf: &dyn Hkdf,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    out: &mut [u8],
) -> Result<()> {
    const PREFIX: &[u8] = b"tls13 ";
    let full_label_len = PREFIX.len() + label.len();
    if full_label_len > MAX_LABEL_LEN || context.len() > u8::MAX as usize {
        return Err(Error::Crypto("HKDF label too long"));
    }

    let length = (out.len() as u16).to_be_bytes();
    let parts: [&[u8]; 6] = [
        &length,
        &[full_label_len as u8],
        PREFIX,
        label,
        &[context.len() as u8],
        context,
    ];
    let mut info: heapless::Vec<u8, MAX_INFO_LEN> = heapless::Vec::new();
    for part in parts {
        info.extend_from_slice(part)
            .map_err(|_| Error::Crypto("HKDF label too long"))?;
    }

    hkdf.expand(secret, &info, out)
}

/// Expand-Label into a fresh secret of the hash's own length.
pub fn expand_label_secret(
    hkdf: &dyn Hkdf,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
) -> Result<HashOutput> {
    let mut out = HashOutput::new();
    out.resize(hkdf.hash_len(), 0)
        .map_err(|_| Error::Crypto("digest too long"))?;
    expand_label(hkdf, secret, label, context, &mut out)?;
    Ok(out)
}

/// HMAC(key, message).
///
/// HKDF-Extract(salt, ikm) is exactly HMAC(salt, ikm), so the Finished and
/// binder MACs reuse the extract step instead of a separate HMAC primitive.
pub fn hmac(hkdf: &dyn Hkdf, key: &[u8], message: &[u8]) -> HashOutput {
    hkdf.extract(key, message)
}
