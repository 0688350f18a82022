//! Just enough DER to locate a SubjectPublicKeyInfo and to mint minimal
//! self-signed certificates for tests and local setups.

use alloc::vec::Vec;

use crate::error::{Error, Result};

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Locate a public key inside a certificate.
///
/// `oid` is the last OID of the SPKI AlgorithmIdentifier (the curve for
/// EC keys, the algorithm itself for Ed25519). In a well-formed SPKI it is
/// immediately followed by `BIT STRING { 0x00, key }`.
pub(crate) fn find_spki_key<'a>(cert: &'a [u8], oid: &[u8], key_len: usize) -> Result<&'a [u8]> {
    let mut pattern: heapless::Vec<u8, 32> = heapless::Vec::new();
    pattern
        .extend_from_slice(oid)
        .and_then(|_| pattern.extend_from_slice(&[0x03, (key_len + 1) as u8, 0x00]))
        .map_err(|_| Error::Certificate("OID too long"))?;

    let mut start = 0;
    while let Some(pos) = find_subsequence(&cert[start..], &pattern) {
        let key_start = start + pos + pattern.len();
        if let Some(key) = cert.get(key_start..key_start + key_len) {
            return Ok(key);
        }
        start += pos + 1;
    }
    Err(Error::Certificate("public key not found in certificate"))
}

/// Append a DER length field.
fn push_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x100 {
        out.push(0x81);
        out.push(len as u8);
    } else {
        out.push(0x82);
        out.extend_from_slice(&(len as u16).to_be_bytes());
    }
}

/// Append a complete tag-length-value.
pub(crate) fn push_tlv(out: &mut Vec<u8>, tag: u8, content: &[u8]) {
    out.push(tag);
    push_length(out, content.len());
    out.extend_from_slice(content);
}

/// Build a minimal X.509v3 certificate around a public key.
///
/// `spki_algorithm` and `signature_algorithm` are complete DER
/// AlgorithmIdentifier SEQUENCEs. The outer signature is a placeholder:
/// the result is meant for pinned trust, not chain validation.
pub(crate) fn build_certificate(
    spki_algorithm: &[u8],
    signature_algorithm: &[u8],
    public_key: &[u8],
    common_name: &str,
) -> Vec<u8> {
    // SET { SEQUENCE { OID 2.5.4.3, UTF8String cn } }
    let mut attr = Vec::new();
    push_tlv(&mut attr, 0x06, &[0x55, 0x04, 0x03]);
    push_tlv(&mut attr, 0x0c, common_name.as_bytes());
    let mut attr_seq = Vec::new();
    push_tlv(&mut attr_seq, 0x30, &attr);
    let mut rdn = Vec::new();
    push_tlv(&mut rdn, 0x31, &attr_seq);
    let mut name = Vec::new();
    push_tlv(&mut name, 0x30, &rdn);

    let mut validity = Vec::new();
    push_tlv(&mut validity, 0x17, b"250101000000Z");
    push_tlv(&mut validity, 0x17, b"350101000000Z");

    let mut key_bits = Vec::with_capacity(public_key.len() + 1);
    key_bits.push(0x00);
    key_bits.extend_from_slice(public_key);
    let mut spki = Vec::new();
    spki.extend_from_slice(spki_algorithm);
    push_tlv(&mut spki, 0x03, &key_bits);

    let mut tbs = Vec::new();
    tbs.extend_from_slice(&[0xa0, 0x03, 0x02, 0x01, 0x02]); // v3
    tbs.extend_from_slice(&[0x02, 0x01, 0x01]); // serial 1
    tbs.extend_from_slice(signature_algorithm);
    tbs.extend_from_slice(&name); // issuer
    push_tlv(&mut tbs, 0x30, &validity);
    tbs.extend_from_slice(&name); // subject
    push_tlv(&mut tbs, 0x30, &spki);

    let mut cert = Vec::new();
    push_tlv(&mut cert, 0x30, &tbs);
    cert.extend_from_slice(signature_algorithm);
    push_tlv(&mut cert, 0x03, &[0x00, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa]);

    let mut out = Vec::with_capacity(cert.len() + 4);
    push_tlv(&mut out, 0x30, &cert);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_form_lengths() {
        let mut out = Vec::new();
        push_tlv(&mut out, 0x04, &[0u8; 200]);
        assert_eq!(&out[..3], &[0x04, 0x81, 200]);

        let mut out = Vec::new();
        push_tlv(&mut out, 0x04, &[0u8; 300]);
        assert_eq!(&out[..4], &[0x04, 0x82, 0x01, 0x2c]);
    }

    #[test]
    fn spki_key_is_found_after_oid() {
        let oid = [0x06, 0x03, 0x2b, 0x65, 0x70];
        let alg = [0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70];
        let cert = build_certificate(&alg, &alg, &[7u8; 32], "test");
        // The signature algorithm carries the same OID without a key;
        // only the SPKI occurrence matches.
        assert_eq!(find_spki_key(&cert, &oid, 32).unwrap(), &[7u8; 32]);
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(find_spki_key(&[0xde, 0xad], &[0x06, 0x01, 0x00], 32).is_err());
    }
}
