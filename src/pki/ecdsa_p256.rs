//! ECDSA-P256 (secp256r1 with SHA-256) for CertificateVerify.

use alloc::vec::Vec;

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{DerSignature, SigningKey, VerifyingKey};

use crate::error::{Error, Result};
use crate::pki::der;

/// secp256r1 OID 1.2.840.10045.3.1.7.
const SECP256R1_OID: &[u8] = &[0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];

/// AlgorithmIdentifier { ecPublicKey, secp256r1 }.
const SPKI_ALGORITHM: &[u8] = &[
    0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08, 0x2a, 0x86,
    0x48, 0xce, 0x3d, 0x03, 0x01, 0x07,
];

/// AlgorithmIdentifier { ecdsa-with-SHA256 }.
const SIGNATURE_ALGORITHM: &[u8] = &[
    0x30, 0x0a, 0x06, 0x08, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02,
];

/// Sign `message` with a 32-byte P-256 private scalar.
///
/// SHA-256 is applied by the signer. Returns a DER-encoded signature
/// (typically 70-72 bytes).
pub fn sign(private_key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let signing_key =
        SigningKey::from_slice(private_key).map_err(|_| Error::Crypto("invalid P-256 private key"))?;
    let signature: DerSignature = signing_key.sign(message);
    Ok(signature.as_bytes().to_vec())
}

/// Verify a DER-encoded signature over `message` with a SEC1 public key.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::from_sec1_bytes(public_key)
        .map_err(|_| Error::Certificate("invalid P-256 public key"))?;
    let sig = DerSignature::try_from(signature)
        .map_err(|_| Error::DecryptError("malformed ECDSA signature"))?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| Error::DecryptError("ECDSA signature mismatch"))
}

/// Uncompressed SEC1 public key (65 bytes) for a private scalar.
pub fn public_key(private_key: &[u8]) -> Result<Vec<u8>> {
    let signing_key =
        SigningKey::from_slice(private_key).map_err(|_| Error::Crypto("invalid P-256 private key"))?;
    let encoded = signing_key.verifying_key().to_encoded_point(false);
    Ok(encoded.as_bytes().to_vec())
}

/// The uncompressed P-256 public key inside a DER certificate.
pub fn public_key_from_certificate(cert_der: &[u8]) -> Result<&[u8]> {
    der::find_spki_key(cert_der, SECP256R1_OID, 65)
}

/// Whether a DER certificate carries a P-256 key.
pub fn certificate_has_key(cert_der: &[u8]) -> bool {
    public_key_from_certificate(cert_der).is_ok()
}

/// Minimal self-signed certificate for the key pair of `private_key`.
pub fn self_signed_certificate(private_key: &[u8], common_name: &str) -> Result<Vec<u8>> {
    let public = public_key(private_key)?;
    Ok(der::build_certificate(
        SPKI_ALGORITHM,
        SIGNATURE_ALGORITHM,
        &public,
        common_name,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let scalar = [0x42u8; 32];
        let message = [0xABu8; 98];

        let signature = sign(&scalar, &message).unwrap();
        assert!(
            signature.len() >= 68 && signature.len() <= 74,
            "unexpected signature length: {}",
            signature.len()
        );

        let pubkey = public_key(&scalar).unwrap();
        assert_eq!(pubkey.len(), 65);
        assert_eq!(pubkey[0], 0x04);

        verify(&pubkey, &message, &signature).unwrap();
    }

    #[test]
    fn verify_wrong_key_fails() {
        let signature = sign(&[0x42u8; 32], b"content").unwrap();
        let wrong_pubkey = public_key(&[0x43u8; 32]).unwrap();
        assert!(verify(&wrong_pubkey, b"content", &signature).is_err());
    }

    #[test]
    fn verify_wrong_message_fails() {
        let scalar = [0x42u8; 32];
        let signature = sign(&scalar, b"content").unwrap();
        let pubkey = public_key(&scalar).unwrap();
        assert_eq!(
            verify(&pubkey, b"other content", &signature),
            Err(Error::DecryptError("ECDSA signature mismatch"))
        );
    }

    #[test]
    fn certificate_carries_public_key() {
        let scalar = [0x55u8; 32];
        let cert = self_signed_certificate(&scalar, "milli-tls").unwrap();

        assert!(certificate_has_key(&cert));
        assert!(!certificate_has_key(&[0xDE, 0xAD, 0xBE, 0xEF]));

        let signature = sign(&scalar, b"transcript").unwrap();
        let extracted = public_key_from_certificate(&cert).unwrap();
        assert_eq!(extracted, public_key(&scalar).unwrap().as_slice());
        verify(extracted, b"transcript", &signature).unwrap();
    }

    #[test]
    fn sign_with_wrong_key_length_fails() {
        assert!(sign(&[0x42u8; 16], b"content").is_err());
    }
}
