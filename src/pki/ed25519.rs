//! Ed25519 for CertificateVerify.

use alloc::vec::Vec;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{Error, Result};
use crate::pki::der;

/// Ed25519 OID 1.3.101.112.
const ED25519_OID: &[u8] = &[0x06, 0x03, 0x2b, 0x65, 0x70];

/// AlgorithmIdentifier { Ed25519 }, used for both the key and the signature.
const ALGORITHM: &[u8] = &[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70];

/// Sign `message` with a 32-byte Ed25519 seed. Returns the 64-byte signature.
pub fn sign(seed: &[u8; 32], message: &[u8]) -> [u8; 64] {
    SigningKey::from_bytes(seed).sign(message).to_bytes()
}

/// Verify a 64-byte signature over `message`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    let public_key: &[u8; 32] = public_key
        .try_into()
        .map_err(|_| Error::Certificate("invalid Ed25519 public key"))?;
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| Error::Certificate("invalid Ed25519 public key"))?;
    let signature = Signature::from_slice(signature)
        .map_err(|_| Error::DecryptError("malformed Ed25519 signature"))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| Error::DecryptError("Ed25519 signature mismatch"))
}

/// Public key for a 32-byte seed.
pub fn public_key(seed: &[u8; 32]) -> [u8; 32] {
    SigningKey::from_bytes(seed).verifying_key().to_bytes()
}

/// The 32-byte Ed25519 public key inside a DER certificate.
pub fn public_key_from_certificate(cert_der: &[u8]) -> Result<&[u8]> {
    der::find_spki_key(cert_der, ED25519_OID, 32)
}

/// Minimal self-signed certificate for the key pair of `seed`.
pub fn self_signed_certificate(seed: &[u8; 32], common_name: &str) -> Vec<u8> {
    der::build_certificate(ALGORITHM, ALGORITHM, &public_key(seed), common_name)
}
