use alloc::vec::Vec;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::pki::{
    ecdsa_p256, ed25519, encode_chain, split_chain, CertificateCallbacks, CertificateHandle,
    SignatureScheme,
};

/// Private key of a server identity.
#[derive(Clone)]
pub enum PrivateKey {
    /// 32-byte P-256 scalar.
    EcdsaP256([u8; 32]),
    /// 32-byte Ed25519 seed.
    Ed25519([u8; 32]),
}

impl PrivateKey {
    /// The only scheme this key can sign with.
    pub fn scheme(&self) -> SignatureScheme {
        match self {
            PrivateKey::EcdsaP256(_) => SignatureScheme::EcdsaSecp256r1Sha256,
            PrivateKey::Ed25519(_) => SignatureScheme::Ed25519,
        }
    }

    /// Minimal self-signed certificate for this key.
    pub fn self_signed_certificate(&self, common_name: &str) -> Result<Vec<u8>> {
        match self {
            PrivateKey::EcdsaP256(scalar) => ecdsa_p256::self_signed_certificate(scalar, common_name),
            PrivateKey::Ed25519(seed) => Ok(ed25519::self_signed_certificate(seed, common_name)),
        }
    }

    fn sign(&self, tbs: &[u8]) -> Result<Vec<u8>> {
        match self {
            PrivateKey::EcdsaP256(scalar) => ecdsa_p256::sign(scalar, tbs),
            PrivateKey::Ed25519(seed) => Ok(ed25519::sign(seed, tbs).to_vec()),
        }
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.scheme()).finish()
    }
}

struct Identity {
    chain: Vec<u8>,
    key: PrivateKey,
}

/// In-memory [`CertificateCallbacks`].
///
/// Servers register identities (chain plus key); the first identity whose
/// scheme the client offers is selected. Clients pin trusted leaf
/// certificates: a peer chain verifies only if its leaf is byte-identical
/// to a pinned certificate and the signature checks out against the leaf's
/// public key.
#[derive(Default)]
pub struct StaticCertificates {
    identities: Vec<Identity>,
    trusted: Vec<Vec<u8>>,
    accept_any: bool,
}

impl StaticCertificates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server identity. `chain` is a list of DER certificates, leaf first.
    pub fn with_identity(mut self, chain: Vec<Vec<u8>>, key: PrivateKey) -> Self {
        self.identities.push(Identity {
            chain: encode_chain(&chain),
            key,
        });
        self
    }

    /// Pin a trusted leaf certificate.
    pub fn with_trusted(mut self, cert_der: Vec<u8>) -> Self {
        self.trusted.push(cert_der);
        self
    }

    /// Skip pinning; only the CertificateVerify signature is checked.
    pub fn accept_any_certificate(mut self) -> Self {
        self.accept_any = true;
        self
    }

    fn identity(&self, handle: CertificateHandle) -> Result<&Identity> {
        self.identities
            .get(handle.0)
            .ok_or(Error::Certificate("unknown certificate handle"))
    }
}

impl CertificateCallbacks for StaticCertificates {
    fn select(
        &self,
        _version: u16,
        server_name: Option<&str>,
        _alpn: Option<&[u8]>,
        offered: &[SignatureScheme],
    ) -> Option<(CertificateHandle, SignatureScheme)> {
        for &scheme in offered {
            if let Some(index) = self.identities.iter().position(|id| id.key.scheme() == scheme) {
                debug!("certificate {} selected for {:?} ({:?})", index, server_name, scheme);
                return Some((CertificateHandle(index), scheme));
            }
        }
        None
    }

    fn format_chain(&self, handle: CertificateHandle) -> Result<Vec<u8>> {
        Ok(self.identity(handle)?.chain.clone())
    }

    fn sign(
        &self,
        handle: CertificateHandle,
        scheme: SignatureScheme,
        tbs: &[u8],
    ) -> Result<Vec<u8>> {
        let identity = self.identity(handle)?;
        if identity.key.scheme() != scheme {
            return Err(Error::Certificate("key cannot sign with requested scheme"));
        }
        identity.key.sign(tbs)
    }

    fn verify(&self, chain: &[u8], scheme: SignatureScheme, tbs: &[u8], signature: &[u8]) -> bool {
        let leaf = match split_chain(chain) {
            Ok(certs) => match certs.first() {
                Some(leaf) => *leaf,
                None => return false,
            },
            Err(_) => return false,
        };

        if !self.accept_any && !self.trusted.iter().any(|t| t.as_slice() == leaf) {
            warn!("peer certificate is not pinned");
            return false;
        }

        let checked = match scheme {
            SignatureScheme::EcdsaSecp256r1Sha256 => ecdsa_p256::public_key_from_certificate(leaf)
                .and_then(|key| ecdsa_p256::verify(key, tbs, signature)),
            SignatureScheme::Ed25519 => ed25519::public_key_from_certificate(leaf)
                .and_then(|key| ed25519::verify(key, tbs, signature)),
        };
        if let Err(e) = checked {
            warn!("CertificateVerify rejected: {}", e);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ecdsa_pair() -> (StaticCertificates, Vec<u8>) {
        let key = PrivateKey::EcdsaP256([0x42; 32]);
        let cert = key.self_signed_certificate("localhost").unwrap();
        (
            StaticCertificates::new().with_identity(alloc::vec![cert.clone()], key),
            cert,
        )
    }

    #[test]
    fn select_first_offered_scheme() {
        let (certs, _) = ecdsa_pair();
        let certs = certs.with_identity(
            alloc::vec![PrivateKey::Ed25519([1; 32]).self_signed_certificate("x").unwrap()],
            PrivateKey::Ed25519([1; 32]),
        );

        let (handle, scheme) = certs
            .select(0x0304, Some("localhost"), None, &[SignatureScheme::Ed25519])
            .unwrap();
        assert_eq!(handle, CertificateHandle(1));
        assert_eq!(scheme, SignatureScheme::Ed25519);

        assert!(StaticCertificates::new()
            .select(0x0304, None, None, &[SignatureScheme::Ed25519])
            .is_none());
    }

    #[test]
    fn sign_then_verify_pinned() {
        let (server, cert) = ecdsa_pair();
        let client = StaticCertificates::new().with_trusted(cert);

        let scheme = SignatureScheme::EcdsaSecp256r1Sha256;
        let chain = server.format_chain(CertificateHandle(0)).unwrap();
        let sig = server.sign(CertificateHandle(0), scheme, b"tbs").unwrap();

        assert!(client.verify(&chain, scheme, b"tbs", &sig));
        assert!(!client.verify(&chain, scheme, b"other", &sig));
    }

    #[test]
    fn unpinned_leaf_rejected() {
        let (server, _) = ecdsa_pair();
        let other = PrivateKey::EcdsaP256([0x43; 32])
            .self_signed_certificate("localhost")
            .unwrap();
        let client = StaticCertificates::new().with_trusted(other);

        let scheme = SignatureScheme::EcdsaSecp256r1Sha256;
        let chain = server.format_chain(CertificateHandle(0)).unwrap();
        let sig = server.sign(CertificateHandle(0), scheme, b"tbs").unwrap();

        assert!(!client.verify(&chain, scheme, b"tbs", &sig));
        assert!(StaticCertificates::new()
            .accept_any_certificate()
            .verify(&chain, scheme, b"tbs", &sig));
    }

    #[test]
    fn sign_rejects_scheme_mismatch() {
        let (server, _) = ecdsa_pair();
        assert!(server
            .sign(CertificateHandle(0), SignatureScheme::Ed25519, b"tbs")
            .is_err());
        assert!(server.format_chain(CertificateHandle(7)).is_err());
    }
}
