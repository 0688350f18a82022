//! RustCrypto-backed implementation of [`CryptoProvider`].

use alloc::boxed::Box;

use p256::elliptic_curve::sec1::ToEncodedPoint;

#[cfg(feature = "rustcrypto-aes")]
use aes_gcm::aead::{generic_array::GenericArray, AeadInPlace, KeyInit};
#[cfg(not(feature = "rustcrypto-aes"))]
use chacha20poly1305::aead::{generic_array::GenericArray, AeadInPlace, KeyInit};

use crate::crypto::{
    Aead as AeadTrait, AeadAlgorithm, CryptoProvider, HashAlgorithm, HashOutput,
    Hkdf as HkdfTrait, KeyExchange, NamedGroup, SharedSecret, TranscriptHasher,
};
use crate::error::{Error, Result};

/// Software provider covering every suite, group and hash the engine speaks.
///
/// AES-GCM is available with `rustcrypto-aes`, ChaCha20-Poly1305 with
/// `rustcrypto-chacha`; asking for an algorithm that was compiled out fails
/// with [`Error::Crypto`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCrypto;

impl CryptoProvider for RustCrypto {
    fn hkdf(&self, hash: HashAlgorithm) -> Result<&dyn HkdfTrait> {
        Ok(match hash {
            HashAlgorithm::Sha256 => &HkdfSha256,
            HashAlgorithm::Sha384 => &HkdfSha384,
        })
    }

    fn hasher(&self, hash: HashAlgorithm) -> Result<Box<dyn TranscriptHasher>> {
        use sha2::Digest;
        Ok(match hash {
            HashAlgorithm::Sha256 => Box::new(ShaHasher(sha2::Sha256::new())),
            HashAlgorithm::Sha384 => Box::new(ShaHasher(sha2::Sha384::new())),
        })
    }

    fn aead(&self, alg: AeadAlgorithm, key: &[u8]) -> Result<Box<dyn AeadTrait>> {
        match alg {
            #[cfg(feature = "rustcrypto-aes")]
            AeadAlgorithm::Aes128Gcm => new_aead::<aes_gcm::Aes128Gcm>(key),
            #[cfg(feature = "rustcrypto-aes")]
            AeadAlgorithm::Aes256Gcm => new_aead::<aes_gcm::Aes256Gcm>(key),
            #[cfg(feature = "rustcrypto-chacha")]
            AeadAlgorithm::ChaCha20Poly1305 => {
                new_aead::<chacha20poly1305::ChaCha20Poly1305>(key)
            }
            #[allow(unreachable_patterns)]
            _ => Err(Error::Crypto("AEAD algorithm not compiled in")),
        }
    }

    fn key_exchange(&self, group: NamedGroup, seed: &[u8; 32]) -> Result<Box<dyn KeyExchange>> {
        Ok(match group {
            NamedGroup::X25519 => Box::new(X25519KeyExchange::new(seed)),
            NamedGroup::Secp256r1 => Box::new(P256KeyExchange::new(seed)?),
        })
    }
}

// ---- HKDF ----

/// HKDF using SHA-256 (via the `hkdf` crate).
pub struct HkdfSha256;

impl HkdfTrait for HkdfSha256 {
    fn hash_len(&self) -> usize {
        32
    }

    fn extract(&self, salt: &[u8], ikm: &[u8]) -> HashOutput {
        let (prk, _) = hkdf::Hkdf::<sha2::Sha256>::extract(Some(salt), ikm);
        HashOutput::from_slice(&prk).unwrap_or_default()
    }

    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<()> {
        let hk = hkdf::Hkdf::<sha2::Sha256>::from_prk(prk)
            .map_err(|_| Error::Crypto("invalid PRK length"))?;
        hk.expand(info, okm)
            .map_err(|_| Error::Crypto("HKDF output too long"))
    }
}

/// HKDF using SHA-384, for `TLS_AES_256_GCM_SHA384`.
pub struct HkdfSha384;

impl HkdfTrait for HkdfSha384 {
    fn hash_len(&self) -> usize {
        48
    }

    fn extract(&self, salt: &[u8], ikm: &[u8]) -> HashOutput {
        let (prk, _) = hkdf::Hkdf::<sha2::Sha384>::extract(Some(salt), ikm);
        HashOutput::from_slice(&prk).unwrap_or_default()
    }

    fn expand(&self, prk: &[u8], info: &[u8], okm: &mut [u8]) -> Result<()> {
        let hk = hkdf::Hkdf::<sha2::Sha384>::from_prk(prk)
            .map_err(|_| Error::Crypto("invalid PRK length"))?;
        hk.expand(info, okm)
            .map_err(|_| Error::Crypto("HKDF output too long"))
    }
}

// ---- Transcript hashing ----

struct ShaHasher<D>(D);

impl<D> TranscriptHasher for ShaHasher<D>
where
    D: sha2::Digest + Clone + Send + 'static,
{
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(&mut self.0, data);
    }

    fn current(&self) -> HashOutput {
        let digest = self.0.clone().finalize();
        HashOutput::from_slice(&digest).unwrap_or_default()
    }

    fn fork(&self) -> Box<dyn TranscriptHasher> {
        Box::new(ShaHasher(self.0.clone()))
    }
}

// ---- AEAD ----

const TAG_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Any RustCrypto AEAD with a 96-bit nonce and 128-bit tag.
struct RustCryptoAead<A> {
    cipher: A,
}

fn new_aead<A>(key: &[u8]) -> Result<Box<dyn AeadTrait>>
where
    A: AeadInPlace + KeyInit + Send + Sync + 'static,
{
    let cipher = A::new_from_slice(key).map_err(|_| Error::Crypto("invalid AEAD key length"))?;
    Ok(Box::new(RustCryptoAead { cipher }))
}

impl<A> AeadTrait for RustCryptoAead<A>
where
    A: AeadInPlace + Send + Sync,
{
    fn tag_len(&self) -> usize {
        TAG_LEN
    }

    fn seal_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        payload_len: usize,
    ) -> Result<usize> {
        if nonce.len() != NONCE_LEN {
            return Err(Error::Crypto("invalid nonce length"));
        }
        let total = payload_len + TAG_LEN;
        if buf.len() < total {
            return Err(Error::BufferTooSmall { needed: total });
        }

        let tag = self
            .cipher
            .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, &mut buf[..payload_len])
            .map_err(|_| Error::Crypto("AEAD seal failed"))?;
        buf[payload_len..total].copy_from_slice(&tag);
        Ok(total)
    }

    fn open_in_place(
        &self,
        nonce: &[u8],
        aad: &[u8],
        buf: &mut [u8],
        ciphertext_len: usize,
    ) -> Result<usize> {
        if nonce.len() != NONCE_LEN {
            return Err(Error::Crypto("invalid nonce length"));
        }
        if ciphertext_len < TAG_LEN || ciphertext_len > buf.len() {
            return Err(Error::Crypto("ciphertext too short"));
        }
        let plaintext_len = ciphertext_len - TAG_LEN;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&buf[plaintext_len..ciphertext_len]);
        self.cipher
            .decrypt_in_place_detached(
                GenericArray::from_slice(nonce),
                aad,
                &mut buf[..plaintext_len],
                GenericArray::from_slice(&tag),
            )
            .map_err(|_| Error::Crypto("AEAD open failed"))?;
        Ok(plaintext_len)
    }
}

// ---- Key exchange ----

struct X25519KeyExchange {
    secret: x25519_dalek::StaticSecret,
    public: [u8; 32],
}

impl X25519KeyExchange {
    fn new(seed: &[u8; 32]) -> Self {
        let secret = x25519_dalek::StaticSecret::from(*seed);
        let public = x25519_dalek::PublicKey::from(&secret).to_bytes();
        Self { secret, public }
    }
}

impl KeyExchange for X25519KeyExchange {
    fn group(&self) -> NamedGroup {
        NamedGroup::X25519
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn agree(&self, peer_public: &[u8]) -> Result<SharedSecret> {
        let peer: [u8; 32] = peer_public
            .try_into()
            .map_err(|_| Error::IllegalParameter("X25519 key share length"))?;
        let shared = self
            .secret
            .diffie_hellman(&x25519_dalek::PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(Error::IllegalParameter("X25519 low-order key share"));
        }
        SharedSecret::from_slice(shared.as_bytes()).map_err(|_| Error::Crypto("shared secret"))
    }
}

struct P256KeyExchange {
    secret: p256::SecretKey,
    public: heapless::Vec<u8, 65>,
}

impl P256KeyExchange {
    fn new(seed: &[u8; 32]) -> Result<Self> {
        let secret =
            p256::SecretKey::from_slice(seed).map_err(|_| Error::Crypto("invalid P-256 scalar"))?;
        let encoded = secret.public_key().to_encoded_point(false);
        let public = heapless::Vec::from_slice(encoded.as_bytes())
            .map_err(|_| Error::Crypto("P-256 point encoding"))?;
        Ok(Self { secret, public })
    }
}

impl KeyExchange for P256KeyExchange {
    fn group(&self) -> NamedGroup {
        NamedGroup::Secp256r1
    }

    fn public_key(&self) -> &[u8] {
        &self.public
    }

    fn agree(&self, peer_public: &[u8]) -> Result<SharedSecret> {
        if peer_public.len() != 65 {
            return Err(Error::IllegalParameter("P-256 key share length"));
        }
        let peer = p256::PublicKey::from_sec1_bytes(peer_public)
            .map_err(|_| Error::IllegalParameter("P-256 key share"))?;
        let shared = p256::ecdh::diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        SharedSecret::from_slice(shared.raw_secret_bytes())
            .map_err(|_| Error::Crypto("shared secret"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    /// RFC 5869 appendix A.1.
    #[test]
    fn hkdf_sha256_rfc5869_case1() {
        let ikm = [0x0bu8; 22];
        let salt = hex!("000102030405060708090a0b0c");
        let info = hex!("f0f1f2f3f4f5f6f7f8f9");

        let prk = HkdfSha256.extract(&salt, &ikm);
        assert_eq!(
            prk.as_slice(),
            hex!("077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5")
        );

        let mut okm = [0u8; 42];
        HkdfSha256.expand(&prk, &info, &mut okm).unwrap();
        assert_eq!(
            okm,
            hex!("3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865")
        );
    }

    #[test]
    fn hkdf_sha384_output_length() {
        let prk = HkdfSha384.extract(&[0u8; 48], &[0u8; 48]);
        assert_eq!(prk.len(), 48);
        assert_eq!(HkdfSha384.hash_len(), 48);
    }

    #[test]
    fn transcript_hasher_forks() {
        let provider = RustCrypto;
        let mut h = provider.hasher(HashAlgorithm::Sha256).unwrap();
        h.update(b"ab");
        let fork = h.fork();
        h.update(b"c");

        assert_eq!(
            h.current().as_slice(),
            hex!("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        // The fork kept the state from before "c".
        assert_eq!(fork.current(), provider.hash(HashAlgorithm::Sha256, b"ab").unwrap());
    }

    #[cfg(feature = "rustcrypto-aes")]
    #[test]
    fn aes128gcm_roundtrip() {
        let aead = RustCrypto.aead(AeadAlgorithm::Aes128Gcm, &[0x42u8; 16]).unwrap();
        let nonce = [0u8; 12];
        let aad = b"associated data";
        let plaintext = b"hello world";

        let mut buf = [0u8; 128];
        buf[..plaintext.len()].copy_from_slice(plaintext);

        let ct_len = aead
            .seal_in_place(&nonce, aad, &mut buf, plaintext.len())
            .unwrap();
        assert_eq!(ct_len, plaintext.len() + 16);

        let pt_len = aead.open_in_place(&nonce, aad, &mut buf, ct_len).unwrap();
        assert_eq!(&buf[..pt_len], plaintext);
    }

    #[cfg(feature = "rustcrypto-aes")]
    #[test]
    fn aes256gcm_rejects_wrong_key_length() {
        assert!(RustCrypto.aead(AeadAlgorithm::Aes256Gcm, &[0u8; 16]).is_err());
    }

    #[cfg(feature = "rustcrypto-chacha")]
    #[test]
    fn chacha20poly1305_auth_failure() {
        let aead = RustCrypto
            .aead(AeadAlgorithm::ChaCha20Poly1305, &[0x42u8; 32])
            .unwrap();
        let nonce = [0u8; 12];
        let plaintext = b"secret";

        let mut buf = [0u8; 64];
        buf[..plaintext.len()].copy_from_slice(plaintext);
        let ct_len = aead
            .seal_in_place(&nonce, b"aad", &mut buf, plaintext.len())
            .unwrap();

        buf[0] ^= 0xff;
        assert!(aead.open_in_place(&nonce, b"aad", &mut buf, ct_len).is_err());
    }

    #[test]
    fn x25519_agreement() {
        let a = RustCrypto.key_exchange(NamedGroup::X25519, &[0x11; 32]).unwrap();
        let b = RustCrypto.key_exchange(NamedGroup::X25519, &[0x22; 32]).unwrap();
        assert_eq!(a.public_key().len(), 32);
        assert_eq!(
            a.agree(b.public_key()).unwrap(),
            b.agree(a.public_key()).unwrap()
        );
    }

    #[test]
    fn x25519_rejects_low_order_share() {
        let a = RustCrypto.key_exchange(NamedGroup::X25519, &[0x11; 32]).unwrap();
        assert!(a.agree(&[0u8; 32]).is_err());
        assert!(a.agree(&[9u8; 31]).is_err());
    }

    #[test]
    fn p256_agreement() {
        let a = RustCrypto.key_exchange(NamedGroup::Secp256r1, &[0x11; 32]).unwrap();
        let b = RustCrypto.key_exchange(NamedGroup::Secp256r1, &[0x22; 32]).unwrap();
        assert_eq!(a.public_key().len(), 65);
        assert_eq!(a.public_key()[0], 0x04);
        assert_eq!(
            a.agree(b.public_key()).unwrap(),
            b.agree(a.public_key()).unwrap()
        );
    }

    #[test]
    fn p256_rejects_garbage_share() {
        let a = RustCrypto.key_exchange(NamedGroup::Secp256r1, &[0x11; 32]).unwrap();
        let mut bogus = [0xffu8; 65];
        bogus[0] = 0x04;
        assert!(a.agree(&bogus).is_err());
    }
}
