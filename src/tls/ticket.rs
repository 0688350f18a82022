//! Session tickets.
//!
//! The server never stores sessions. Everything needed to resume (suite,
//! resumption PSK, ALPN, early-data allowance, age-add) is serialized into a
//! [`SessionState`] and sealed under a [`TicketKey`]; the sealed blob is the
//! ticket identity the client echoes back in its `pre_shared_key` offer.
//!
//! Sealed blob layout:
//! ```text
//! salt (12) || AEAD(key, nonce = iv ^ salt, aad = "milli-tls ticket", state)
//! ```
//!
//! The client keeps a [`Ticket`]: the opaque identity plus the PSK and
//! metadata it needs to offer it again, serializable for persistence.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use crate::crypto::{hash_output, AeadAlgorithm, CryptoProvider, HashOutput, Rng};
use crate::error::{Error, Result};
use crate::tls::codec::{expect_end, get_u16, get_u32, get_u8, get_vec16, get_vec8, put_u16, put_u32, put_vec16, put_vec8};
use crate::tls::messages::CipherSuite;

const SALT_LEN: usize = 12;
const TICKET_AAD: &[u8] = b"milli-tls ticket";
const STATE_VERSION: u8 = 1;
const TICKET_VERSION: u8 = 1;

/// Server-side key sealing session state into ticket identities.
///
/// Shared read-only between connections through the configuration.
#[derive(Clone)]
pub struct TicketKey {
    alg: AeadAlgorithm,
    key: heapless::Vec<u8, 32>,
    iv: [u8; SALT_LEN],
}

impl TicketKey {
    /// Build a key from an algorithm name (`"AES128-GCM"`, `"AES256-GCM"`,
    /// `"CHACHA20-POLY1305"`) and `key || iv` (key length + 12 bytes).
    pub fn new(alg: &str, key_and_iv: &[u8]) -> Result<Self> {
        let alg = AeadAlgorithm::from_name(alg).ok_or(Error::Config("unknown ticket key algorithm"))?;
        let key_len = alg.key_len();
        if key_and_iv.len() != key_len + SALT_LEN {
            return Err(Error::Config("ticket key must be key || 12-byte iv"));
        }
        let key = heapless::Vec::from_slice(&key_and_iv[..key_len])
            .map_err(|_| Error::Config("ticket key too long"))?;
        let mut iv = [0u8; SALT_LEN];
        iv.copy_from_slice(&key_and_iv[key_len..]);
        Ok(Self { alg, key, iv })
    }

    /// A fresh random key.
    pub fn generate<R: Rng + ?Sized>(alg: AeadAlgorithm, rng: &mut R) -> Self {
        let mut key = heapless::Vec::new();
        // key_len is at most 32.
        let _ = key.resize(alg.key_len(), 0);
        rng.fill(&mut key);
        let mut iv = [0u8; SALT_LEN];
        rng.fill(&mut iv);
        Self { alg, key, iv }
    }

    pub fn algorithm(&self) -> AeadAlgorithm {
        self.alg
    }

    fn nonce(&self, salt: &[u8]) -> [u8; SALT_LEN] {
        let mut nonce = self.iv;
        for (n, s) in nonce.iter_mut().zip(salt) {
            *n ^= s;
        }
        nonce
    }

    /// Seal `plaintext` with a caller-chosen random `salt`.
    pub fn seal<C: CryptoProvider + ?Sized>(
        &self,
        provider: &C,
        salt: &[u8; SALT_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let aead = provider.aead(self.alg, &self.key)?;
        let mut out = vec![0u8; SALT_LEN + plaintext.len() + aead.tag_len()];
        out[..SALT_LEN].copy_from_slice(salt);
        out[SALT_LEN..SALT_LEN + plaintext.len()].copy_from_slice(plaintext);
        let sealed = aead.seal_in_place(&self.nonce(salt), TICKET_AAD, &mut out[SALT_LEN..], plaintext.len())?;
        out.truncate(SALT_LEN + sealed);
        Ok(out)
    }

    /// Open a blob produced by [`TicketKey::seal`].
    pub fn open<C: CryptoProvider + ?Sized>(&self, provider: &C, blob: &[u8]) -> Result<Vec<u8>> {
        let aead = provider.aead(self.alg, &self.key)?;
        if blob.len() < SALT_LEN + aead.tag_len() {
            return Err(Error::DecryptError("ticket"));
        }
        let (salt, sealed) = blob.split_at(SALT_LEN);
        let mut buf = sealed.to_vec();
        let len = aead
            .open_in_place(&self.nonce(salt), TICKET_AAD, &mut buf, sealed.len())
            .map_err(|_| Error::DecryptError("ticket"))?;
        buf.truncate(len);
        Ok(buf)
    }
}

impl fmt::Debug for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketKey").field("alg", &self.alg).finish_non_exhaustive()
    }
}

/// Resumable session state sealed into a ticket identity.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionState {
    pub cipher_suite: CipherSuite,
    pub psk: HashOutput,
    pub alpn: Option<Vec<u8>>,
    pub max_early_data: u32,
    pub age_add: u32,
}

impl SessionState {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.push(STATE_VERSION);
        put_u16(&mut out, self.cipher_suite.to_u16());
        put_vec8(&mut out, &self.psk);
        put_vec8(&mut out, self.alpn.as_deref().unwrap_or_default());
        put_u32(&mut out, self.max_early_data);
        put_u32(&mut out, self.age_add);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut off = 0;
        if get_u8(data, &mut off, "session state")? != STATE_VERSION {
            return Err(Error::Decode("session state"));
        }
        let cipher_suite = CipherSuite::from_u16(get_u16(data, &mut off, "session state")?)
            .ok_or(Error::Decode("session state"))?;
        let psk = hash_output(get_vec8(data, &mut off, "session state")?)?;
        let alpn = get_vec8(data, &mut off, "session state")?;
        let max_early_data = get_u32(data, &mut off, "session state")?;
        let age_add = get_u32(data, &mut off, "session state")?;
        expect_end(data, off, "session state")?;
        Ok(Self {
            cipher_suite,
            psk,
            alpn: (!alpn.is_empty()).then(|| alpn.to_vec()),
            max_early_data,
            age_add,
        })
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("cipher_suite", &self.cipher_suite)
            .field("alpn", &self.alpn)
            .field("max_early_data", &self.max_early_data)
            .finish_non_exhaustive()
    }
}

/// A ticket received by the client, ready to be offered for resumption.
#[derive(Clone, PartialEq, Eq)]
pub struct Ticket {
    /// Opaque identity chosen by the server.
    pub identity: Vec<u8>,
    /// Resumption PSK derived from the ticket nonce.
    pub psk: HashOutput,
    pub cipher_suite: CipherSuite,
    /// ALPN negotiated on the connection that issued the ticket.
    pub alpn: Option<Vec<u8>>,
    /// Lifetime hint, seconds.
    pub lifetime: u32,
    pub age_add: u32,
    /// 0 when the server does not accept early data on this ticket.
    pub max_early_data: u32,
    pub server_name: Option<String>,
}

impl Ticket {
    pub fn allows_early_data(&self) -> bool {
        self.max_early_data > 0
    }

    /// `obfuscated_ticket_age` for a ticket `age_ms` milliseconds old.
    pub fn obfuscated_age(&self, age_ms: u32) -> u32 {
        age_ms.wrapping_add(self.age_add)
    }

    /// Serialize for persistence.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.identity.len() + 96);
        out.push(TICKET_VERSION);
        put_vec16(&mut out, &self.identity);
        put_vec8(&mut out, &self.psk);
        put_u16(&mut out, self.cipher_suite.to_u16());
        put_vec8(&mut out, self.alpn.as_deref().unwrap_or_default());
        put_u32(&mut out, self.lifetime);
        put_u32(&mut out, self.age_add);
        put_u32(&mut out, self.max_early_data);
        put_vec8(&mut out, self.server_name.as_deref().unwrap_or_default().as_bytes());
        out
    }

    /// Parse bytes produced by [`Ticket::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut off = 0;
        if get_u8(data, &mut off, "ticket")? != TICKET_VERSION {
            return Err(Error::Decode("ticket"));
        }
        let identity = get_vec16(data, &mut off, "ticket")?;
        if identity.is_empty() {
            return Err(Error::Decode("ticket"));
        }
        let psk = hash_output(get_vec8(data, &mut off, "ticket")?)?;
        let cipher_suite =
            CipherSuite::from_u16(get_u16(data, &mut off, "ticket")?).ok_or(Error::Decode("ticket"))?;
        let alpn = get_vec8(data, &mut off, "ticket")?;
        let lifetime = get_u32(data, &mut off, "ticket")?;
        let age_add = get_u32(data, &mut off, "ticket")?;
        let max_early_data = get_u32(data, &mut off, "ticket")?;
        let server_name = get_vec8(data, &mut off, "ticket")?;
        expect_end(data, off, "ticket")?;
        let server_name = core::str::from_utf8(server_name).map_err(|_| Error::Decode("ticket"))?;
        Ok(Self {
            identity: identity.to_vec(),
            psk,
            cipher_suite,
            alpn: (!alpn.is_empty()).then(|| alpn.to_vec()),
            lifetime,
            age_add,
            max_early_data,
            server_name: (!server_name.is_empty()).then(|| String::from(server_name)),
        })
    }
}

impl fmt::Debug for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket")
            .field("identity_len", &self.identity.len())
            .field("cipher_suite", &self.cipher_suite)
            .field("alpn", &self.alpn)
            .field("lifetime", &self.lifetime)
            .field("max_early_data", &self.max_early_data)
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}
