//! Ephemeral key exchange for the `key_share` extension.

use crate::error::Result;

/// Named groups (RFC 8446 section 4.2.7) we can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedGroup {
    X25519,
    Secp256r1,
}

impl NamedGroup {
    pub fn to_u16(self) -> u16 {
        match self {
            Self::X25519 => 0x001d,
            Self::Secp256r1 => 0x0017,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x001d => Some(Self::X25519),
            0x0017 => Some(Self::Secp256r1),
            _ => None,
        }
    }

    /// Length of a well-formed public key share.
    pub fn public_key_len(self) -> usize {
        match self {
            Self::X25519 => 32,
            // Uncompressed SEC1 point: 0x04 || x || y
            Self::Secp256r1 => 65,
        }
    }
}

/// ECDHE shared secret (32 bytes for both supported groups).
pub type SharedSecret = heapless::Vec<u8, 48>;

/// One side of an ephemeral key exchange.
pub trait KeyExchange: Send {
    fn group(&self) -> NamedGroup;

    /// Our public key share, as sent on the wire.
    fn public_key(&self) -> &[u8];

    /// Combine our private key with the peer's share.
    fn agree(&self, peer_public: &[u8]) -> Result<SharedSecret>;
}
