//! TLS 1.3 handshake engine for QUIC.
//!
//! QUIC uses TLS 1.3 differently from TCP:
//! - No TLS record layer: handshake messages travel raw in CRYPTO frames
//! - No TLS content encryption: QUIC does its own packet protection
//! - QUIC transport parameters are exchanged as a TLS extension
//!
//! The engine produces and consumes handshake message bytes and derives the
//! traffic secrets QUIC needs for packet protection.

pub mod alert;
pub(crate) mod codec;
pub mod extensions;
pub mod handshake;
pub mod key_schedule;
pub mod messages;
pub mod result;
pub mod ticket;
pub mod transcript;
pub mod transport_params;

use core::fmt;

pub use alert::AlertDescription;
pub use handshake::{EarlyDataStatus, Phase};
pub use messages::CipherSuite;
pub use result::{HandshakeResult, Processed};
pub use ticket::{Ticket, TicketKey};
pub use transport_params::TransportParams;

use crate::crypto::{AeadAlgorithm, HashAlgorithm, HashOutput};

/// Client or server role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}

/// A phase of the handshake with its own secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Epoch {
    /// 0-RTT traffic, client to server only.
    EarlyTraffic = 0,
    EarlyExporter = 1,
    HandshakeTraffic = 2,
    /// 1-RTT traffic.
    ApplicationTraffic = 3,
    Exporter = 4,
}

impl Epoch {
    pub(crate) const COUNT: usize = 5;
}

/// A derived secret, handed out by value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret {
    pub epoch: Epoch,
    pub hash: HashAlgorithm,
    pub aead: AeadAlgorithm,
    pub secret: HashOutput,
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("epoch", &self.epoch)
            .field("hash", &self.hash)
            .field("aead", &self.aead)
            .finish_non_exhaustive()
    }
}
