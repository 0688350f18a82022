//! Buffer-driven TLS 1.3 handshake engine for QUIC.
//!
//! The engine performs the TLS 1.3 handshake (RFC 8446) the way QUIC
//! (RFC 9001) uses it: no record layer, raw handshake messages in and out,
//! and traffic secrets handed to the transport for packet protection.
//! It does no I/O of its own; see [`Connection::process`].

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(any(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod config;
pub mod connection;
pub mod crypto;
pub mod error;
pub mod io;
pub mod pki;
pub mod tls;

pub use config::{Config, Negotiation, NegotiationAction, Negotiator, TicketSink};
pub use connection::Connection;
pub use crypto::{CryptoProvider, NamedGroup, Rng};
pub use error::{Error, Result};
pub use pki::{CertificateCallbacks, PrivateKey, SignatureScheme, StaticCertificates};
pub use tls::extensions::CustomExtension;
pub use tls::{
    AlertDescription, CipherSuite, EarlyDataStatus, Epoch, HandshakeResult, Phase, Processed, Role,
    Secret, Ticket, TicketKey, TransportParams,
};
