//! Immutable per-endpoint configuration and the application hooks.
//!
//! A [`Config`] is built once, wrapped in an `Arc`, and shared by every
//! connection of an endpoint. Collaborators are held as `Arc<dyn _>`, so a
//! connection may move to another thread as long as they are `Send + Sync`.

pub mod policy;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use crate::crypto::NamedGroup;
use crate::error::{Error, Result};
use crate::pki::{CertificateCallbacks, SignatureScheme};
use crate::tls::extensions::{CustomExtension, MAX_COOKIE_LEN, MAX_EXTENSION_LEN};
use crate::tls::messages::MAX_TICKET_LIFETIME;
use crate::tls::ticket::{Ticket, TicketKey};
use crate::tls::{CipherSuite, Role, TransportParams};

/// What to do with a hello, as decided by a [`Negotiator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationAction {
    Accept,
    /// Server only: answer with a HelloRetryRequest.
    Retry,
    Abort,
}

/// A [`Negotiator`] decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub action: NegotiationAction,
    /// Server: extensions to add to EncryptedExtensions.
    pub extensions: Vec<CustomExtension>,
    /// Server, with `Retry`: cookie to put in the HelloRetryRequest.
    pub cookie: Option<Vec<u8>>,
}

impl Negotiation {
    pub fn accept() -> Self {
        Self {
            action: NegotiationAction::Accept,
            extensions: Vec::new(),
            cookie: None,
        }
    }

    pub fn abort() -> Self {
        Self {
            action: NegotiationAction::Abort,
            ..Self::accept()
        }
    }

    pub fn retry(cookie: Option<Vec<u8>>) -> Self {
        Self {
            action: NegotiationAction::Retry,
            cookie,
            ..Self::accept()
        }
    }

    pub fn with_extension(mut self, ext: CustomExtension) -> Self {
        self.extensions.push(ext);
        self
    }

    /// Reject a cookie or extension that cannot be encoded.
    pub(crate) fn check_lengths(&self) -> Result<()> {
        if self
            .cookie
            .as_ref()
            .is_some_and(|c| c.is_empty() || c.len() > MAX_COOKIE_LEN)
        {
            return Err(Error::Config("negotiator cookie must be 1 to 65533 bytes"));
        }
        if self.extensions.iter().any(|e| e.data.len() > MAX_EXTENSION_LEN) {
            return Err(Error::Config("negotiator extension too long"));
        }
        Ok(())
    }
}

/// Application hook over the peer's extensions.
///
/// Called once per ClientHello on the server (with the cookie echoed back
/// after a retry, if any) and once per EncryptedExtensions on the client.
/// On the server `Accept` also decides whether offered 0-RTT is taken.
pub trait Negotiator: Send + Sync {
    fn negotiate(&self, version: u16, peer_extensions: &[u8], cookie: Option<&[u8]>) -> Negotiation;
}

/// Client hook for tickets as they arrive.
pub trait TicketSink: Send + Sync {
    fn on_ticket(&self, server_name: Option<&str>, ticket: &Ticket);
}

/// Endpoint configuration.
#[derive(Clone)]
pub struct Config {
    pub(crate) role: Role,
    pub(crate) server_name: Option<String>,
    pub(crate) alpn: Vec<Vec<u8>>,
    pub(crate) cipher_suites: Vec<CipherSuite>,
    pub(crate) signature_schemes: Vec<SignatureScheme>,
    pub(crate) named_groups: Vec<NamedGroup>,
    pub(crate) enable_0rtt: bool,
    pub(crate) ticket: Option<Ticket>,
    pub(crate) ticket_key: Option<Arc<TicketKey>>,
    pub(crate) ticket_lifetime: u32,
    pub(crate) custom_extensions: Vec<CustomExtension>,
    pub(crate) transport_params: Option<TransportParams>,
    pub(crate) certificates: Option<Arc<dyn CertificateCallbacks>>,
    pub(crate) negotiator: Option<Arc<dyn Negotiator>>,
    pub(crate) ticket_sink: Option<Arc<dyn TicketSink>>,
}

impl Config {
    fn new(role: Role) -> Self {
        Self {
            role,
            server_name: None,
            alpn: Vec::new(),
            cipher_suites: vec![
                CipherSuite::TlsAes128GcmSha256,
                CipherSuite::TlsAes256GcmSha384,
                CipherSuite::TlsChacha20Poly1305Sha256,
            ],
            signature_schemes: vec![SignatureScheme::EcdsaSecp256r1Sha256, SignatureScheme::Ed25519],
            named_groups: vec![NamedGroup::X25519, NamedGroup::Secp256r1],
            enable_0rtt: false,
            ticket: None,
            ticket_key: None,
            ticket_lifetime: MAX_TICKET_LIFETIME,
            custom_extensions: Vec::new(),
            transport_params: None,
            certificates: None,
            negotiator: None,
            ticket_sink: None,
        }
    }

    /// Client configuration for connecting to `host` (sent as SNI).
    pub fn client(host: &str) -> Self {
        Self {
            server_name: (!host.is_empty()).then(|| String::from(host)),
            ..Self::new(Role::Client)
        }
    }

    pub fn server() -> Self {
        Self::new(Role::Server)
    }

    /// ALPN protocols, in preference order. Each name is 1 to 255 bytes.
    pub fn with_alpn<P: AsRef<[u8]>>(mut self, protocols: &[P]) -> Result<Self> {
        let mut list_len = 2;
        for p in protocols {
            let p = p.as_ref();
            if p.is_empty() || p.len() > u8::MAX as usize {
                return Err(Error::Config("ALPN protocol name must be 1 to 255 bytes"));
            }
            list_len += 1 + p.len();
        }
        if list_len > MAX_EXTENSION_LEN {
            return Err(Error::Config("ALPN protocol list too long"));
        }
        self.alpn = protocols.iter().map(|p| p.as_ref().to_vec()).collect();
        Ok(self)
    }

    /// e.g. `"TLS_AES_128_GCM_SHA256:TLS_CHACHA20_POLY1305_SHA256"`.
    pub fn with_cipher_suites(mut self, policy: &str) -> Result<Self> {
        self.cipher_suites = policy::parse_cipher_suites(policy)?;
        Ok(self)
    }

    /// e.g. `"ECDSA+SHA256:Ed25519"`.
    pub fn with_signature_algorithms(mut self, policy: &str) -> Result<Self> {
        self.signature_schemes = policy::parse_signature_schemes(policy)?;
        Ok(self)
    }

    /// e.g. `"X25519:P-256"`. The client sends a key share for the first.
    pub fn with_named_groups(mut self, policy: &str) -> Result<Self> {
        self.named_groups = policy::parse_named_groups(policy)?;
        Ok(self)
    }

    /// Client: send 0-RTT when the offered ticket allows it.
    /// Server: allow 0-RTT on issued tickets and accept it when offered.
    pub fn with_early_data(mut self, enable: bool) -> Self {
        self.enable_0rtt = enable;
        self
    }

    /// Client: ticket to offer for resumption.
    pub fn with_ticket(mut self, ticket: Ticket) -> Self {
        self.ticket = Some(ticket);
        self
    }

    /// Server: key for sealing issued tickets, shared by every connection
    /// so they can resume each other's sessions. Without one each
    /// connection seals its ticket under a random key of its own.
    pub fn with_ticket_key(mut self, key: TicketKey) -> Self {
        self.ticket_key = Some(Arc::new(key));
        self
    }

    /// Server: lifetime advertised in issued tickets, capped at 7 days.
    pub fn with_ticket_lifetime(mut self, seconds: u32) -> Self {
        self.ticket_lifetime = seconds.min(MAX_TICKET_LIFETIME);
        self
    }

    /// Client: an extra extension for the ClientHello.
    pub fn with_custom_extension(mut self, ext: CustomExtension) -> Result<Self> {
        if ext.is_builtin() {
            return Err(Error::Config("custom extension collides with a built-in one"));
        }
        if ext.data.len() > MAX_EXTENSION_LEN {
            return Err(Error::Config("custom extension too long"));
        }
        self.custom_extensions.push(ext);
        Ok(self)
    }

    /// Our QUIC transport parameters, carried opaquely to the peer.
    pub fn with_transport_params(mut self, params: TransportParams) -> Self {
        self.transport_params = Some(params);
        self
    }

    pub fn with_certificates(mut self, certificates: Arc<dyn CertificateCallbacks>) -> Self {
        self.certificates = Some(certificates);
        self
    }

    pub fn with_negotiator(mut self, negotiator: Arc<dyn Negotiator>) -> Self {
        self.negotiator = Some(negotiator);
        self
    }

    pub fn with_ticket_sink(mut self, sink: Arc<dyn TicketSink>) -> Self {
        self.ticket_sink = Some(sink);
        self
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn early_data_enabled(&self) -> bool {
        self.enable_0rtt
    }

    /// Check the configuration can drive a handshake in its role.
    pub fn validate(&self) -> Result<()> {
        if self.certificates.is_none() {
            return Err(Error::Config("certificate callbacks required"));
        }
        if let (Role::Client, Some(ticket)) = (self.role, &self.ticket) {
            if !self.cipher_suites.contains(&ticket.cipher_suite) {
                return Err(Error::Config("ticket cipher suite not enabled"));
            }
        }
        Ok(())
    }

    pub(crate) fn negotiate(&self, version: u16, peer_extensions: &[u8], cookie: Option<&[u8]>) -> Negotiation {
        match &self.negotiator {
            Some(n) => n.negotiate(version, peer_extensions, cookie),
            None => Negotiation::accept(),
        }
    }
}

impl core::fmt::Debug for Config {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Config")
            .field("role", &self.role)
            .field("server_name", &self.server_name)
            .field("cipher_suites", &self.cipher_suites)
            .field("named_groups", &self.named_groups)
            .field("enable_0rtt", &self.enable_0rtt)
            .field("ticket", &self.ticket)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pki::StaticCertificates;

    #[test]
    fn defaults() {
        let c = Config::client("example.com");
        assert_eq!(c.role(), Role::Client);
        assert_eq!(c.server_name(), Some("example.com"));
        assert_eq!(c.named_groups[0], NamedGroup::X25519);
        assert!(!c.early_data_enabled());
        assert_eq!(Config::server().server_name(), None);
    }

    #[test]
    fn policies_replace_defaults() {
        let c = Config::server()
            .with_cipher_suites("TLS_CHACHA20_POLY1305_SHA256")
            .unwrap()
            .with_named_groups("P-256")
            .unwrap();
        assert_eq!(c.cipher_suites, [CipherSuite::TlsChacha20Poly1305Sha256]);
        assert_eq!(c.named_groups, [NamedGroup::Secp256r1]);
        assert!(Config::server().with_signature_algorithms("RSA").is_err());
    }

    #[test]
    fn certificates_required() {
        assert_eq!(
            Config::server().validate(),
            Err(Error::Config("certificate callbacks required"))
        );
        let c = Config::server().with_certificates(Arc::new(StaticCertificates::new()));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn builtin_custom_extension_rejected() {
        assert!(Config::client("a")
            .with_custom_extension(CustomExtension::new(0x0039, Vec::new()))
            .is_err());
        assert!(Config::client("a")
            .with_custom_extension(CustomExtension::new(0xff01, Vec::new()))
            .is_ok());
    }

    #[test]
    fn alpn_names_must_fit_their_length_byte() {
        let c = Config::client("a").with_alpn(&[b"h3".as_slice(), b"hq-interop"]).unwrap();
        assert_eq!(c.alpn, [b"h3".to_vec(), b"hq-interop".to_vec()]);
        assert!(Config::client("a").with_alpn(&[[b'x'; 255]]).is_ok());
        assert_eq!(
            Config::client("a").with_alpn(&[[b'x'; 256]]).err(),
            Some(Error::Config("ALPN protocol name must be 1 to 255 bytes"))
        );
        assert!(Config::client("a").with_alpn(&[b""]).is_err());
    }

    #[test]
    fn oversized_custom_extension_rejected() {
        let ext = CustomExtension::new(0xff01, vec![0u8; MAX_EXTENSION_LEN + 1]);
        assert_eq!(
            Config::client("a").with_custom_extension(ext).err(),
            Some(Error::Config("custom extension too long"))
        );
    }

    #[test]
    fn ticket_lifetime_capped() {
        assert_eq!(Config::server().with_ticket_lifetime(u32::MAX).ticket_lifetime, MAX_TICKET_LIFETIME);
    }

    #[test]
    fn negotiation_lengths_checked() {
        assert!(Negotiation::retry(Some(vec![1; MAX_COOKIE_LEN])).check_lengths().is_ok());
        assert!(Negotiation::retry(Some(vec![1; MAX_COOKIE_LEN + 1])).check_lengths().is_err());
        assert!(Negotiation::retry(Some(Vec::new())).check_lengths().is_err());
        let big = CustomExtension::new(0xff00, vec![0u8; MAX_EXTENSION_LEN + 1]);
        assert!(Negotiation::accept().with_extension(big).check_lengths().is_err());
    }

    #[test]
    fn negotiator_defaults_to_accept() {
        assert_eq!(Config::server().negotiate(0x0304, &[], None), Negotiation::accept());
    }
}
