//! TLS 1.3 handshake state machines.
//!
//! Client:
//! ```text
//! Start -> WaitServerHello (-> HelloRetryRequest -> WaitServerHello)
//!       -> WaitEncryptedExtensions -> WaitCertificate -> WaitCertificateVerify
//!       -> WaitFinished -> Complete
//! ```
//! (a resumed handshake skips Certificate and CertificateVerify).
//!
//! Server:
//! ```text
//! WaitClientHello (-> HelloRetryRequest -> WaitRetriedClientHello)
//!       -> WaitFinished -> Complete
//! ```
//!
//! Each role consumes whole messages handed to it by the connection and
//! pushes whatever it must send next onto the outbound queue. State shared
//! by both roles lives in [`Session`].

pub(crate) mod client;
pub(crate) mod server;

use alloc::string::String;
use alloc::vec::Vec;

use log::debug;

use crate::config::Config;
use crate::crypto::{CryptoProvider, HashAlgorithm, HashOutput, Hkdf, NamedGroup, Rng};
use crate::error::{Error, Result};
use crate::io::OutboundQueue;
use crate::tls::key_schedule::KeySchedule;
use crate::tls::messages::CipherSuite;
use crate::tls::ticket::Ticket;
use crate::tls::transcript::Transcript;
use crate::tls::{Epoch, TransportParams};

pub(crate) use client::ClientHandshake;
pub(crate) use server::ServerHandshake;

/// Coarse handshake progress, common to both roles. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Start,
    /// Client: ClientHello sent.
    SentHello,
    /// Server: ClientHello received and answered with a retry request.
    ReceivedHello,
    /// Client: ServerHello processed, handshake secrets derived.
    NegotiatedParams,
    /// Client: waiting for Certificate / CertificateVerify.
    AwaitingPeerAuth,
    AwaitingFinished,
    Complete,
    CompleteWithEarlyData,
    Failed,
}

/// 0-RTT progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EarlyDataStatus {
    NotOffered,
    /// Client: offered, server's answer not seen yet.
    Offered,
    Accepted,
    Rejected,
}

/// A point the caller must be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Milestone {
    EarlyData,
    Complete,
}

/// Randomness drawn once when the connection is created.
pub(crate) struct Entropy {
    pub random: [u8; 32],
    /// One key-exchange seed per possible ClientHello / ServerHello.
    pub kx_seeds: [[u8; 32]; 2],
    pub age_add: u32,
    pub ticket_salt: [u8; 12],
}

impl Entropy {
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut e = Self {
            random: [0; 32],
            kx_seeds: [[0; 32]; 2],
            age_add: 0,
            ticket_salt: [0; 12],
        };
        rng.fill(&mut e.random);
        rng.fill(&mut e.kx_seeds[0]);
        rng.fill(&mut e.kx_seeds[1]);
        let mut age_add = [0u8; 4];
        rng.fill(&mut age_add);
        e.age_add = u32::from_be_bytes(age_add);
        rng.fill(&mut e.ticket_salt);
        e
    }
}

/// Negotiated state both roles share.
pub(crate) struct Session {
    pub suite: Option<CipherSuite>,
    pub group: Option<NamedGroup>,
    pub transcript: Transcript,
    pub schedule: Option<KeySchedule>,
    pub alpn: Option<Vec<u8>>,
    pub server_name: Option<String>,
    pub peer_transport_params: Option<TransportParams>,
    /// Peer chain as `u24 length || DER` entries.
    pub peer_certificate: Option<Vec<u8>>,
    pub early_data: EarlyDataStatus,
    pub resumed: bool,
    /// Client: most recent ticket received.
    pub ticket: Option<Ticket>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            suite: None,
            group: None,
            transcript: Transcript::new(),
            schedule: None,
            alpn: None,
            server_name: None,
            peer_transport_params: None,
            peer_certificate: None,
            early_data: EarlyDataStatus::NotOffered,
            resumed: false,
            ticket: None,
        }
    }

    pub fn schedule(&self) -> Result<&KeySchedule> {
        self.schedule.as_ref().ok_or(Error::InvalidState)
    }

    pub fn schedule_mut(&mut self) -> Result<&mut KeySchedule> {
        self.schedule.as_mut().ok_or(Error::InvalidState)
    }

    /// Transcript hash under `alg`, whether or not hashing has started.
    pub fn transcript_hash<C: CryptoProvider + ?Sized>(
        &self,
        provider: &C,
        alg: HashAlgorithm,
    ) -> Result<HashOutput> {
        if self.transcript.is_started() {
            self.transcript.current_hash()
        } else {
            self.transcript.hash_with(provider, alg, &[])
        }
    }

    /// Derive `epoch` from the current transcript.
    pub fn derive<C: CryptoProvider + ?Sized>(&mut self, provider: &C, epoch: Epoch) -> Result<()> {
        let alg = self.schedule()?.suite().hash();
        let hash = self.transcript_hash(provider, alg)?;
        let hkdf = provider.hkdf(alg)?;
        self.schedule_mut()?.derive(hkdf, epoch, &hash)
    }
}

/// Everything a state machine touches while handling one message.
pub(crate) struct Context<'a, C: ?Sized> {
    pub provider: &'a C,
    pub config: &'a Config,
    pub session: &'a mut Session,
    pub out: &'a mut OutboundQueue,
}

impl<'a, C: CryptoProvider + ?Sized> Context<'a, C> {
    pub fn hkdf(&self, alg: HashAlgorithm) -> Result<&'a dyn Hkdf> {
        let provider: &'a C = self.provider;
        provider.hkdf(alg)
    }

    /// Record a message we send in the transcript and queue it.
    pub fn send(&mut self, message: &[u8]) {
        self.session.transcript.update(message);
        self.out.push(message);
    }

    /// A key schedule for `suite`, seeded with `psk` if given.
    pub fn new_schedule(&self, suite: CipherSuite, psk: Option<&[u8]>) -> Result<KeySchedule> {
        let alg = suite.hash();
        let empty = self.provider.hash(alg, &[])?;
        Ok(KeySchedule::new(self.hkdf(alg)?, suite, empty, psk))
    }

    /// Start hashing the transcript with the negotiated suite's hash.
    pub fn start_transcript(&mut self, suite: CipherSuite) -> Result<()> {
        if !self.session.transcript.is_started() {
            let hasher = self.provider.hasher(suite.hash())?;
            self.session.transcript.start(hasher);
        }
        Ok(())
    }

    pub fn derive(&mut self, epoch: Epoch) -> Result<()> {
        self.session.derive(self.provider, epoch)
    }

    /// verify_data of the Finished sent by `sender`, over the current transcript.
    pub fn finished_verify_data(&self, sender: crate::tls::Role) -> Result<HashOutput> {
        let schedule = self.session.schedule()?;
        let hash = self.session.transcript.current_hash()?;
        schedule.finished_verify_data(self.hkdf(schedule.suite().hash())?, sender, &hash)
    }

    /// Derive the 1-RTT and exporter secrets (transcript is at server Finished).
    pub fn derive_application_secrets(&mut self) -> Result<()> {
        self.derive(Epoch::ApplicationTraffic)?;
        self.derive(Epoch::Exporter)
    }

    /// Derive the resumption master secret (transcript is at client Finished).
    pub fn derive_resumption_master(&mut self) -> Result<()> {
        let hash = self.session.transcript.current_hash()?;
        let alg = self.session.schedule()?.suite().hash();
        let hkdf = self.provider.hkdf(alg)?;
        self.session.schedule_mut()?.derive_resumption_master(hkdf, &hash)
    }
}

/// The role-specific state machine of a connection.
pub(crate) enum Machine {
    Client(ClientHandshake),
    Server(ServerHandshake),
}

impl Machine {
    pub fn phase(&self, session: &Session) -> Phase {
        let phase = match self {
            Machine::Client(c) => c.phase(),
            Machine::Server(s) => s.phase(),
        };
        if phase == Phase::Complete && session.early_data == EarlyDataStatus::Accepted {
            Phase::CompleteWithEarlyData
        } else {
            phase
        }
    }

    /// Produce anything owed without input: the client's first flight, the
    /// server's post-handshake ticket.
    pub fn poll<C: CryptoProvider + ?Sized>(&mut self, cx: &mut Context<'_, C>) -> Result<Option<Milestone>> {
        match self {
            Machine::Client(c) => c.poll(cx),
            Machine::Server(s) => s.poll(cx).map(|()| None),
        }
    }

    /// Handle one complete handshake message (header included).
    pub fn handle<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
    ) -> Result<Option<Milestone>> {
        let milestone = match self {
            Machine::Client(c) => c.handle(cx, message),
            Machine::Server(s) => s.handle(cx, message),
        }?;
        debug!("now in {:?}", self.phase(cx.session));
        Ok(milestone)
    }
}

/// Constant-time comparison of two byte slices.
pub(crate) fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (&x, &y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ct_eq_works() {
        assert!(ct_eq(b"hello", b"hello"));
        assert!(!ct_eq(b"hello", b"world"));
        assert!(!ct_eq(b"hello", b"hell"));
        assert!(ct_eq(b"", b""));
    }

    #[test]
    fn phases_are_ordered() {
        assert!(Phase::Start < Phase::SentHello);
        assert!(Phase::AwaitingFinished < Phase::Complete);
        assert!(Phase::CompleteWithEarlyData < Phase::Failed);
    }

    struct Counter(u8);
    impl Rng for Counter {
        fn fill(&mut self, buf: &mut [u8]) {
            for b in buf.iter_mut() {
                *b = self.0;
                self.0 = self.0.wrapping_add(1);
            }
        }
    }

    #[test]
    fn entropy_is_drawn_in_order() {
        let e = Entropy::draw(&mut Counter(0));
        assert_eq!(e.random[0], 0);
        assert_eq!(e.kx_seeds[0][0], 32);
        assert_eq!(e.kx_seeds[1][0], 64);
        assert_eq!(e.age_add, u32::from_be_bytes([96, 97, 98, 99]));
        assert_eq!(e.ticket_salt[0], 100);
    }
}
