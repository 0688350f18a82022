//! One TLS 1.3 handshake, driven by the caller.
//!
//! A [`Connection`] owns everything a single handshake needs: the
//! role-specific state machine, the negotiated session, the reassembly
//! buffer for partial input and the queue of output not yet handed out.
//! The caller moves bytes between it and the QUIC CRYPTO streams:
//!
//! ```text
//! loop {
//!     let p = conn.process(&input[off..], &mut out);
//!     off += p.consumed;
//!     send(&out[..p.written]);
//!     match p.result { ... }
//! }
//! ```
//!
//! Nothing here blocks or draws entropy after construction.

use alloc::format;
use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, warn};

use crate::config::Config;
use crate::crypto::{AeadAlgorithm, CryptoProvider, HashOutput, NamedGroup, Rng};
use crate::error::{Error, Result};
use crate::io::{InboundBuffer, OutboundQueue};
use crate::tls::handshake::{
    ClientHandshake, Context, EarlyDataStatus, Entropy, Machine, Milestone, Phase, ServerHandshake,
    Session,
};
use crate::tls::{
    AlertDescription, CipherSuite, Epoch, HandshakeResult, Processed, Role, Secret, Ticket,
    TicketKey, TransportParams,
};

/// A client or server handshake in progress.
pub struct Connection<C: CryptoProvider> {
    provider: C,
    config: Arc<Config>,
    machine: Machine,
    session: Session,
    inbound: InboundBuffer,
    outbound: OutboundQueue,
    /// Reached but not yet reported (output was still queued).
    milestone: Option<Milestone>,
    /// Sticky fatal result.
    failure: Option<HandshakeResult>,
}

impl<C: CryptoProvider> Connection<C> {
    /// Create a connection for the role of `config`.
    ///
    /// All randomness the handshake will use is drawn from `rng` here. A
    /// server without a configured ticket key gets a fresh one for this
    /// connection only; its ticket is issued but cannot resume.
    pub fn new<R: Rng + ?Sized>(provider: C, config: Arc<Config>, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let entropy = Entropy::draw(rng);
        let machine = match config.role() {
            Role::Client => Machine::Client(ClientHandshake::new(entropy)),
            Role::Server => {
                let key = match &config.ticket_key {
                    Some(key) => key.clone(),
                    None => {
                        let alg = config
                            .cipher_suites
                            .first()
                            .map_or(AeadAlgorithm::Aes128Gcm, |s| s.aead());
                        Arc::new(TicketKey::generate(alg, rng))
                    }
                };
                Machine::Server(ServerHandshake::new(entropy, key))
            }
        };
        debug!("new {:?} connection", config.role());
        Ok(Self {
            provider,
            config,
            machine,
            session: Session::new(),
            inbound: InboundBuffer::new(),
            outbound: OutboundQueue::new(),
            milestone: None,
            failure: None,
        })
    }

    /// Feed peer bytes and collect bytes to send.
    ///
    /// All of `input` is taken: complete messages are handled and a partial
    /// tail is kept for the next call. At most `output.len()` bytes are
    /// written; the rest stays queued and the call reports
    /// [`HandshakeResult::WouldBlock`] until it has been drained.
    ///
    /// A failing call consumes input only up to and including the message
    /// that failed. Once a fatal result was returned, every later call
    /// returns it again without consuming or writing anything.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> Processed {
        if let Some(failure) = &self.failure {
            return Processed {
                consumed: 0,
                written: 0,
                result: failure.clone(),
            };
        }

        let held = self.inbound.buffered();
        let taken = self.inbound.taken();
        if let Err(e) = self.advance(input) {
            // Bytes of this call that went into handled messages.
            let consumed = (self.inbound.taken() - taken).saturating_sub(held);
            return Processed {
                consumed: consumed.min(input.len()),
                written: 0,
                result: self.fail(&e),
            };
        }

        let written = self.outbound.drain_into(output);
        let result = if !self.outbound.is_empty() {
            debug!("{} bytes of output still queued", self.outbound.len());
            HandshakeResult::WouldBlock
        } else {
            match self.milestone.take() {
                Some(Milestone::EarlyData) => HandshakeResult::EarlyData,
                Some(Milestone::Complete) if self.session.early_data == EarlyDataStatus::Accepted => {
                    HandshakeResult::CompleteWithEarlyData
                }
                Some(Milestone::Complete) => HandshakeResult::Complete,
                None => HandshakeResult::WouldBlock,
            }
        };
        Processed {
            consumed: input.len(),
            written,
            result,
        }
    }

    fn advance(&mut self, input: &[u8]) -> Result<()> {
        let mut cx = Context {
            provider: &self.provider,
            config: &self.config,
            session: &mut self.session,
            out: &mut self.outbound,
        };

        if let Some(m) = self.machine.poll(&mut cx)? {
            self.milestone = Some(m);
        }

        self.inbound.feed(input);
        while let Some(message) = self.inbound.next_message()? {
            if let Some(m) = self.machine.handle(&mut cx, &message)? {
                self.milestone = Some(m);
            }
        }
        Ok(())
    }

    fn fail(&mut self, err: &Error) -> HandshakeResult {
        warn!(
            "{:?} handshake failed in {:?}: {}",
            self.config.role(),
            self.machine.phase(&self.session),
            err
        );
        self.outbound.clear();
        self.milestone = None;
        let result = HandshakeResult::from(err);
        self.failure = Some(result.clone());
        result
    }

    /// Record a fatal alert the peer reported through the transport, such
    /// as a QUIC CONNECTION_CLOSE with a crypto error code.
    pub fn receive_alert(&mut self, alert: AlertDescription) -> HandshakeResult {
        if let Some(failure) = &self.failure {
            return failure.clone();
        }
        warn!("peer sent {} alert", alert);
        self.outbound.clear();
        self.milestone = None;
        let result = HandshakeResult::AlertError {
            alert,
            message: format!("peer sent {} alert", alert),
        };
        self.failure = Some(result.clone());
        result
    }

    pub fn phase(&self) -> Phase {
        if self.failure.is_some() {
            Phase::Failed
        } else {
            self.machine.phase(&self.session)
        }
    }

    pub fn role(&self) -> Role {
        self.config.role()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase(), Phase::Complete | Phase::CompleteWithEarlyData)
    }

    /// The `epoch` secret for traffic written by `role`.
    ///
    /// Early traffic only has a client direction; exporter epochs return
    /// the same secret for both roles.
    pub fn secret(&self, epoch: Epoch, role: Role) -> Result<Secret> {
        self.session
            .schedule
            .as_ref()
            .ok_or(Error::NotYetAvailable(epoch))?
            .secret(epoch, role)
    }

    /// The raw exporter master secret, or the early one if `early`.
    pub fn exporter_secret(&self, early: bool) -> Result<HashOutput> {
        let epoch = if early { Epoch::EarlyExporter } else { Epoch::Exporter };
        self.session
            .schedule
            .as_ref()
            .ok_or(Error::NotYetAvailable(epoch))?
            .exporter_secret(early)
    }

    /// TLS-Exporter(label, "", Hash.length) (RFC 8446 section 7.5).
    pub fn export(&self, label: &[u8], early: bool) -> Result<Vec<u8>> {
        let epoch = if early { Epoch::EarlyExporter } else { Epoch::Exporter };
        let schedule = self
            .session
            .schedule
            .as_ref()
            .ok_or(Error::NotYetAvailable(epoch))?;
        let hash = schedule.suite().hash();
        schedule.export(self.provider.hkdf(hash)?, early, label, hash.output_len())
    }

    /// Client: the most recent ticket the server issued.
    pub fn ticket(&self) -> Result<Ticket> {
        self.session.ticket.clone().ok_or(Error::NoTicket)
    }

    pub fn cipher_suite(&self) -> Option<CipherSuite> {
        self.session.suite
    }

    pub fn named_group(&self) -> Option<NamedGroup> {
        self.session.group
    }

    /// The negotiated ALPN protocol.
    pub fn alpn(&self) -> Option<&[u8]> {
        self.session.alpn.as_deref()
    }

    pub fn server_name(&self) -> Option<&str> {
        self.session.server_name.as_deref()
    }

    pub fn peer_transport_params(&self) -> Option<&TransportParams> {
        self.session.peer_transport_params.as_ref()
    }

    /// Client: the server's chain as `u24 length || DER` entries, leaf
    /// first. See [`crate::pki::split_chain`].
    pub fn peer_certificate(&self) -> Option<&[u8]> {
        self.session.peer_certificate.as_deref()
    }

    pub fn early_data_status(&self) -> EarlyDataStatus {
        self.session.early_data
    }

    /// Whether the handshake resumed a session from a ticket.
    pub fn is_resumed(&self) -> bool {
        self.session.resumed
    }

    /// Output bytes waiting for capacity.
    pub fn pending_output(&self) -> usize {
        self.outbound.len()
    }

    /// Input bytes held back as an incomplete message.
    pub fn buffered_input(&self) -> usize {
        self.inbound.buffered()
    }
}

impl<C: CryptoProvider> core::fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Connection")
            .field("role", &self.config.role())
            .field("phase", &self.phase())
            .field("suite", &self.session.suite)
            .field("early_data", &self.session.early_data)
            .finish_non_exhaustive()
    }
}
