//! Server side of the handshake.

use alloc::sync::Arc;
use alloc::vec::Vec;

use log::{debug, info, trace, warn};

use crate::config::{Negotiation, NegotiationAction};
use crate::crypto::{CryptoProvider, NamedGroup};
use crate::error::{Error, Result};
use crate::pki::{certificate_verify_content, SignatureScheme};
use crate::tls::extensions::{
    encode_encrypted_extensions_data, encode_retry_request_extensions,
    encode_server_hello_extensions, encode_ticket_extensions, parse_client_hello_extensions,
    ClientHelloExtensions, KeyShareEntry,
};
use crate::tls::handshake::{ct_eq, Context, EarlyDataStatus, Entropy, Milestone, Phase};
use crate::tls::messages::{
    encode_certificate, encode_certificate_verify, encode_encrypted_extensions, encode_finished,
    encode_new_session_ticket, encode_server_hello, parse_client_hello, parse_finished, ClientHello,
    HandshakeType, NewSessionTicket, HEADER_LEN, HRR_RANDOM, TLS13,
};
use crate::tls::ticket::{SessionState, TicketKey};
use crate::tls::{CipherSuite, Epoch, Role, TransportParams};

/// `max_early_data_size` QUIC requires in tickets allowing 0-RTT.
const QUIC_MAX_EARLY_DATA: u32 = 0xffff_ffff;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    WaitClientHello,
    /// A HelloRetryRequest was sent.
    WaitRetriedClientHello,
    WaitFinished,
    Complete,
}

/// What a HelloRetryRequest asked for.
struct Retry {
    suite: CipherSuite,
    group: NamedGroup,
    cookie: Option<Vec<u8>>,
}

pub(crate) struct ServerHandshake {
    state: ServerState,
    entropy: Entropy,
    retry: Option<Retry>,
    /// Seals issued tickets and opens offered ones.
    ticket_key: Arc<TicketKey>,
    /// Issue a ticket on the next call.
    ticket_due: bool,
    max_early_data: u32,
}

impl ServerHandshake {
    pub fn new(entropy: Entropy, ticket_key: Arc<TicketKey>) -> Self {
        Self {
            state: ServerState::WaitClientHello,
            entropy,
            retry: None,
            ticket_key,
            ticket_due: false,
            max_early_data: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            ServerState::WaitClientHello => Phase::Start,
            ServerState::WaitRetriedClientHello => Phase::ReceivedHello,
            ServerState::WaitFinished => Phase::AwaitingFinished,
            ServerState::Complete => Phase::Complete,
        }
    }

    /// Issue the session ticket owed since the call that completed.
    pub fn poll<C: CryptoProvider + ?Sized>(&mut self, cx: &mut Context<'_, C>) -> Result<()> {
        if !self.ticket_due {
            return Ok(());
        }
        self.ticket_due = false;

        let schedule = cx.session.schedule()?;
        let suite = schedule.suite();
        // One ticket per connection, so a constant nonce is unique.
        let nonce = [0u8];
        let psk = schedule.resumption_psk(cx.hkdf(suite.hash())?, &nonce)?;
        let state = SessionState {
            cipher_suite: suite,
            psk,
            alpn: cx.session.alpn.clone(),
            max_early_data: self.max_early_data,
            age_add: self.entropy.age_add,
        };
        let identity = self.ticket_key.seal(cx.provider, &self.entropy.ticket_salt, &state.encode())?;
        let extensions = encode_ticket_extensions(self.max_early_data);
        let nst = encode_new_session_ticket(&NewSessionTicket {
            lifetime: cx.config.ticket_lifetime,
            age_add: self.entropy.age_add,
            nonce: &nonce,
            ticket: &identity,
            extensions: &extensions,
        });

        info!(
            "issuing session ticket ({} bytes, early data {})",
            nst.len(),
            self.max_early_data > 0
        );
        // Post-handshake messages are not part of the transcript.
        cx.out.push(&nst);
        Ok(())
    }

    pub fn handle<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
    ) -> Result<Option<Milestone>> {
        let msg_type = HandshakeType::from_u8(message[0]).ok_or(Error::UnexpectedMessage("unknown"))?;
        let body = &message[HEADER_LEN..];
        trace!("server received {} ({} bytes)", msg_type.name(), body.len());

        match (self.state, msg_type) {
            (ServerState::WaitClientHello, HandshakeType::ClientHello)
            | (ServerState::WaitRetriedClientHello, HandshakeType::ClientHello) => {
                self.process_client_hello(cx, message, body)
            }
            (ServerState::WaitFinished, HandshakeType::Finished) => {
                self.process_client_finished(cx, message, body).map(Some)
            }
            (_, other) => Err(Error::UnexpectedMessage(other.name())),
        }
    }

    fn process_client_hello<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
        body: &[u8],
    ) -> Result<Option<Milestone>> {
        let config = cx.config;
        let ch = parse_client_hello(body)?;
        let exts = parse_client_hello_extensions(ch.extensions)?;

        if !exts.supports_tls13 {
            return Err(Error::ProtocolVersion);
        }
        if !ch.session_id.is_empty() {
            return Err(Error::IllegalParameter("legacy_session_id"));
        }

        let suite = self.select_suite(cx, &ch)?;
        let alpn = select_alpn(&config.alpn, &exts)?;

        let peer_tp = match exts.transport_params {
            Some(tp) => Some(TransportParams::decode(tp)?),
            None if config.transport_params.is_some() => {
                return Err(Error::MissingExtension("quic_transport_parameters"));
            }
            None => None,
        };

        let share_group = config.named_groups.iter().copied().find(|g| {
            exts.key_shares.iter().any(|ks| ks.group == g.to_u16())
        });
        if let Some(retry) = &self.retry {
            if share_group != Some(retry.group) || exts.key_shares.len() != 1 {
                return Err(Error::IllegalParameter("key_share after HelloRetryRequest"));
            }
            if retry.cookie.as_deref() != exts.cookie {
                return Err(Error::IllegalParameter("cookie"));
            }
        }

        let negotiation = config.negotiate(TLS13, ch.extensions, exts.cookie);
        negotiation.check_lengths()?;
        match (negotiation.action, &self.retry) {
            (NegotiationAction::Abort, _) => return Err(Error::NegotiationAborted("ClientHello")),
            (NegotiationAction::Retry, Some(_)) => {
                return Err(Error::NegotiationAborted("retry requested twice"))
            }
            (NegotiationAction::Retry, None) => {
                let group = share_group.map_or_else(|| select_retry_group(cx, &exts), Ok)?;
                self.send_retry_request(cx, message, suite, group, negotiation.cookie)?;
                return Ok(None);
            }
            (NegotiationAction::Accept, _) => {}
        }

        let Some(group) = share_group else {
            if self.retry.is_some() {
                return Err(Error::IllegalParameter("key_share"));
            }
            let group = select_retry_group(cx, &exts)?;
            self.send_retry_request(cx, message, suite, group, None)?;
            return Ok(None);
        };
        let client_share = exts
            .key_shares
            .iter()
            .find(|ks| ks.group == group.to_u16())
            .ok_or(Error::InvalidState)?;

        let psk = self.check_psk(cx, message, &exts, suite, alpn)?;
        let schedule = cx.new_schedule(suite, psk.as_ref().map(|p| p.psk.as_slice()))?;
        cx.session.schedule = Some(schedule);
        cx.session.resumed = psk.is_some();

        if exts.early_data {
            let accept = config.enable_0rtt
                && self.retry.is_none()
                && psk.as_ref().is_some_and(|p| p.max_early_data > 0);
            cx.session.early_data = if accept {
                EarlyDataStatus::Accepted
            } else {
                EarlyDataStatus::Rejected
            };
        }

        cx.session.suite = Some(suite);
        cx.session.group = Some(group);
        cx.session.alpn = alpn.map(<[u8]>::to_vec);
        cx.session.server_name = exts.server_name.map(Into::into);
        cx.session.peer_transport_params = peer_tp;
        cx.session.transcript.update(message);
        cx.start_transcript(suite)?;

        let mut milestone = None;
        if cx.session.early_data == EarlyDataStatus::Accepted {
            cx.derive(Epoch::EarlyTraffic)?;
            cx.derive(Epoch::EarlyExporter)?;
            info!("accepting 0-RTT");
            milestone = Some(Milestone::EarlyData);
        }

        let kx = cx
            .provider
            .key_exchange(group, &self.entropy.kx_seeds[self.retry.is_some() as usize])?;
        let shared = kx
            .agree(client_share.key_exchange)
            .map_err(|_| Error::IllegalParameter("key_share"))?;

        let sh_exts = encode_server_hello_extensions(
            KeyShareEntry {
                group: group.to_u16(),
                key_exchange: kx.public_key(),
            },
            psk.as_ref().map(|_| 0),
        );
        cx.send(&encode_server_hello(&self.entropy.random, ch.session_id, suite, &sh_exts));

        let hkdf = cx.hkdf(suite.hash())?;
        cx.session.schedule_mut()?.input_shared_secret(hkdf, &shared)?;
        cx.derive(Epoch::HandshakeTraffic)?;

        self.send_encrypted_extensions(cx, &negotiation, alpn)?;
        if psk.is_none() {
            self.send_certificate(cx, &exts, alpn)?;
        }

        let verify_data = cx.finished_verify_data(Role::Server)?;
        cx.send(&encode_finished(&verify_data));
        cx.derive_application_secrets()?;

        self.max_early_data = if config.enable_0rtt { QUIC_MAX_EARLY_DATA } else { 0 };
        debug!(
            "negotiated {} with {:?} (resumed: {})",
            suite.name(),
            group,
            cx.session.resumed
        );
        self.state = ServerState::WaitFinished;
        Ok(milestone)
    }

    /// First suite in server preference order that the client offers.
    fn select_suite<C: CryptoProvider + ?Sized>(
        &self,
        cx: &Context<'_, C>,
        ch: &ClientHello<'_>,
    ) -> Result<CipherSuite> {
        let suite = cx
            .config
            .cipher_suites
            .iter()
            .copied()
            .find(|s| ch.known_cipher_suites().any(|c| c == *s))
            .ok_or(Error::HandshakeFailure("no shared cipher suite"))?;
        match &self.retry {
            Some(retry) if retry.suite != suite => {
                Err(Error::IllegalParameter("cipher suite changed after retry"))
            }
            _ => Ok(suite),
        }
    }

    fn send_retry_request<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        client_hello: &[u8],
        suite: CipherSuite,
        group: NamedGroup,
        cookie: Option<Vec<u8>>,
    ) -> Result<()> {
        cx.session.transcript.update(client_hello);
        cx.start_transcript(suite)?;
        cx.session.transcript.rollup_for_retry(cx.provider.hasher(suite.hash())?)?;

        let exts = encode_retry_request_extensions(group.to_u16(), cookie.as_deref());
        cx.send(&encode_server_hello(&HRR_RANDOM, &[], suite, &exts));
        cx.session.suite = Some(suite);

        debug!("sent HelloRetryRequest for {:?}", group);
        self.retry = Some(Retry { suite, group, cookie });
        self.state = ServerState::WaitRetriedClientHello;
        Ok(())
    }

    /// Open and verify the first offered PSK. Tickets we cannot use, or
    /// that were issued under another suite or ALPN, are ignored; a bad
    /// binder on a usable one is fatal.
    fn check_psk<C: CryptoProvider + ?Sized>(
        &self,
        cx: &Context<'_, C>,
        client_hello: &[u8],
        exts: &ClientHelloExtensions<'_>,
        suite: CipherSuite,
        alpn: Option<&[u8]>,
    ) -> Result<Option<SessionState>> {
        let Some(offer) = &exts.pre_shared_key else {
            return Ok(None);
        };
        if !exts.psk_dhe_ke {
            debug!("PSK offered without psk_dhe_ke, ignoring");
            return Ok(None);
        }
        let (Some(identity), Some(binder)) = (offer.identities.first(), offer.binders.first()) else {
            return Ok(None);
        };

        let state = match self
            .ticket_key
            .open(cx.provider, identity.identity)
            .and_then(|plain| SessionState::decode(&plain))
        {
            Ok(state) => state,
            Err(e) => {
                debug!("ignoring unusable ticket: {}", e);
                return Ok(None);
            }
        };
        if state.cipher_suite != suite {
            debug!("ticket was issued for {}, ignoring", state.cipher_suite.name());
            return Ok(None);
        }
        if state.alpn.as_deref() != alpn {
            debug!("ticket was issued for another ALPN, ignoring");
            return Ok(None);
        }

        let truncated = &client_hello[..client_hello.len() - offer.binders_len];
        let hash = cx
            .session
            .transcript
            .hash_with(cx.provider, suite.hash(), truncated)?;
        let schedule = cx.new_schedule(suite, Some(&state.psk))?;
        let expected = schedule.binder(cx.hkdf(suite.hash())?, &hash)?;
        if !ct_eq(binder, &expected) {
            warn!("PSK binder mismatch");
            return Err(Error::DecryptError("PSK binder"));
        }

        debug!("resuming session");
        Ok(Some(state))
    }

    fn send_encrypted_extensions<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        negotiation: &Negotiation,
        alpn: Option<&[u8]>,
    ) -> Result<()> {
        let mut tp = Vec::new();
        if let Some(params) = &cx.config.transport_params {
            params.encode(&mut tp)?;
        }
        let data = encode_encrypted_extensions_data(
            alpn,
            cx.session.early_data == EarlyDataStatus::Accepted,
            cx.config.transport_params.as_ref().map(|_| tp.as_slice()),
            &negotiation.extensions,
        );
        cx.send(&encode_encrypted_extensions(&data));
        Ok(())
    }

    fn send_certificate<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        exts: &ClientHelloExtensions<'_>,
        alpn: Option<&[u8]>,
    ) -> Result<()> {
        if exts.signature_schemes.is_empty() {
            return Err(Error::MissingExtension("signature_algorithms"));
        }
        let offered: Vec<SignatureScheme> = cx
            .config
            .signature_schemes
            .iter()
            .copied()
            .filter(|s| exts.signature_schemes.contains(&s.to_u16()))
            .collect();
        let config = cx.config;
        let certificates = config
            .certificates
            .as_ref()
            .ok_or(Error::Config("certificate callbacks required"))?;

        let (handle, scheme) = certificates
            .select(TLS13, exts.server_name, alpn, &offered)
            .ok_or(Error::HandshakeFailure("no certificate for offered signature schemes"))?;
        if !offered.contains(&scheme) {
            return Err(Error::Certificate("selected scheme was not offered"));
        }
        let chain = certificates.format_chain(handle)?;
        cx.send(&encode_certificate(&chain)?);

        let tbs = certificate_verify_content(&cx.session.transcript.current_hash()?);
        let signature = certificates.sign(handle, scheme, &tbs)?;
        cx.send(&encode_certificate_verify(scheme.to_u16(), &signature));
        debug!("sent certificate chain ({} bytes) signed with {:?}", chain.len(), scheme);
        Ok(())
    }

    fn process_client_finished<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
        body: &[u8],
    ) -> Result<Milestone> {
        let hash_len = cx.session.schedule()?.suite().hash().output_len();
        let verify_data = parse_finished(body, hash_len)?;
        let expected = cx.finished_verify_data(Role::Client)?;
        if !ct_eq(verify_data, &expected) {
            return Err(Error::DecryptError("client Finished"));
        }
        cx.session.transcript.update(message);
        cx.derive_resumption_master()?;

        self.state = ServerState::Complete;
        self.ticket_due = true;
        info!(
            "server handshake complete ({}, resumed: {}, early data: {:?})",
            cx.session.suite.map_or("?", CipherSuite::name),
            cx.session.resumed,
            cx.session.early_data
        );
        Ok(Milestone::Complete)
    }
}

/// First server ALPN protocol the client also offers.
fn select_alpn<'a>(ours: &[Vec<u8>], exts: &ClientHelloExtensions<'a>) -> Result<Option<&'a [u8]>> {
    if ours.is_empty() {
        return Ok(None);
    }
    ours.iter()
        .find_map(|p| exts.alpn_protocols.iter().copied().find(|c| *c == p.as_slice()))
        .map(Some)
        .ok_or(Error::NoApplicationProtocol)
}

/// Group to ask for in a HelloRetryRequest: our first the client supports.
fn select_retry_group<C: CryptoProvider + ?Sized>(
    cx: &Context<'_, C>,
    exts: &ClientHelloExtensions<'_>,
) -> Result<NamedGroup> {
    cx.config
        .named_groups
        .iter()
        .copied()
        .find(|g| exts.supported_groups.contains(&g.to_u16()))
        .ok_or(Error::HandshakeFailure("no shared group"))
}
