//! Client side of the handshake.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, info, trace, warn};

use crate::config::NegotiationAction;
use crate::crypto::{CryptoProvider, KeyExchange, NamedGroup};
use crate::error::{Error, Result};
use crate::pki::{certificate_verify_content, SignatureScheme};
use crate::tls::extensions::{
    encode_client_hello_extensions, parse_encrypted_extensions_data, parse_server_hello_extensions,
    parse_ticket_extensions, ClientHelloParams, KeyShareEntry,
};
use crate::tls::handshake::{ct_eq, Context, EarlyDataStatus, Entropy, Milestone, Phase};
use crate::tls::messages::{
    self, encode_client_hello, encode_finished, parse_certificate, parse_certificate_verify,
    parse_encrypted_extensions, parse_finished, parse_new_session_ticket, parse_server_hello,
    HandshakeType, HEADER_LEN, TLS13,
};
use crate::tls::ticket::Ticket;
use crate::tls::{CipherSuite, Epoch, Role, TransportParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientState {
    /// ClientHello not yet written.
    Start,
    WaitServerHello,
    WaitEncryptedExtensions,
    WaitCertificate,
    WaitCertificateVerify,
    WaitFinished,
    /// Only NewSessionTicket may follow.
    Complete,
}

pub(crate) struct ClientHandshake {
    state: ClientState,
    entropy: Entropy,
    kx: Option<Box<dyn KeyExchange>>,
    /// Ticket from the configuration, if usable with it.
    offered_ticket: Option<Ticket>,
    /// A PSK was put in the last ClientHello.
    psk_offered: bool,
    /// Suite of a HelloRetryRequest, once one was seen.
    retry_suite: Option<CipherSuite>,
}

impl ClientHandshake {
    pub fn new(entropy: Entropy) -> Self {
        Self {
            state: ClientState::Start,
            entropy,
            kx: None,
            offered_ticket: None,
            psk_offered: false,
            retry_suite: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            ClientState::Start => Phase::Start,
            ClientState::WaitServerHello => Phase::SentHello,
            ClientState::WaitEncryptedExtensions => Phase::NegotiatedParams,
            ClientState::WaitCertificate | ClientState::WaitCertificateVerify => {
                Phase::AwaitingPeerAuth
            }
            ClientState::WaitFinished => Phase::AwaitingFinished,
            ClientState::Complete => Phase::Complete,
        }
    }

    /// Write the first ClientHello on the first call.
    pub fn poll<C: CryptoProvider + ?Sized>(&mut self, cx: &mut Context<'_, C>) -> Result<Option<Milestone>> {
        if self.state != ClientState::Start {
            return Ok(None);
        }
        let config = cx.config;

        self.offered_ticket = config.ticket.as_ref().and_then(|t| {
            let alpn_ok = match &t.alpn {
                Some(p) => config.alpn.contains(p),
                None => config.alpn.is_empty(),
            };
            if alpn_ok && config.cipher_suites.contains(&t.cipher_suite) {
                Some(t.clone())
            } else {
                warn!("configured ticket does not match this configuration, not offering it");
                None
            }
        });
        let early = config.enable_0rtt
            && self
                .offered_ticket
                .as_ref()
                .is_some_and(Ticket::allows_early_data);
        if early {
            cx.session.early_data = EarlyDataStatus::Offered;
        }

        let group = *config
            .named_groups
            .first()
            .ok_or(Error::Config("no named groups"))?;
        self.send_client_hello(cx, group, None)?;
        self.state = ClientState::WaitServerHello;

        if early {
            cx.derive(Epoch::EarlyTraffic)?;
            cx.derive(Epoch::EarlyExporter)?;
            info!("offering 0-RTT");
            return Ok(Some(Milestone::EarlyData));
        }
        Ok(None)
    }

    fn send_client_hello<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        group: NamedGroup,
        cookie: Option<&[u8]>,
    ) -> Result<()> {
        let config = cx.config;
        let retried = self.retry_suite.is_some();
        let kx = cx
            .provider
            .key_exchange(group, &self.entropy.kx_seeds[retried as usize])?;

        // After a retry only a PSK whose hash matches the retry suite is kept.
        let ticket = self
            .offered_ticket
            .as_ref()
            .filter(|t| self.retry_suite.map_or(true, |s| s.hash() == t.cipher_suite.hash()));

        let mut tp = Vec::new();
        if let Some(params) = &config.transport_params {
            params.encode(&mut tp)?;
        }

        let params = ClientHelloParams {
            server_name: config.server_name(),
            groups: &config.named_groups,
            key_share: KeyShareEntry {
                group: group.to_u16(),
                key_exchange: kx.public_key(),
            },
            signature_schemes: &config.signature_schemes,
            alpn: &config.alpn,
            transport_params: config.transport_params.as_ref().map(|_| tp.as_slice()),
            cookie,
            early_data: cx.session.early_data == EarlyDataStatus::Offered && !retried,
            custom: &config.custom_extensions,
            psk: ticket.map(|t| {
                (
                    t.identity.as_slice(),
                    t.obfuscated_age(0),
                    t.cipher_suite.hash().output_len(),
                )
            }),
        };
        let extensions = encode_client_hello_extensions(&params);
        let mut hello = encode_client_hello(&self.entropy.random, &config.cipher_suites, &extensions);

        match ticket {
            Some(t) => {
                // binders<33..2^16-1> holding one binder<32..255>
                let binder_len = t.cipher_suite.hash().output_len();
                let binders_len = 2 + 1 + binder_len;
                let truncated = hello.len() - binders_len;
                let hash = cx.session.transcript.hash_with(
                    cx.provider,
                    t.cipher_suite.hash(),
                    &hello[..truncated],
                )?;
                let schedule = cx.new_schedule(t.cipher_suite, Some(&t.psk))?;
                let binder = schedule.binder(cx.hkdf(t.cipher_suite.hash())?, &hash)?;
                let at = hello.len() - binder_len;
                hello[at..].copy_from_slice(&binder);
                cx.session.schedule = Some(schedule);
                self.psk_offered = true;
            }
            None => {
                cx.session.schedule = None;
                self.psk_offered = false;
            }
        }

        debug!(
            "sending ClientHello ({} bytes, group {:?}, psk {})",
            hello.len(),
            group,
            self.psk_offered
        );
        cx.send(&hello);
        self.kx = Some(kx);
        cx.session.group = Some(group);
        Ok(())
    }

    pub fn handle<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
    ) -> Result<Option<Milestone>> {
        let msg_type = HandshakeType::from_u8(message[0]).ok_or(Error::UnexpectedMessage("unknown"))?;
        let body = &message[HEADER_LEN..];
        trace!("client received {} ({} bytes)", msg_type.name(), body.len());

        match (self.state, msg_type) {
            (ClientState::WaitServerHello, HandshakeType::ServerHello) => {
                self.process_server_hello(cx, message, body)?;
            }
            (ClientState::WaitEncryptedExtensions, HandshakeType::EncryptedExtensions) => {
                self.process_encrypted_extensions(cx, body)?;
                cx.session.transcript.update(message);
            }
            (ClientState::WaitCertificate, HandshakeType::Certificate) => {
                self.process_certificate(cx, body)?;
                cx.session.transcript.update(message);
            }
            (ClientState::WaitCertificateVerify, HandshakeType::CertificateVerify) => {
                // Signed content covers the transcript up to Certificate.
                self.process_certificate_verify(cx, body)?;
                cx.session.transcript.update(message);
            }
            (ClientState::WaitFinished, HandshakeType::Finished) => {
                return self.process_server_finished(cx, message, body).map(Some);
            }
            (ClientState::Complete, HandshakeType::NewSessionTicket) => {
                self.process_new_session_ticket(cx, body)?;
            }
            (_, other) => return Err(Error::UnexpectedMessage(other.name())),
        }
        Ok(None)
    }

    fn process_server_hello<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
        body: &[u8],
    ) -> Result<()> {
        let sh = parse_server_hello(body)?;
        let is_retry = sh.is_retry_request();
        let exts = parse_server_hello_extensions(sh.extensions, is_retry)?;

        if exts.selected_version != Some(TLS13) {
            return Err(Error::ProtocolVersion);
        }
        if !sh.session_id.is_empty() {
            return Err(Error::IllegalParameter("legacy_session_id_echo"));
        }
        let suite = CipherSuite::from_u16(sh.cipher_suite)
            .filter(|s| cx.config.cipher_suites.contains(s))
            .ok_or(Error::IllegalParameter("cipher suite"))?;
        if self.retry_suite.is_some_and(|s| s != suite) {
            return Err(Error::IllegalParameter("cipher suite changed after retry"));
        }

        if is_retry {
            return self.process_retry_request(cx, suite, message, exts.selected_group, exts.cookie);
        }

        let kx = self.kx.take().ok_or(Error::InvalidState)?;
        let share = exts.key_share.ok_or(Error::MissingExtension("key_share"))?;
        if share.group != kx.group().to_u16() {
            return Err(Error::IllegalParameter("key_share group"));
        }
        let shared = kx
            .agree(share.key_exchange)
            .map_err(|_| Error::IllegalParameter("key_share"))?;

        match exts.selected_psk {
            Some(0) if self.psk_offered => {
                let ticket = self.offered_ticket.as_ref().ok_or(Error::InvalidState)?;
                if ticket.cipher_suite != suite {
                    return Err(Error::IllegalParameter("resumed cipher suite"));
                }
                cx.session.resumed = true;
                debug!("server accepted PSK");
            }
            Some(_) => return Err(Error::IllegalParameter("selected PSK")),
            None => {
                cx.session.schedule = Some(cx.new_schedule(suite, None)?);
                if cx.session.early_data == EarlyDataStatus::Offered {
                    cx.session.early_data = EarlyDataStatus::Rejected;
                }
            }
        }

        cx.session.suite = Some(suite);
        cx.start_transcript(suite)?;
        cx.session.transcript.update(message);

        let hkdf = cx.hkdf(suite.hash())?;
        cx.session.schedule_mut()?.input_shared_secret(hkdf, &shared)?;
        cx.derive(Epoch::HandshakeTraffic)?;

        debug!("negotiated {} with {:?}", suite.name(), kx.group());
        self.state = ClientState::WaitEncryptedExtensions;
        Ok(())
    }

    fn process_retry_request<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        suite: CipherSuite,
        message: &[u8],
        selected_group: Option<u16>,
        cookie: Option<&[u8]>,
    ) -> Result<()> {
        if self.retry_suite.is_some() {
            return Err(Error::UnexpectedMessage("second HelloRetryRequest"));
        }
        let group = selected_group
            .and_then(NamedGroup::from_u16)
            .filter(|g| cx.config.named_groups.contains(g))
            .ok_or(Error::IllegalParameter("HelloRetryRequest group"))?;
        if Some(group) == cx.session.group && cookie.is_none() {
            // A retry must change something.
            return Err(Error::IllegalParameter("HelloRetryRequest"));
        }

        cx.start_transcript(suite)?;
        cx.session.transcript.rollup_for_retry(cx.provider.hasher(suite.hash())?)?;
        cx.session.transcript.update(message);
        cx.session.suite = Some(suite);
        if cx.session.early_data == EarlyDataStatus::Offered {
            cx.session.early_data = EarlyDataStatus::Rejected;
        }
        self.retry_suite = Some(suite);

        debug!("HelloRetryRequest for {:?}", group);
        self.send_client_hello(cx, group, cookie)
    }

    fn process_encrypted_extensions<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        body: &[u8],
    ) -> Result<()> {
        let config = cx.config;
        let raw = parse_encrypted_extensions(body)?;
        let ee = parse_encrypted_extensions_data(raw)?;

        match ee.alpn {
            Some(p) if !config.alpn.iter().any(|a| a == p) => {
                return Err(Error::IllegalParameter("ALPN not offered"));
            }
            None if !config.alpn.is_empty() => return Err(Error::NoApplicationProtocol),
            _ => {}
        }
        // A ticket only resumes under the ALPN it was issued for.
        let ticket_alpn = self.offered_ticket.as_ref().and_then(|t| t.alpn.as_deref());
        if cx.session.resumed && ticket_alpn != ee.alpn {
            return Err(Error::IllegalParameter("ALPN changed on resumption"));
        }

        match (ee.early_data, cx.session.early_data) {
            (true, EarlyDataStatus::Offered) => {
                if !cx.session.resumed {
                    return Err(Error::IllegalParameter("early data without resumption"));
                }
                cx.session.early_data = EarlyDataStatus::Accepted;
                debug!("server accepted 0-RTT");
            }
            (true, _) => return Err(Error::UnsupportedExtension("EncryptedExtensions")),
            (false, EarlyDataStatus::Offered) => {
                cx.session.early_data = EarlyDataStatus::Rejected;
                debug!("server rejected 0-RTT");
            }
            (false, _) => {}
        }

        match ee.transport_params {
            Some(tp) => cx.session.peer_transport_params = Some(TransportParams::decode(tp)?),
            None if config.transport_params.is_some() => {
                return Err(Error::MissingExtension("quic_transport_parameters"));
            }
            None => {}
        }

        let negotiation = config.negotiate(TLS13, raw, None);
        if negotiation.action != NegotiationAction::Accept {
            return Err(Error::NegotiationAborted("EncryptedExtensions"));
        }

        cx.session.alpn = ee.alpn.map(<[u8]>::to_vec);
        cx.session.server_name = config.server_name.clone();
        self.state = if cx.session.resumed {
            ClientState::WaitFinished
        } else {
            ClientState::WaitCertificate
        };
        Ok(())
    }

    fn process_certificate<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        body: &[u8],
    ) -> Result<()> {
        let payload = parse_certificate(body)?;
        if !payload.context.is_empty() {
            return Err(Error::IllegalParameter("certificate_request_context"));
        }
        let chain = messages::certificate_chain(&payload)?;
        if chain.is_empty() {
            return Err(Error::Decode("empty Certificate"));
        }
        debug!("server sent {} bytes of certificates", chain.len());
        cx.session.peer_certificate = Some(chain);
        self.state = ClientState::WaitCertificateVerify;
        Ok(())
    }

    fn process_certificate_verify<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        body: &[u8],
    ) -> Result<()> {
        let cv = parse_certificate_verify(body)?;
        let scheme = SignatureScheme::from_u16(cv.algorithm)
            .filter(|s| cx.config.signature_schemes.contains(s))
            .ok_or(Error::IllegalParameter("CertificateVerify scheme"))?;
        let chain = cx.session.peer_certificate.as_deref().ok_or(Error::InvalidState)?;
        let certificates = cx
            .config
            .certificates
            .as_ref()
            .ok_or(Error::Config("certificate callbacks required"))?;

        let tbs = certificate_verify_content(&cx.session.transcript.current_hash()?);
        if !certificates.verify(chain, scheme, &tbs, cv.signature) {
            return Err(Error::Certificate("server certificate rejected"));
        }
        debug!("server CertificateVerify ({:?}) verified", scheme);
        self.state = ClientState::WaitFinished;
        Ok(())
    }

    fn process_server_finished<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        message: &[u8],
        body: &[u8],
    ) -> Result<Milestone> {
        let hash_len = cx.session.schedule()?.suite().hash().output_len();
        let verify_data = parse_finished(body, hash_len)?;
        let expected = cx.finished_verify_data(Role::Server)?;
        if !ct_eq(verify_data, &expected) {
            return Err(Error::DecryptError("server Finished"));
        }
        cx.session.transcript.update(message);

        // 1-RTT secrets hang off the transcript through server Finished.
        cx.derive_application_secrets()?;

        let ours = cx.finished_verify_data(Role::Client)?;
        cx.send(&encode_finished(&ours));
        cx.derive_resumption_master()?;

        self.state = ClientState::Complete;
        info!(
            "client handshake complete ({}, resumed: {}, early data: {:?})",
            cx.session.suite.map_or("?", CipherSuite::name),
            cx.session.resumed,
            cx.session.early_data
        );
        Ok(Milestone::Complete)
    }

    fn process_new_session_ticket<C: CryptoProvider + ?Sized>(
        &mut self,
        cx: &mut Context<'_, C>,
        body: &[u8],
    ) -> Result<()> {
        let nst = parse_new_session_ticket(body)?;
        let max_early_data = parse_ticket_extensions(nst.extensions)?;
        if nst.lifetime == 0 {
            debug!("ignoring ticket with zero lifetime");
            return Ok(());
        }

        let schedule = cx.session.schedule()?;
        let suite = schedule.suite();
        let psk = schedule.resumption_psk(cx.hkdf(suite.hash())?, nst.nonce)?;
        let ticket = Ticket {
            identity: nst.ticket.to_vec(),
            psk,
            cipher_suite: suite,
            alpn: cx.session.alpn.clone(),
            lifetime: nst.lifetime,
            age_add: nst.age_add,
            max_early_data,
            server_name: cx.config.server_name.clone(),
        };

        info!(
            "received session ticket (lifetime {}s, early data {})",
            ticket.lifetime,
            ticket.allows_early_data()
        );
        if let Some(sink) = &cx.config.ticket_sink {
            sink.on_ticket(cx.config.server_name(), &ticket);
        }
        cx.session.ticket = Some(ticket);
        Ok(())
    }
}
