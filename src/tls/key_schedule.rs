//! TLS 1.3 key schedule (RFC 8446 section 7.1).
//!
//! ```text
//!             0
//!             |
//!             v
//!   PSK ->  HKDF-Extract = Early Secret
//!             |
//!             +-> Derive-Secret(., "res binder", "")
//!             +-> Derive-Secret(., "c e traffic", CH)
//!             +-> Derive-Secret(., "e exp master", CH)
//!             v
//!   ECDHE -> HKDF-Extract = Handshake Secret
//!             |
//!             +-> Derive-Secret(., "c hs traffic", CH..SH)
//!             +-> Derive-Secret(., "s hs traffic", CH..SH)
//!             v
//!     0  ->  HKDF-Extract = Master Secret
//!             |
//!             +-> Derive-Secret(., "c ap traffic", CH..SF)
//!             +-> Derive-Secret(., "s ap traffic", CH..SF)
//!             +-> Derive-Secret(., "exp master", CH..SF)
//!             +-> Derive-Secret(., "res master", CH..CF)
//! ```
//!
//! Each [`Epoch`] is derived at most once; asking twice is an error, as is
//! asking for a secret whose inputs have not been seen yet.

use alloc::vec;
use alloc::vec::Vec;

use log::debug;

use crate::crypto::{expand_label, expand_label_secret, hmac, HashOutput, Hkdf};
use crate::error::{Error, Result};
use crate::tls::messages::CipherSuite;
use crate::tls::{Epoch, Role, Secret};

/// Per-connection key schedule for one cipher suite.
pub struct KeySchedule {
    suite: CipherSuite,
    /// Hash of the empty string under the suite's hash.
    empty_hash: HashOutput,
    with_psk: bool,
    early_secret: HashOutput,
    handshake_secret: Option<HashOutput>,
    master_secret: Option<HashOutput>,
    resumption_master: Option<HashOutput>,
    /// `[epoch][client, server]`; exporter epochs fill both slots.
    secrets: [[Option<HashOutput>; 2]; Epoch::COUNT],
}

fn zeros(len: usize) -> HashOutput {
    let mut z = HashOutput::new();
    // len never exceeds MAX_HASH_LEN for a supported suite.
    let _ = z.resize(len, 0);
    z
}

fn slot(role: Role) -> usize {
    match role {
        Role::Client => 0,
        Role::Server => 1,
    }
}

impl KeySchedule {
    /// Start the schedule: Early Secret = HKDF-Extract(0, PSK or 0).
    ///
    /// `empty_hash` is Hash("") for the suite's hash function.
    pub fn new(
        hkdf: &dyn Hkdf,
        suite: CipherSuite,
        empty_hash: HashOutput,
        psk: Option<&[u8]>,
    ) -> Self {
        let zero = zeros(hkdf.hash_len());
        let early_secret = hkdf.extract(&zero, psk.unwrap_or(&zero));
        Self {
            suite,
            empty_hash,
            with_psk: psk.is_some(),
            early_secret,
            handshake_secret: None,
            master_secret: None,
            resumption_master: None,
            secrets: Default::default(),
        }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    /// Whether the Early Secret was seeded with a PSK.
    pub fn has_psk(&self) -> bool {
        self.with_psk
    }

    /// The PSK binder over a truncated-ClientHello transcript hash
    /// (RFC 8446 section 4.2.11.2). Only resumption PSKs are supported.
    pub fn binder(&self, hkdf: &dyn Hkdf, truncated_hash: &[u8]) -> Result<HashOutput> {
        if !self.with_psk {
            return Err(Error::InvalidState);
        }
        let binder_key = expand_label_secret(hkdf, &self.early_secret, b"res binder", &self.empty_hash)?;
        let finished_key = expand_label_secret(hkdf, &binder_key, b"finished", &[])?;
        Ok(hmac(hkdf, &finished_key, truncated_hash))
    }

    /// Mix in the ECDHE shared secret, producing the Handshake and Master
    /// secrets.
    pub fn input_shared_secret(&mut self, hkdf: &dyn Hkdf, shared_secret: &[u8]) -> Result<()> {
        if self.handshake_secret.is_some() {
            return Err(Error::EpochAlreadyDerived(Epoch::HandshakeTraffic));
        }
        let salt = expand_label_secret(hkdf, &self.early_secret, b"derived", &self.empty_hash)?;
        let handshake_secret = hkdf.extract(&salt, shared_secret);

        let salt = expand_label_secret(hkdf, &handshake_secret, b"derived", &self.empty_hash)?;
        self.master_secret = Some(hkdf.extract(&salt, &zeros(hkdf.hash_len())));
        self.handshake_secret = Some(handshake_secret);
        Ok(())
    }

    /// Derive the secrets of `epoch` from the transcript hash at its
    /// defining point. Fails if already derived or if the inputs are missing.
    pub fn derive(&mut self, hkdf: &dyn Hkdf, epoch: Epoch, transcript_hash: &[u8]) -> Result<()> {
        if self.secrets[epoch as usize].iter().any(Option::is_some) {
            return Err(Error::EpochAlreadyDerived(epoch));
        }

        let pair = match epoch {
            Epoch::EarlyTraffic | Epoch::EarlyExporter => {
                if !self.with_psk {
                    return Err(Error::NotYetAvailable(epoch));
                }
                let label: &[u8] = if epoch == Epoch::EarlyTraffic {
                    b"c e traffic"
                } else {
                    b"e exp master"
                };
                let secret = expand_label_secret(hkdf, &self.early_secret, label, transcript_hash)?;
                if epoch == Epoch::EarlyTraffic {
                    [Some(secret), None]
                } else {
                    [Some(secret.clone()), Some(secret)]
                }
            }
            Epoch::HandshakeTraffic => {
                let base = self
                    .handshake_secret
                    .as_ref()
                    .ok_or(Error::NotYetAvailable(epoch))?;
                [
                    Some(expand_label_secret(hkdf, base, b"c hs traffic", transcript_hash)?),
                    Some(expand_label_secret(hkdf, base, b"s hs traffic", transcript_hash)?),
                ]
            }
            Epoch::ApplicationTraffic => {
                let base = self
                    .master_secret
                    .as_ref()
                    .ok_or(Error::NotYetAvailable(epoch))?;
                [
                    Some(expand_label_secret(hkdf, base, b"c ap traffic", transcript_hash)?),
                    Some(expand_label_secret(hkdf, base, b"s ap traffic", transcript_hash)?),
                ]
            }
            Epoch::Exporter => {
                let base = self
                    .master_secret
                    .as_ref()
                    .ok_or(Error::NotYetAvailable(epoch))?;
                let secret = expand_label_secret(hkdf, base, b"exp master", transcript_hash)?;
                [Some(secret.clone()), Some(secret)]
            }
        };

        debug!("derived {:?} secrets for {:?}", epoch, self.suite);
        self.secrets[epoch as usize] = pair;
        Ok(())
    }

    /// Whether `epoch` has been derived.
    pub fn is_derived(&self, epoch: Epoch) -> bool {
        self.secrets[epoch as usize].iter().any(Option::is_some)
    }

    /// A copy of the secret for `epoch` in the direction written by `role`.
    pub fn secret(&self, epoch: Epoch, role: Role) -> Result<Secret> {
        let bytes = self.secrets[epoch as usize][slot(role)]
            .clone()
            .ok_or(Error::NotYetAvailable(epoch))?;
        Ok(Secret {
            epoch,
            hash: self.suite.hash(),
            aead: self.suite.aead(),
            secret: bytes,
        })
    }

    /// Finished verify_data for the Finished sent by `sender`:
    /// HMAC(HKDF-Expand-Label(hs_traffic, "finished", "", L), transcript_hash).
    pub fn finished_verify_data(
        &self,
        hkdf: &dyn Hkdf,
        sender: Role,
        transcript_hash: &[u8],
    ) -> Result<HashOutput> {
        let base = self.secrets[Epoch::HandshakeTraffic as usize][slot(sender)]
            .as_ref()
            .ok_or(Error::NotYetAvailable(Epoch::HandshakeTraffic))?;
        let finished_key = expand_label_secret(hkdf, base, b"finished", &[])?;
        Ok(hmac(hkdf, &finished_key, transcript_hash))
    }

    /// resumption_master_secret = Derive-Secret(Master, "res master", CH..CF).
    pub fn derive_resumption_master(&mut self, hkdf: &dyn Hkdf, transcript_hash: &[u8]) -> Result<()> {
        if self.resumption_master.is_some() {
            return Err(Error::InvalidState);
        }
        let base = self
            .master_secret
            .as_ref()
            .ok_or(Error::NotYetAvailable(Epoch::ApplicationTraffic))?;
        self.resumption_master = Some(expand_label_secret(hkdf, base, b"res master", transcript_hash)?);
        Ok(())
    }

    /// The PSK for a ticket: HKDF-Expand-Label(res_master, "resumption", nonce, L).
    pub fn resumption_psk(&self, hkdf: &dyn Hkdf, ticket_nonce: &[u8]) -> Result<HashOutput> {
        let base = self.resumption_master.as_ref().ok_or(Error::InvalidState)?;
        expand_label_secret(hkdf, base, b"resumption", ticket_nonce)
    }

    /// The raw (early) exporter master secret.
    pub fn exporter_secret(&self, early: bool) -> Result<HashOutput> {
        let epoch = if early { Epoch::EarlyExporter } else { Epoch::Exporter };
        self.secrets[epoch as usize][0]
            .clone()
            .ok_or(Error::NotYetAvailable(epoch))
    }

    /// TLS-Exporter(label, "", len) (RFC 8446 section 7.5).
    pub fn export(&self, hkdf: &dyn Hkdf, early: bool, label: &[u8], len: usize) -> Result<Vec<u8>> {
        let exporter = self.exporter_secret(early)?;
        let derived = expand_label_secret(hkdf, &exporter, label, &self.empty_hash)?;
        let mut out = vec![0u8; len];
        expand_label(hkdf, &derived, b"exporter", &self.empty_hash, &mut out)?;
        Ok(out)
    }
}
