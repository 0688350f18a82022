use crate::tls::alert::AlertDescription;
use crate::tls::Epoch;

/// Top-level crate error.
///
/// Every variant maps onto the TLS alert a transport should report for it
/// (see [`Error::alert`]); QUIC carries that as `CRYPTO_ERROR` (0x0100 + alert).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A handshake message or extension failed to decode.
    #[error("malformed {0}")]
    Decode(&'static str),
    /// A message arrived that is not valid in the current handshake state.
    #[error("unexpected {0} message")]
    UnexpectedMessage(&'static str),
    /// A field was well-formed but carried a forbidden value.
    #[error("illegal parameter: {0}")]
    IllegalParameter(&'static str),
    /// A mandatory extension was not sent by the peer.
    #[error("missing {0} extension")]
    MissingExtension(&'static str),
    /// The peer sent an extension it was not allowed to send.
    #[error("unsupported {0} extension")]
    UnsupportedExtension(&'static str),
    /// The peer does not speak TLS 1.3.
    #[error("peer does not support TLS 1.3")]
    ProtocolVersion,
    /// No acceptable set of security parameters.
    #[error("handshake failure: {0}")]
    HandshakeFailure(&'static str),
    /// Client and server share no ALPN protocol.
    #[error("no application protocol in common")]
    NoApplicationProtocol,
    /// A Finished MAC or PSK binder did not verify.
    #[error("{0} verification failed")]
    DecryptError(&'static str),
    /// The certificate collaborator declined.
    #[error("certificate rejected: {0}")]
    Certificate(&'static str),
    /// The negotiation collaborator aborted the handshake.
    #[error("negotiation aborted: {0}")]
    NegotiationAborted(&'static str),
    /// Cryptographic operation failed.
    #[error("cryptographic error: {0}")]
    Crypto(&'static str),
    /// Caller-provided buffer too small.
    #[error("buffer too small, need {needed} bytes")]
    BufferTooSmall { needed: usize },
    /// The key schedule was asked to derive an epoch twice.
    #[error("{0:?} secrets already derived")]
    EpochAlreadyDerived(Epoch),
    /// The requested epoch has not been reached yet.
    #[error("{0:?} secrets not yet available")]
    NotYetAvailable(Epoch),
    /// No session ticket has been received.
    #[error("no session ticket available")]
    NoTicket,
    /// The configuration is incomplete or inconsistent.
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    /// Invalid state for the requested operation.
    #[error("invalid state")]
    InvalidState,
}

impl Error {
    /// The TLS alert a transport should report for this error.
    pub fn alert(&self) -> AlertDescription {
        match self {
            Error::Decode(_) => AlertDescription::DecodeError,
            Error::UnexpectedMessage(_) => AlertDescription::UnexpectedMessage,
            Error::IllegalParameter(_) => AlertDescription::IllegalParameter,
            Error::MissingExtension(_) => AlertDescription::MissingExtension,
            Error::UnsupportedExtension(_) => AlertDescription::UnsupportedExtension,
            Error::ProtocolVersion => AlertDescription::ProtocolVersion,
            Error::HandshakeFailure(_) | Error::NegotiationAborted(_) => {
                AlertDescription::HandshakeFailure
            }
            Error::NoApplicationProtocol => AlertDescription::NoApplicationProtocol,
            Error::DecryptError(_) => AlertDescription::DecryptError,
            Error::Certificate(_) => AlertDescription::BadCertificate,
            Error::Crypto(_)
            | Error::BufferTooSmall { .. }
            | Error::EpochAlreadyDerived(_)
            | Error::NotYetAvailable(_)
            | Error::NoTicket
            | Error::Config(_)
            | Error::InvalidState => AlertDescription::InternalError,
        }
    }
}

/// QUIC `CRYPTO_ERROR` transport error code for a TLS alert (RFC 9001 §4.8).
pub const fn crypto_error_code(alert: AlertDescription) -> u64 {
    0x0100 + alert as u64
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn alert_mapping() {
        assert_eq!(
            Error::UnexpectedMessage("Finished").alert(),
            AlertDescription::UnexpectedMessage
        );
        assert_eq!(Error::DecryptError("binder").alert(), AlertDescription::DecryptError);
        assert_eq!(
            Error::NegotiationAborted("rejected").alert(),
            AlertDescription::HandshakeFailure
        );
        assert_eq!(Error::InvalidState.alert(), AlertDescription::InternalError);
    }

    #[test]
    fn crypto_error_codes() {
        assert_eq!(crypto_error_code(AlertDescription::HandshakeFailure), 0x0128);
        assert_eq!(crypto_error_code(AlertDescription::NoApplicationProtocol), 0x0178);
    }

    #[test]
    fn messages_are_readable() {
        assert_eq!(
            Error::UnexpectedMessage("Finished").to_string(),
            "unexpected Finished message"
        );
        assert_eq!(
            Error::BufferTooSmall { needed: 12 }.to_string(),
            "buffer too small, need 12 bytes"
        );
    }
}
