//! What a call to `Connection::process` reports back.

use alloc::string::{String, ToString};

use crate::error::{crypto_error_code, Error};
use crate::tls::alert::AlertDescription;

/// Outcome of one `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeResult {
    /// More input is needed, or queued output must be drained first.
    WouldBlock,
    /// Client: early traffic secrets exist and 0-RTT data may be sent.
    EarlyData,
    /// The handshake finished; 1-RTT secrets are available.
    Complete,
    /// The handshake finished and the server accepted 0-RTT data.
    CompleteWithEarlyData,
    /// We detected a fatal problem and the transport should send `alert`.
    LocalError { alert: AlertDescription, message: String },
    /// The peer reported a fatal alert.
    AlertError { alert: AlertDescription, message: String },
}

impl HandshakeResult {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::LocalError { .. } | Self::AlertError { .. })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete | Self::CompleteWithEarlyData)
    }

    /// QUIC `CRYPTO_ERROR` code for error results.
    pub fn crypto_error_code(&self) -> Option<u64> {
        match self {
            Self::LocalError { alert, .. } | Self::AlertError { alert, .. } => {
                Some(crypto_error_code(*alert))
            }
            _ => None,
        }
    }
}

impl From<&Error> for HandshakeResult {
    fn from(err: &Error) -> Self {
        Self::LocalError {
            alert: err.alert(),
            message: err.to_string(),
        }
    }
}

/// Byte accounting plus outcome of one `process` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    /// Input bytes taken, including any partial tail now buffered.
    pub consumed: usize,
    /// Bytes written to the output buffer.
    pub written: usize,
    pub result: HandshakeResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_error_from_error() {
        let r = HandshakeResult::from(&Error::UnexpectedMessage("Finished"));
        assert_eq!(
            r,
            HandshakeResult::LocalError {
                alert: AlertDescription::UnexpectedMessage,
                message: "unexpected Finished message".into(),
            }
        );
        assert!(r.is_error());
        assert_eq!(r.crypto_error_code(), Some(0x010a));
    }

    #[test]
    fn classification() {
        assert!(HandshakeResult::CompleteWithEarlyData.is_complete());
        assert!(!HandshakeResult::EarlyData.is_complete());
        assert!(!HandshakeResult::WouldBlock.is_error());
        assert_eq!(HandshakeResult::Complete.crypto_error_code(), None);
    }
}
