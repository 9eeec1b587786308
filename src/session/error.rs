// ABOUTME: Request-scoped errors a session surfaces to callers of send_sms
// ABOUTME: Connection lifecycle failures never appear here; they only make the session unready

use crate::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session is not bound. Retry later.
    #[error("provider '{provider}' is not bound")]
    NotReady { provider: String },

    /// The SMSC answered the submit with a non-zero command_status.
    #[error("provider '{provider}' rejected the submit with status {status:#010x}")]
    SubmitFailed { provider: String, status: u32 },

    #[error("message body is {length} octets, maximum is {max}")]
    MessageTooLong { length: usize, max: usize },

    /// An address that no SMSC could accept: too long or containing NUL.
    #[error("{field} '{value}' is not a valid SMPP address")]
    InvalidAddress { field: &'static str, value: String },

    /// The transport went away while the submit was in flight. The message
    /// may or may not have reached the SMSC.
    #[error("connection to provider '{provider}' was lost")]
    ConnectionLost { provider: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Stable machine-readable code, e.g. `SUBMIT_FAILED_69`.
    pub fn code(&self) -> String {
        match self {
            SessionError::NotReady { .. } => "NOT_READY".to_string(),
            SessionError::SubmitFailed { status, .. } => format!("SUBMIT_FAILED_{status}"),
            SessionError::MessageTooLong { .. } => "MESSAGE_TOO_LONG".to_string(),
            SessionError::InvalidAddress { .. } => "INVALID_ADDRESS".to_string(),
            SessionError::ConnectionLost { .. } => "CONNECTION_LOST".to_string(),
            SessionError::Transport(_) => "TRANSPORT_ERROR".to_string(),
        }
    }

    /// Whether the same request may succeed later without changes.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::NotReady { .. } | SessionError::ConnectionLost { .. } => true,
            // A PDU that fails to encode fails the same way next time.
            SessionError::Transport(TransportError::Codec(_)) => false,
            SessionError::Transport(_) => true,
            SessionError::SubmitFailed { .. }
            | SessionError::MessageTooLong { .. }
            | SessionError::InvalidAddress { .. } => false,
        }
    }
}
