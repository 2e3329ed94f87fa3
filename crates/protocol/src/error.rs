//! Protocol error types

use crate::transport::TransportError;
use thiserror::Error;

/// Errors returned by the vendor protocol drivers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Control transfer failed; passed through verbatim
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Device answered with a non-success result code
    ///
    /// `payload` holds whatever the response carried, so callers can inspect
    /// a partial answer.
    #[error("Device command response {code:#04x}: {description}")]
    Response {
        code: u8,
        description: &'static str,
        payload: Vec<u8>,
    },

    /// Device returned nothing but padding
    #[error("No response from device")]
    NoResponse,

    /// Response could not be parsed
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// No candidate buffer size produced a successful exchange
    #[error("Buffer size negotiation failed (tried {candidates:?})")]
    Negotiation { candidates: Vec<usize> },

    /// Request rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Coarse classification of a [`ProtocolError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Protocol,
    Negotiation,
    LocalValidation,
}

impl ProtocolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProtocolError::Transport(_) => ErrorKind::Transport,
            ProtocolError::Response { .. }
            | ProtocolError::NoResponse
            | ProtocolError::Malformed(_) => ErrorKind::Protocol,
            ProtocolError::Negotiation { .. } => ErrorKind::Negotiation,
            ProtocolError::Validation(_) => ErrorKind::LocalValidation,
        }
    }

    /// Raw result code, if the device supplied one
    pub fn response_code(&self) -> Option<u8> {
        match self {
            ProtocolError::Response { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
