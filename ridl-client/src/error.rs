//! Client error types.

use ridl_rpc::{CallError, RpcError};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ridl_protocol::ProtocolError),

    #[error("{0}")]
    Rpc(#[from] RpcError),

    /// The call reached the server and failed there, or its reply could
    /// not be resolved.
    #[error("call failed: {0}")]
    Call(#[from] CallError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed")]
    ConnectionClosed,

    #[error("request timeout")]
    Timeout,
}

impl ClientError {
    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Io(_) | ClientError::Timeout | ClientError::ConnectionClosed
        )
    }

    /// Returns the underlying call error, if the server answered.
    pub fn call_error(&self) -> Option<&CallError> {
        match self {
            ClientError::Call(e) => Some(e),
            _ => None,
        }
    }
}
