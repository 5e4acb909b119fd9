//! Server error types.

use crate::config::ConfigError;
use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ridl_protocol::ProtocolError),

    #[error("dispatch error: {0}")]
    Rpc(#[from] ridl_rpc::RpcError),

    #[error("schema error: {0}")]
    Schema(#[from] ridl_schema::SchemaError),

    #[error("codec error: {0}")]
    Codec(#[from] ridl_codec::CodecError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("no service configured: {0}")]
    NoService(String),

    #[error("handler task failed: {0}")]
    Handler(String),

    #[error("server shutting down")]
    ShuttingDown,
}

impl ServerError {
    /// Returns whether the error ended a connection rather than the server.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ServerError::Io(_)
                | ServerError::Protocol(_)
                | ServerError::Rpc(_)
                | ServerError::Handler(_)
                | ServerError::ShuttingDown
        )
    }
}
