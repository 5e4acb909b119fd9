//! RPC error types.

use ridl_codec::{CodecError, StructValue};
use ridl_protocol::{ApplicationException, ProtocolError};
use ridl_schema::SchemaError;
use thiserror::Error;

/// Errors raised while building or running a processor, or while preparing
/// a call.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("service {service} has no method '{method}'")]
    UnknownMethod { service: String, method: String },

    #[error("no handler registered for {service}.{method}")]
    MissingHandler { service: String, method: String },

    #[error("{service} does not extend {parent}")]
    NotAParent { service: String, parent: String },

    #[error("{method} is oneway and has no reply")]
    Oneway { method: String },

    #[error("{method} takes {expected} argument(s), got {found}")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },
}

/// Failure of one client call.
#[derive(Debug, Error)]
pub enum CallError {
    /// Out-of-band error reported by the server or detected while reading
    /// the reply.
    #[error("application exception: {0}")]
    Application(#[from] ApplicationException),

    /// One of the method's declared exceptions.
    #[error("{name}: {exception}")]
    Declared {
        /// Exception struct name.
        name: String,
        /// Name of the result field that carried it.
        field: String,
        exception: StructValue,
    },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("transport error: {0}")]
    Transport(String),
}

impl From<CodecError> for CallError {
    fn from(e: CodecError) -> Self {
        CallError::Rpc(RpcError::Codec(e))
    }
}

impl From<ProtocolError> for CallError {
    fn from(e: ProtocolError) -> Self {
        CallError::Rpc(RpcError::Protocol(e))
    }
}

impl CallError {
    /// Returns the declared exception, if this is one.
    pub fn declared(&self) -> Option<(&str, &StructValue)> {
        match self {
            CallError::Declared {
                name, exception, ..
            } => Some((name.as_str(), exception)),
            _ => None,
        }
    }

    /// Returns the application exception, if this is one.
    pub fn application(&self) -> Option<&ApplicationException> {
        match self {
            CallError::Application(e) => Some(e),
            _ => None,
        }
    }
}

/// Failure of a call made through a generated client. `E` is the method's
/// declared exception enum.
#[derive(Debug, Error)]
pub enum StubError<E> {
    #[error("declared exception: {0:?}")]
    Declared(E),

    #[error("application exception: {0}")]
    Application(#[from] ApplicationException),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Failure returned by a service handler.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// A declared exception. The struct name selects the result field.
    Declared(StructValue),
    /// Anything else. Reported to the caller as an internal error.
    Other(String),
}

impl ServiceError {
    pub fn other(message: impl Into<String>) -> Self {
        ServiceError::Other(message.into())
    }
}

impl From<StructValue> for ServiceError {
    fn from(exception: StructValue) -> Self {
        ServiceError::Declared(exception)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Declared(e) => write!(f, "{}", e),
            ServiceError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}
