//! Codec error types.

use ridl_protocol::{ProtocolError, WireType};
use ridl_schema::SchemaError;
use thiserror::Error;

/// Errors raised while compiling, encoding or decoding struct values.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("required field '{field}' of {struct_name} is not set")]
    MissingRequiredField { struct_name: String, field: String },

    #[error("cannot serialize void ({context})")]
    VoidSerialization { context: String },

    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("container element type mismatch: expected {expected}, got {found}")]
    WireTypeMismatch { expected: WireType, found: WireType },

    #[error("unknown struct: {0}")]
    UnknownStruct(String),

    #[error("struct {struct_name} has no field named '{field}'")]
    UnknownField { struct_name: String, field: String },

    #[error("nesting depth limit exceeded ({0})")]
    DepthLimit(usize),
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl ToString, found: impl ToString) -> Self {
        CodecError::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Returns whether the error was caused by malformed or incomplete input
    /// rather than by the schema or the caller's value.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            CodecError::Protocol(_)
                | CodecError::MissingRequiredField { .. }
                | CodecError::WireTypeMismatch { .. }
                | CodecError::DepthLimit(_)
        )
    }
}
