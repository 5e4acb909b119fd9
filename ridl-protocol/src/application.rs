//! `ApplicationException`, the out-of-band error channel for RPC calls.
//!
//! It travels as the body of an EXCEPTION message and uses the same struct
//! framing as any other struct:
//!
//! ```text
//! struct ApplicationException {
//!   1: string message
//!   2: i32 kind
//! }
//! ```

use crate::error::ProtocolError;
use crate::protocol::{ProtocolReader, ProtocolWriter};
use crate::types::WireType;
use std::fmt;
use thiserror::Error;

/// Reason carried by an [`ApplicationException`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationExceptionKind {
    Unknown,
    UnknownMethod,
    InvalidMessageType,
    WrongMethodName,
    BadSequenceId,
    MissingResult,
    InternalError,
    ProtocolError,
}

impl ApplicationExceptionKind {
    pub fn as_i32(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::UnknownMethod => 1,
            Self::InvalidMessageType => 2,
            Self::WrongMethodName => 3,
            Self::BadSequenceId => 4,
            Self::MissingResult => 5,
            Self::InternalError => 6,
            Self::ProtocolError => 7,
        }
    }

    /// Maps a wire value to a kind. Unrecognized values become `Unknown`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::UnknownMethod,
            2 => Self::InvalidMessageType,
            3 => Self::WrongMethodName,
            4 => Self::BadSequenceId,
            5 => Self::MissingResult,
            6 => Self::InternalError,
            7 => Self::ProtocolError,
            _ => Self::Unknown,
        }
    }

    fn default_message(self) -> &'static str {
        match self {
            Self::Unknown => "unknown application exception",
            Self::UnknownMethod => "unknown method",
            Self::InvalidMessageType => "invalid message type",
            Self::WrongMethodName => "wrong method name",
            Self::BadSequenceId => "bad sequence id",
            Self::MissingResult => "missing result",
            Self::InternalError => "internal error",
            Self::ProtocolError => "protocol error",
        }
    }
}

impl fmt::Display for ApplicationExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "UNKNOWN",
            Self::UnknownMethod => "UNKNOWN_METHOD",
            Self::InvalidMessageType => "INVALID_MESSAGE_TYPE",
            Self::WrongMethodName => "WRONG_METHOD_NAME",
            Self::BadSequenceId => "BAD_SEQUENCE_ID",
            Self::MissingResult => "MISSING_RESULT",
            Self::InternalError => "INTERNAL_ERROR",
            Self::ProtocolError => "PROTOCOL_ERROR",
        };
        f.write_str(name)
    }
}

/// Protocol-level RPC failure reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ApplicationException {
    pub kind: ApplicationExceptionKind,
    pub message: String,
}

impl ApplicationException {
    pub const STRUCT_NAME: &'static str = "ApplicationException";

    pub fn new(kind: ApplicationExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates an exception with the stock message for `kind`.
    pub fn from_kind(kind: ApplicationExceptionKind) -> Self {
        Self::new(kind, kind.default_message())
    }

    pub fn unknown_method(name: &str) -> Self {
        Self::new(
            ApplicationExceptionKind::UnknownMethod,
            format!("Invalid method name: '{}'", name),
        )
    }

    pub fn write<W: ProtocolWriter + ?Sized>(&self, writer: &mut W) -> Result<usize, ProtocolError> {
        let mut n = writer.write_struct_begin(Self::STRUCT_NAME)?;
        n += writer.write_field_begin("message", WireType::String, 1)?;
        n += writer.write_string(&self.message)?;
        n += writer.write_field_end()?;
        n += writer.write_field_begin("type", WireType::I32, 2)?;
        n += writer.write_i32(self.kind.as_i32())?;
        n += writer.write_field_end()?;
        n += writer.write_field_stop()?;
        n += writer.write_struct_end()?;
        Ok(n)
    }

    /// Reads an exception body. Unknown or mistyped fields are skipped;
    /// missing fields keep their defaults.
    pub fn read<R: ProtocolReader + ?Sized>(reader: &mut R) -> Result<Self, ProtocolError> {
        let mut message = String::new();
        let mut kind = ApplicationExceptionKind::Unknown;

        reader.read_struct_begin()?;
        loop {
            let field = reader.read_field_begin()?;
            if field.is_stop() {
                break;
            }
            match (field.id, field.wire_type) {
                (1, WireType::String) => message = reader.read_string()?,
                (2, WireType::I32) => kind = ApplicationExceptionKind::from_i32(reader.read_i32()?),
                (_, wire_type) => reader.skip(wire_type)?,
            }
            reader.read_field_end()?;
        }
        reader.read_struct_end()?;

        Ok(Self { kind, message })
    }
}

impl From<ApplicationExceptionKind> for ApplicationException {
    fn from(kind: ApplicationExceptionKind) -> Self {
        Self::from_kind(kind)
    }
}
