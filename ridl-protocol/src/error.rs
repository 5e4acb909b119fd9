//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur while framing, reading or writing
/// values on the wire.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid magic bytes: expected 'RIDL', got {0:?}")]
    InvalidMagic([u8; 4]),

    #[error("unsupported frame version: {0}")]
    UnsupportedVersion(u16),

    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: u32, max: u32 },

    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("invalid frame flags: {0:#x}")]
    InvalidFlags(u16),

    #[error("unexpected end of input: need {needed} more bytes")]
    UnexpectedEof { needed: usize },

    #[error("bad message version word: {0:#010x}")]
    BadVersion(u32),

    #[error("invalid wire type tag: {0}")]
    InvalidWireType(u8),

    #[error("invalid message type: {0}")]
    InvalidMessageType(u8),

    #[error("negative size: {0}")]
    NegativeSize(i32),

    #[error("size {size} exceeds remaining input ({remaining} bytes)")]
    SizeLimit { size: usize, remaining: usize },

    #[error("length {0} does not fit the wire format")]
    LengthOverflow(usize),

    #[error("nesting depth limit exceeded ({0})")]
    DepthLimitExceeded(usize),

    #[error("cannot skip a value of wire type {0}")]
    Unskippable(crate::types::WireType),

    #[error("required field '{field}' of {struct_name} is not set")]
    MissingRequiredField { struct_name: String, field: String },

    #[error("invalid UTF-8 in string")]
    InvalidUtf8,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
