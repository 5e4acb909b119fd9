//! # ridl-protocol
//!
//! Wire protocol implementation for ridl.
//!
//! This crate provides:
//! - Wire type tags and message types
//! - The `ProtocolReader` / `ProtocolWriter` traits consumed by struct codecs
//! - A strict binary protocol over in-memory buffers
//! - Length-prefixed, CRC32C-checked frames for stream transports
//! - `ApplicationException`, the out-of-band RPC error channel

pub mod application;
pub mod binary;
pub mod codec;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod types;

pub use bytes::Bytes;

pub use application::{ApplicationException, ApplicationExceptionKind};
pub use binary::{BinaryReader, BinarySizer, BinaryWriter};
pub use codec::{Encoder, FrameDecoder};
pub use error::ProtocolError;
pub use frame::{Frame, FrameFlags, FRAME_HEADER_SIZE, MAGIC};
pub use protocol::{skip_value, ProtocolReader, ProtocolWriter, MAX_SKIP_DEPTH};
pub use types::{FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, SetHeader, WireType};

/// Frame format version supported by this implementation.
pub const PROTOCOL_VERSION: u16 = 1;

/// Default port for ridl servers.
pub const DEFAULT_PORT: u16 = 9090;

/// Maximum frame payload size (16 MiB).
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;
