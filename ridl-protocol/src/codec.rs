//! Encoder and decoder between protocol messages and frames.

use crate::binary::BinaryWriter;
use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::MAX_PAYLOAD_SIZE;
use bytes::{Bytes, BytesMut};

/// Wraps encoded messages into frames.
pub struct Encoder;

impl Encoder {
    /// Frames a raw message payload.
    pub fn encode_payload(payload: impl Into<Bytes>) -> Result<BytesMut, ProtocolError> {
        Frame::new(payload).encode()
    }

    /// Frames everything written to `writer`, leaving it empty for reuse.
    pub fn encode_message(writer: &mut BinaryWriter) -> Result<BytesMut, ProtocolError> {
        let payload = writer.take().freeze();
        Frame::new(payload).encode()
    }
}

/// Buffers partial reads and yields complete frames.
pub struct FrameDecoder {
    buffer: BytesMut,
    max_payload: u32,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_payload(MAX_PAYLOAD_SIZE)
    }

    /// Creates a decoder that rejects frames larger than `max_payload`.
    pub fn with_max_payload(max_payload: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            max_payload: max_payload.min(MAX_PAYLOAD_SIZE),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to decode the next frame from the buffer.
    pub fn decode_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        Frame::decode_with_limit(&mut self.buffer, self.max_payload)
    }

    /// Attempts to decode the next frame and returns its message payload.
    pub fn decode_message(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        Ok(self.decode_frame()?.map(|frame| frame.payload))
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
