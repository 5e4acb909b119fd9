//! Transport frames for stream connections.
//!
//! Each protocol message travels in exactly one frame (16 byte header + payload):
//!
//! ```text
//! +--------+---------+--------+-------------+--------+
//! | magic  | version | flags  | payload_len | crc32c |
//! | 4 bytes| 2 bytes |2 bytes |   4 bytes   | 4 bytes|
//! +--------+---------+--------+-------------+--------+
//! | payload (payload_len bytes)                      |
//! +--------------------------------------------------+
//! ```

use crate::error::ProtocolError;
use crate::MAX_PAYLOAD_SIZE;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Magic bytes identifying ridl frames: "RIDL"
pub const MAGIC: [u8; 4] = *b"RIDL";

/// Size of the fixed frame header in bytes (4+2+2+4+4 = 16).
pub const FRAME_HEADER_SIZE: usize = 16;

/// Frame flags bitfield.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFlags(u16);

impl FrameFlags {
    /// CRC32C checksum is present and valid.
    pub const CRC_PRESENT: u16 = 1 << 0;
    /// Payload is compressed (reserved).
    pub const COMPRESSED: u16 = 1 << 1;

    /// Valid flags mask for frame version 1.
    const VALID_V1_MASK: u16 = 0x0003;

    pub fn new() -> Self {
        Self(0)
    }

    pub fn with_crc(mut self) -> Self {
        self.0 |= Self::CRC_PRESENT;
        self
    }

    pub fn has_crc(&self) -> bool {
        self.0 & Self::CRC_PRESENT != 0
    }

    pub fn is_compressed(&self) -> bool {
        self.0 & Self::COMPRESSED != 0
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn from_bits(bits: u16) -> Result<Self, ProtocolError> {
        if bits & !Self::VALID_V1_MASK != 0 {
            return Err(ProtocolError::InvalidFlags(bits));
        }
        Ok(Self(bits))
    }
}

/// A parsed frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame format version.
    pub version: u16,
    pub flags: FrameFlags,
    /// One encoded protocol message.
    pub payload: Bytes,
}

impl Frame {
    /// Creates a new CRC-protected frame with the given payload.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            version: crate::PROTOCOL_VERSION,
            flags: FrameFlags::new().with_crc(),
            payload: payload.into(),
        }
    }

    /// Encodes the frame into bytes.
    pub fn encode(&self) -> Result<BytesMut, ProtocolError> {
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|_| ProtocolError::LengthOverflow(self.payload.len()))?;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.put_slice(&MAGIC);
        buf.put_u16(self.version);
        buf.put_u16(self.flags.bits());
        buf.put_u32(payload_len);

        let crc = if self.flags.has_crc() {
            crc32c::crc32c(&self.payload)
        } else {
            0
        };
        buf.put_u32(crc);
        buf.put_slice(&self.payload);

        Ok(buf)
    }

    /// Decodes a frame from bytes using the default payload cap.
    ///
    /// Returns `Ok(Some(frame))` if a complete frame was decoded,
    /// `Ok(None)` if more data is needed, or `Err` on protocol errors.
    pub fn decode(buf: &mut BytesMut) -> Result<Option<Self>, ProtocolError> {
        Self::decode_with_limit(buf, MAX_PAYLOAD_SIZE)
    }

    /// Like [`Frame::decode`], rejecting payloads larger than `max_payload`.
    pub fn decode_with_limit(
        buf: &mut BytesMut,
        max_payload: u32,
    ) -> Result<Option<Self>, ProtocolError> {
        if buf.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at header without consuming
        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != MAGIC {
            return Err(ProtocolError::InvalidMagic(magic));
        }

        let version = u16::from_be_bytes([buf[4], buf[5]]);
        if version != crate::PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedVersion(version));
        }

        let flags = FrameFlags::from_bits(u16::from_be_bytes([buf[6], buf[7]]))?;

        let payload_len = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        if payload_len > max_payload {
            return Err(ProtocolError::FrameTooLarge {
                size: payload_len,
                max: max_payload,
            });
        }

        let crc_expected = u32::from_be_bytes([buf[12], buf[13], buf[14], buf[15]]);

        let total_len = FRAME_HEADER_SIZE + payload_len as usize;
        if buf.len() < total_len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_SIZE);
        let payload = buf.split_to(payload_len as usize).freeze();

        if flags.has_crc() {
            let crc_actual = crc32c::crc32c(&payload);
            if crc_actual != crc_expected {
                return Err(ProtocolError::CrcMismatch {
                    expected: crc_expected,
                    actual: crc_actual,
                });
            }
        }

        Ok(Some(Self {
            version,
            flags,
            payload,
        }))
    }
}
