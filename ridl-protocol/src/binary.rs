//! Strict binary protocol.
//!
//! ```text
//! message   := i32 (VERSION_1 | type) , string name , i32 seq_id , struct
//! struct    := field* u8 STOP
//! field     := u8 wire_type , i16 id , value
//! list/set  := u8 elem_type , i32 size , value*
//! map       := u8 key_type , u8 value_type , i32 size , (key value)*
//! string    := i32 len , utf-8 bytes
//! ```
//!
//! All integers are big-endian. Struct and field names are not transmitted.

use crate::error::ProtocolError;
use crate::protocol::{ProtocolReader, ProtocolWriter};
use crate::types::{
    FieldHeader, ListHeader, MapHeader, MessageHeader, MessageType, SetHeader, WireType,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Version word OR-ed with the message type in strict message headers.
pub const VERSION_1: u32 = 0x8001_0000;

/// Mask selecting the version part of the first message word.
pub const VERSION_MASK: u32 = 0xffff_0000;

fn wire_len(len: usize) -> Result<i32, ProtocolError> {
    i32::try_from(len).map_err(|_| ProtocolError::LengthOverflow(len))
}

/// Binary protocol writer appending to an in-memory buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Takes the written bytes, leaving the writer empty.
    pub fn take(&mut self) -> BytesMut {
        self.buf.split()
    }

    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }
}

impl ProtocolWriter for BinaryWriter {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<usize, ProtocolError> {
        let version = VERSION_1 | header.message_type as u32;
        let mut n = self.write_i32(version as i32)?;
        n += self.write_string(&header.name)?;
        n += self.write_i32(header.seq_id)?;
        Ok(n)
    }

    fn write_message_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_struct_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_field_begin(
        &mut self,
        _name: &str,
        wire_type: WireType,
        id: i16,
    ) -> Result<usize, ProtocolError> {
        self.buf.put_u8(wire_type.as_u8());
        self.buf.put_i16(id);
        Ok(3)
    }

    fn write_field_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_field_stop(&mut self) -> Result<usize, ProtocolError> {
        self.buf.put_u8(WireType::Stop.as_u8());
        Ok(1)
    }

    fn write_map_begin(
        &mut self,
        key_type: WireType,
        value_type: WireType,
        size: usize,
    ) -> Result<usize, ProtocolError> {
        let size = wire_len(size)?;
        self.buf.put_u8(key_type.as_u8());
        self.buf.put_u8(value_type.as_u8());
        self.buf.put_i32(size);
        Ok(6)
    }

    fn write_map_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_list_begin(
        &mut self,
        elem_type: WireType,
        size: usize,
    ) -> Result<usize, ProtocolError> {
        let size = wire_len(size)?;
        self.buf.put_u8(elem_type.as_u8());
        self.buf.put_i32(size);
        Ok(5)
    }

    fn write_list_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_set_begin(&mut self, elem_type: WireType, size: usize) -> Result<usize, ProtocolError> {
        self.write_list_begin(elem_type, size)
    }

    fn write_set_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_bool(&mut self, value: bool) -> Result<usize, ProtocolError> {
        self.buf.put_u8(u8::from(value));
        Ok(1)
    }

    fn write_byte(&mut self, value: i8) -> Result<usize, ProtocolError> {
        self.buf.put_i8(value);
        Ok(1)
    }

    fn write_i16(&mut self, value: i16) -> Result<usize, ProtocolError> {
        self.buf.put_i16(value);
        Ok(2)
    }

    fn write_i32(&mut self, value: i32) -> Result<usize, ProtocolError> {
        self.buf.put_i32(value);
        Ok(4)
    }

    fn write_i64(&mut self, value: i64) -> Result<usize, ProtocolError> {
        self.buf.put_i64(value);
        Ok(8)
    }

    fn write_double(&mut self, value: f64) -> Result<usize, ProtocolError> {
        self.buf.put_f64(value);
        Ok(8)
    }

    fn write_string(&mut self, value: &str) -> Result<usize, ProtocolError> {
        let len = wire_len(value.len())?;
        self.buf.put_i32(len);
        self.buf.put_slice(value.as_bytes());
        Ok(4 + value.len())
    }
}

/// Writer that produces no bytes and only counts what [`BinaryWriter`]
/// would emit. Encoding into it checks a value without touching a buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinarySizer {
    total: usize,
}

impl BinarySizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn add(&mut self, n: usize) -> Result<usize, ProtocolError> {
        self.total += n;
        Ok(n)
    }
}

impl ProtocolWriter for BinarySizer {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<usize, ProtocolError> {
        wire_len(header.name.len())?;
        self.add(12 + header.name.len())
    }

    fn write_message_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_struct_begin(&mut self, _name: &str) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_struct_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_field_begin(
        &mut self,
        _name: &str,
        _wire_type: WireType,
        _id: i16,
    ) -> Result<usize, ProtocolError> {
        self.add(3)
    }

    fn write_field_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_field_stop(&mut self) -> Result<usize, ProtocolError> {
        self.add(1)
    }

    fn write_map_begin(
        &mut self,
        _key_type: WireType,
        _value_type: WireType,
        size: usize,
    ) -> Result<usize, ProtocolError> {
        wire_len(size)?;
        self.add(6)
    }

    fn write_map_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_list_begin(
        &mut self,
        _elem_type: WireType,
        size: usize,
    ) -> Result<usize, ProtocolError> {
        wire_len(size)?;
        self.add(5)
    }

    fn write_list_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_set_begin(&mut self, elem_type: WireType, size: usize) -> Result<usize, ProtocolError> {
        self.write_list_begin(elem_type, size)
    }

    fn write_set_end(&mut self) -> Result<usize, ProtocolError> {
        Ok(0)
    }

    fn write_bool(&mut self, _value: bool) -> Result<usize, ProtocolError> {
        self.add(1)
    }

    fn write_byte(&mut self, _value: i8) -> Result<usize, ProtocolError> {
        self.add(1)
    }

    fn write_i16(&mut self, _value: i16) -> Result<usize, ProtocolError> {
        self.add(2)
    }

    fn write_i32(&mut self, _value: i32) -> Result<usize, ProtocolError> {
        self.add(4)
    }

    fn write_i64(&mut self, _value: i64) -> Result<usize, ProtocolError> {
        self.add(8)
    }

    fn write_double(&mut self, _value: f64) -> Result<usize, ProtocolError> {
        self.add(8)
    }

    fn write_string(&mut self, value: &str) -> Result<usize, ProtocolError> {
        wire_len(value.len())?;
        self.add(4 + value.len())
    }
}

/// Binary protocol reader over a complete message buffer.
#[derive(Debug, Clone)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, n: usize) -> Result<(), ProtocolError> {
        let remaining = self.buf.remaining();
        if remaining < n {
            return Err(ProtocolError::UnexpectedEof {
                needed: n - remaining,
            });
        }
        Ok(())
    }

    fn read_wire_type(&mut self) -> Result<WireType, ProtocolError> {
        self.ensure(1)?;
        WireType::try_from(self.buf.get_u8())
    }

    /// Reads a container size, rejecting sizes that cannot possibly fit in
    /// the remaining input.
    fn read_size(&mut self) -> Result<usize, ProtocolError> {
        let size = self.read_i32()?;
        if size < 0 {
            return Err(ProtocolError::NegativeSize(size));
        }
        let size = size as usize;
        let remaining = self.buf.remaining();
        if size > remaining {
            return Err(ProtocolError::SizeLimit { size, remaining });
        }
        Ok(size)
    }
}

impl ProtocolReader for BinaryReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError> {
        let word = self.read_i32()? as u32;
        if word & VERSION_MASK != VERSION_1 {
            return Err(ProtocolError::BadVersion(word));
        }
        let message_type = MessageType::try_from((word & 0xff) as u8)?;
        let name = self.read_string()?;
        let seq_id = self.read_i32()?;
        Ok(MessageHeader {
            name,
            message_type,
            seq_id,
        })
    }

    fn read_message_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_begin(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_struct_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError> {
        let wire_type = self.read_wire_type()?;
        if wire_type == WireType::Stop {
            return Ok(FieldHeader::stop());
        }
        let id = self.read_i16()?;
        Ok(FieldHeader::new(wire_type, id))
    }

    fn read_field_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError> {
        let key_type = self.read_wire_type()?;
        let value_type = self.read_wire_type()?;
        let size = self.read_size()?;
        Ok(MapHeader {
            key_type,
            value_type,
            size,
        })
    }

    fn read_map_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError> {
        let elem_type = self.read_wire_type()?;
        let size = self.read_size()?;
        Ok(ListHeader { elem_type, size })
    }

    fn read_list_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_set_begin(&mut self) -> Result<SetHeader, ProtocolError> {
        let elem_type = self.read_wire_type()?;
        let size = self.read_size()?;
        Ok(SetHeader { elem_type, size })
    }

    fn read_set_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn read_bool(&mut self) -> Result<bool, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8() != 0)
    }

    fn read_byte(&mut self) -> Result<i8, ProtocolError> {
        self.ensure(1)?;
        Ok(self.buf.get_i8())
    }

    fn read_i16(&mut self) -> Result<i16, ProtocolError> {
        self.ensure(2)?;
        Ok(self.buf.get_i16())
    }

    fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32())
    }

    fn read_i64(&mut self) -> Result<i64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_i64())
    }

    fn read_double(&mut self) -> Result<f64, ProtocolError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64())
    }

    fn read_string(&mut self) -> Result<String, ProtocolError> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(ProtocolError::NegativeSize(len));
        }
        let len = len as usize;
        self.ensure(len)?;
        let raw = self.buf.split_to(len);
        String::from_utf8(raw.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(w: BinaryWriter) -> BinaryReader {
        BinaryReader::new(w.into_bytes().freeze())
    }

    #[test]
    fn test_sizer_matches_writer() {
        let mut w = BinaryWriter::new();
        let mut sizer = BinarySizer::new();
        for out in [&mut w as &mut dyn ProtocolWriter, &mut sizer] {
            out.write_message_begin(&MessageHeader::new("ping", MessageType::Call, 1))
                .unwrap();
            out.write_field_begin("m", WireType::Map, 1).unwrap();
            out.write_map_begin(WireType::String, WireType::Double, 1).unwrap();
            out.write_string("pi").unwrap();
            out.write_double(2.5).unwrap();
            out.write_field_stop().unwrap();
        }
        assert_eq!(sizer.total(), w.len());
    }

    #[test]
    fn test_message_header_layout() {
        let mut w = BinaryWriter::new();
        let n = w
            .write_message_begin(&MessageHeader::new("dist", MessageType::Call, 7))
            .unwrap();
        assert_eq!(n, 4 + 4 + 4 + 4);
        assert_eq!(
            w.as_bytes(),
            &[0x80, 0x01, 0x00, 0x01, 0, 0, 0, 4, b'd', b'i', b's', b't', 0, 0, 0, 7]
        );

        let header = reader(w).read_message_begin().unwrap();
        assert_eq!(header.name, "dist");
        assert_eq!(header.message_type, MessageType::Call);
        assert_eq!(header.seq_id, 7);
    }

    #[test]
    fn test_message_without_version_word_is_rejected() {
        let mut w = BinaryWriter::new();
        // Old unversioned layout starts with the name length.
        w.write_string("dist").unwrap();
        w.write_byte(1).unwrap();
        w.write_i32(0).unwrap();
        assert!(matches!(
            reader(w).read_message_begin(),
            Err(ProtocolError::BadVersion(4))
        ));
    }

    #[test]
    fn test_primitives() {
        let mut w = BinaryWriter::new();
        w.write_bool(true).unwrap();
        w.write_byte(-5).unwrap();
        w.write_i16(-300).unwrap();
        w.write_i32(i32::MIN).unwrap();
        w.write_i64(i64::MAX).unwrap();
        w.write_double(-0.25).unwrap();
        w.write_string("héllo").unwrap();

        let mut r = reader(w);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_byte().unwrap(), -5);
        assert_eq!(r.read_i16().unwrap(), -300);
        assert_eq!(r.read_i32().unwrap(), i32::MIN);
        assert_eq!(r.read_i64().unwrap(), i64::MAX);
        assert_eq!(r.read_double().unwrap(), -0.25);
        assert_eq!(r.read_string().unwrap(), "héllo");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_field_headers_and_stop() {
        let mut w = BinaryWriter::new();
        assert_eq!(w.write_field_begin("x", WireType::I32, 3).unwrap(), 3);
        w.write_i32(9).unwrap();
        w.write_field_stop().unwrap();

        let mut r = reader(w);
        let field = r.read_field_begin().unwrap();
        assert_eq!(field, FieldHeader::new(WireType::I32, 3));
        assert_eq!(r.read_i32().unwrap(), 9);
        assert!(r.read_field_begin().unwrap().is_stop());
    }

    #[test]
    fn test_container_headers() {
        let mut w = BinaryWriter::new();
        w.write_map_begin(WireType::String, WireType::I64, 0).unwrap();
        w.write_set_begin(WireType::I16, 0).unwrap();
        w.write_list_begin(WireType::Struct, 0).unwrap();

        let mut r = reader(w);
        let map = r.read_map_begin().unwrap();
        assert_eq!(
            (map.key_type, map.value_type, map.size),
            (WireType::String, WireType::I64, 0)
        );
        let set = r.read_set_begin().unwrap();
        assert_eq!((set.elem_type, set.size), (WireType::I16, 0));
        let list = r.read_list_begin().unwrap();
        assert_eq!((list.elem_type, list.size), (WireType::Struct, 0));
    }

    #[test]
    fn test_negative_and_oversized_sizes() {
        let mut w = BinaryWriter::new();
        w.write_byte(WireType::I32 as i8).unwrap();
        w.write_i32(-1).unwrap();
        assert!(matches!(
            reader(w).read_list_begin(),
            Err(ProtocolError::NegativeSize(-1))
        ));

        let mut w = BinaryWriter::new();
        w.write_byte(WireType::I32 as i8).unwrap();
        w.write_i32(1_000_000).unwrap();
        assert!(matches!(
            reader(w).read_list_begin(),
            Err(ProtocolError::SizeLimit { size: 1_000_000, .. })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let mut w = BinaryWriter::new();
        w.write_i32(2).unwrap();
        w.write_byte(-1).unwrap();
        w.write_byte(-1).unwrap();
        assert!(matches!(
            reader(w).read_string(),
            Err(ProtocolError::InvalidUtf8)
        ));
    }

    #[test]
    fn test_unknown_wire_type_in_field_header() {
        let mut r = BinaryReader::new(Bytes::from_static(&[7, 0, 1]));
        assert!(matches!(
            r.read_field_begin(),
            Err(ProtocolError::InvalidWireType(7))
        ));
    }

    proptest::proptest! {
        #[test]
        fn test_skip_arbitrary_input_never_panics(data in proptest::collection::vec(proptest::num::u8::ANY, 0..256)) {
            let mut r = BinaryReader::new(Bytes::from(data));
            let _ = r.skip(WireType::Struct);
        }

        #[test]
        fn test_string_roundtrip(s in ".{0,64}") {
            let mut w = BinaryWriter::new();
            w.write_string(&s).unwrap();
            let mut r = reader(w);
            proptest::prop_assert_eq!(r.read_string().unwrap(), s);
        }
    }

    #[test]
    fn test_take_resets_writer() {
        let mut w = BinaryWriter::new();
        w.write_i32(1).unwrap();
        let first = w.take();
        assert_eq!(first.len(), 4);
        assert!(w.is_empty());
    }
}
