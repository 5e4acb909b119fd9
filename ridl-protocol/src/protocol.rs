//! Abstract protocol reader/writer traits.
//!
//! Struct codecs only ever talk to these traits. A concrete protocol decides
//! how each primitive and framing marker is laid out in bytes; the binary
//! protocol in [`crate::binary`] is the one shipped with this crate.
//!
//! Every write reports the number of bytes it produced. Callers use the total
//! for accounting only.

use crate::error::ProtocolError;
use crate::types::{FieldHeader, ListHeader, MapHeader, MessageHeader, SetHeader, WireType};

/// Maximum nesting depth followed by [`skip_value`].
pub const MAX_SKIP_DEPTH: usize = 64;

/// Write side of a protocol.
pub trait ProtocolWriter {
    fn write_message_begin(&mut self, header: &MessageHeader) -> Result<usize, ProtocolError>;
    fn write_message_end(&mut self) -> Result<usize, ProtocolError>;

    fn write_struct_begin(&mut self, name: &str) -> Result<usize, ProtocolError>;
    fn write_struct_end(&mut self) -> Result<usize, ProtocolError>;

    fn write_field_begin(
        &mut self,
        name: &str,
        wire_type: WireType,
        id: i16,
    ) -> Result<usize, ProtocolError>;
    fn write_field_end(&mut self) -> Result<usize, ProtocolError>;
    fn write_field_stop(&mut self) -> Result<usize, ProtocolError>;

    fn write_map_begin(
        &mut self,
        key_type: WireType,
        value_type: WireType,
        size: usize,
    ) -> Result<usize, ProtocolError>;
    fn write_map_end(&mut self) -> Result<usize, ProtocolError>;

    fn write_list_begin(&mut self, elem_type: WireType, size: usize)
        -> Result<usize, ProtocolError>;
    fn write_list_end(&mut self) -> Result<usize, ProtocolError>;

    fn write_set_begin(&mut self, elem_type: WireType, size: usize) -> Result<usize, ProtocolError>;
    fn write_set_end(&mut self) -> Result<usize, ProtocolError>;

    fn write_bool(&mut self, value: bool) -> Result<usize, ProtocolError>;
    fn write_byte(&mut self, value: i8) -> Result<usize, ProtocolError>;
    fn write_i16(&mut self, value: i16) -> Result<usize, ProtocolError>;
    fn write_i32(&mut self, value: i32) -> Result<usize, ProtocolError>;
    fn write_i64(&mut self, value: i64) -> Result<usize, ProtocolError>;
    fn write_double(&mut self, value: f64) -> Result<usize, ProtocolError>;
    fn write_string(&mut self, value: &str) -> Result<usize, ProtocolError>;

    /// Hands everything written so far to the underlying transport.
    fn flush(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }
}

/// Read side of a protocol.
pub trait ProtocolReader {
    fn read_message_begin(&mut self) -> Result<MessageHeader, ProtocolError>;
    fn read_message_end(&mut self) -> Result<(), ProtocolError>;

    fn read_struct_begin(&mut self) -> Result<(), ProtocolError>;
    fn read_struct_end(&mut self) -> Result<(), ProtocolError>;

    /// Reads the next field header, or a header whose wire type is
    /// [`WireType::Stop`] at the end of the struct.
    fn read_field_begin(&mut self) -> Result<FieldHeader, ProtocolError>;
    fn read_field_end(&mut self) -> Result<(), ProtocolError>;

    fn read_map_begin(&mut self) -> Result<MapHeader, ProtocolError>;
    fn read_map_end(&mut self) -> Result<(), ProtocolError>;

    fn read_list_begin(&mut self) -> Result<ListHeader, ProtocolError>;
    fn read_list_end(&mut self) -> Result<(), ProtocolError>;

    fn read_set_begin(&mut self) -> Result<SetHeader, ProtocolError>;
    fn read_set_end(&mut self) -> Result<(), ProtocolError>;

    fn read_bool(&mut self) -> Result<bool, ProtocolError>;
    fn read_byte(&mut self) -> Result<i8, ProtocolError>;
    fn read_i16(&mut self) -> Result<i16, ProtocolError>;
    fn read_i32(&mut self) -> Result<i32, ProtocolError>;
    fn read_i64(&mut self) -> Result<i64, ProtocolError>;
    fn read_double(&mut self) -> Result<f64, ProtocolError>;
    fn read_string(&mut self) -> Result<String, ProtocolError>;

    /// Notifies the transport that the current message has been consumed.
    fn read_end(&mut self) -> Result<(), ProtocolError> {
        Ok(())
    }

    /// Consumes and discards one value of the given wire type, including
    /// nested struct and container contents.
    fn skip(&mut self, wire_type: WireType) -> Result<(), ProtocolError> {
        skip_value(self, wire_type, MAX_SKIP_DEPTH)
    }
}

/// Discards one value of `wire_type`, descending at most `depth` levels.
pub fn skip_value<R>(reader: &mut R, wire_type: WireType, depth: usize) -> Result<(), ProtocolError>
where
    R: ProtocolReader + ?Sized,
{
    if depth == 0 {
        return Err(ProtocolError::DepthLimitExceeded(MAX_SKIP_DEPTH));
    }

    match wire_type {
        WireType::Bool => {
            reader.read_bool()?;
        }
        WireType::Byte => {
            reader.read_byte()?;
        }
        WireType::I16 => {
            reader.read_i16()?;
        }
        WireType::I32 => {
            reader.read_i32()?;
        }
        WireType::I64 => {
            reader.read_i64()?;
        }
        WireType::Double => {
            reader.read_double()?;
        }
        WireType::String => {
            reader.read_string()?;
        }
        WireType::Struct => {
            reader.read_struct_begin()?;
            loop {
                let field = reader.read_field_begin()?;
                if field.is_stop() {
                    break;
                }
                skip_value(reader, field.wire_type, depth - 1)?;
                reader.read_field_end()?;
            }
            reader.read_struct_end()?;
        }
        WireType::Map => {
            let header = reader.read_map_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.key_type, depth - 1)?;
                skip_value(reader, header.value_type, depth - 1)?;
            }
            reader.read_map_end()?;
        }
        WireType::Set => {
            let header = reader.read_set_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.elem_type, depth - 1)?;
            }
            reader.read_set_end()?;
        }
        WireType::List => {
            let header = reader.read_list_begin()?;
            for _ in 0..header.size {
                skip_value(reader, header.elem_type, depth - 1)?;
            }
            reader.read_list_end()?;
        }
        WireType::Stop | WireType::Void => return Err(ProtocolError::Unskippable(wire_type)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{BinaryReader, BinaryWriter};

    #[test]
    fn test_skip_nested_struct_leaves_reader_after_value() {
        let mut w = BinaryWriter::new();
        // struct { 1: list<map<i32,string>>, 2: struct { 1: bool } }
        w.write_struct_begin("outer").unwrap();
        w.write_field_begin("a", WireType::List, 1).unwrap();
        w.write_list_begin(WireType::Map, 1).unwrap();
        w.write_map_begin(WireType::I32, WireType::String, 2).unwrap();
        w.write_i32(1).unwrap();
        w.write_string("one").unwrap();
        w.write_i32(2).unwrap();
        w.write_string("two").unwrap();
        w.write_map_end().unwrap();
        w.write_list_end().unwrap();
        w.write_field_end().unwrap();
        w.write_field_begin("b", WireType::Struct, 2).unwrap();
        w.write_struct_begin("inner").unwrap();
        w.write_field_begin("flag", WireType::Bool, 1).unwrap();
        w.write_bool(true).unwrap();
        w.write_field_end().unwrap();
        w.write_field_stop().unwrap();
        w.write_struct_end().unwrap();
        w.write_field_end().unwrap();
        w.write_field_stop().unwrap();
        w.write_struct_end().unwrap();
        // trailing marker that must still be readable after the skip
        w.write_i64(0x5EED).unwrap();

        let mut r = BinaryReader::new(w.into_bytes().freeze());
        r.skip(WireType::Struct).unwrap();
        assert_eq!(r.read_i64().unwrap(), 0x5EED);
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_skip_refuses_stop_and_void() {
        let mut r = BinaryReader::new(bytes::Bytes::from_static(&[0, 0, 0, 0]));
        assert!(matches!(
            r.skip(WireType::Stop),
            Err(ProtocolError::Unskippable(WireType::Stop))
        ));
        assert!(matches!(
            r.skip(WireType::Void),
            Err(ProtocolError::Unskippable(WireType::Void))
        ));
    }

    #[test]
    fn test_skip_depth_limit() {
        // MAX_SKIP_DEPTH + 1 nested lists of lists, innermost empty.
        let mut w = BinaryWriter::new();
        for _ in 0..=MAX_SKIP_DEPTH {
            w.write_list_begin(WireType::List, 1).unwrap();
        }
        w.write_list_begin(WireType::I32, 0).unwrap();

        let mut r = BinaryReader::new(w.into_bytes().freeze());
        assert!(matches!(
            r.skip(WireType::List),
            Err(ProtocolError::DepthLimitExceeded(_))
        ));
    }

    #[test]
    fn test_skip_truncated_input() {
        let mut w = BinaryWriter::new();
        w.write_string("hello").unwrap();
        let bytes = w.into_bytes().freeze();

        let mut r = BinaryReader::new(bytes.slice(..6));
        assert!(matches!(
            r.skip(WireType::String),
            Err(ProtocolError::UnexpectedEof { .. })
        ));
    }
}
