//! Struct decoding.
//!
//! Field headers are read until the stop marker. The field id selects the
//! field; the header's wire type must match the declared one. Unknown ids
//! and mismatched wire types are skipped without materializing the value.
//! After the stop marker every required field must have been seen.

use crate::error::CodecError;
use crate::registry::{CodecRegistry, TypePlan, MAX_DECODE_DEPTH};
use crate::value::{StructValue, Value};
use bytes::Bytes;
use ridl_protocol::{BinaryReader, ProtocolReader, WireType};

impl CodecRegistry {
    /// Reads a struct named `name`.
    pub fn read_struct<R>(&self, name: &str, reader: &mut R) -> Result<StructValue, CodecError>
    where
        R: ProtocolReader + ?Sized,
    {
        let index = self.index_of(name)?;
        self.read_struct_at(index, reader, MAX_DECODE_DEPTH)
    }

    /// Decodes a struct from a standalone binary protocol buffer.
    pub fn decode_struct(&self, name: &str, bytes: Bytes) -> Result<StructValue, CodecError> {
        let mut reader = BinaryReader::new(bytes);
        self.read_struct(name, &mut reader)
    }

    /// Reads one value according to `plan`.
    pub fn read_value<R>(&self, plan: &TypePlan, reader: &mut R) -> Result<Value, CodecError>
    where
        R: ProtocolReader + ?Sized,
    {
        self.read_value_at(plan, reader, MAX_DECODE_DEPTH)
    }

    fn read_struct_at<R>(
        &self,
        index: usize,
        reader: &mut R,
        depth: usize,
    ) -> Result<StructValue, CodecError>
    where
        R: ProtocolReader + ?Sized,
    {
        if depth == 0 {
            return Err(CodecError::DepthLimit(MAX_DECODE_DEPTH));
        }
        let codec = self.codec_at(index);
        let mut out = StructValue::new(codec.name.clone());

        reader.read_struct_begin()?;
        loop {
            let header = reader.read_field_begin()?;
            if header.is_stop() {
                break;
            }
            match codec.field(header.id) {
                Some(field) if field.wire_type == header.wire_type => {
                    let value = self.read_value_at(&field.plan, reader, depth - 1)?;
                    out.set(field.id, value);
                }
                Some(field) => {
                    tracing::trace!(
                        "{}: skipping field {} with wire type {} (expected {})",
                        codec.name,
                        header.id,
                        header.wire_type,
                        field.wire_type
                    );
                    reader.skip(header.wire_type)?;
                }
                None => {
                    tracing::trace!("{}: skipping unknown field {}", codec.name, header.id);
                    reader.skip(header.wire_type)?;
                }
            }
            reader.read_field_end()?;
        }
        reader.read_struct_end()?;

        if let Some(missing) = codec
            .fields
            .iter()
            .find(|f| f.requiredness == ridl_schema::Requiredness::Required && !out.is_set(f.id))
        {
            return Err(CodecError::MissingRequiredField {
                struct_name: codec.name.clone(),
                field: missing.name.clone(),
            });
        }

        Ok(out)
    }

    fn read_value_at<R>(
        &self,
        plan: &TypePlan,
        reader: &mut R,
        depth: usize,
    ) -> Result<Value, CodecError>
    where
        R: ProtocolReader + ?Sized,
    {
        if depth == 0 {
            return Err(CodecError::DepthLimit(MAX_DECODE_DEPTH));
        }
        let value = match plan {
            TypePlan::Bool => Value::Bool(reader.read_bool()?),
            TypePlan::Byte => Value::Byte(reader.read_byte()?),
            TypePlan::I16 => Value::I16(reader.read_i16()?),
            TypePlan::I32 => Value::I32(reader.read_i32()?),
            TypePlan::I64 => Value::I64(reader.read_i64()?),
            TypePlan::Double => Value::Double(reader.read_double()?),
            TypePlan::String => Value::String(reader.read_string()?),
            TypePlan::Struct(index) => Value::Struct(self.read_struct_at(*index, reader, depth)?),
            TypePlan::List(elem) => {
                let header = reader.read_list_begin()?;
                check_elem(elem, header.elem_type, header.size)?;
                let mut items = Vec::with_capacity(header.size);
                for _ in 0..header.size {
                    items.push(self.read_value_at(elem, reader, depth - 1)?);
                }
                reader.read_list_end()?;
                Value::List(items)
            }
            TypePlan::Set(elem) => {
                let header = reader.read_set_begin()?;
                check_elem(elem, header.elem_type, header.size)?;
                let mut items = Vec::with_capacity(header.size);
                for _ in 0..header.size {
                    items.push(self.read_value_at(elem, reader, depth - 1)?);
                }
                reader.read_set_end()?;
                Value::Set(items)
            }
            TypePlan::Map(key, val) => {
                let header = reader.read_map_begin()?;
                check_elem(key, header.key_type, header.size)?;
                check_elem(val, header.value_type, header.size)?;
                let mut entries = Vec::with_capacity(header.size);
                for _ in 0..header.size {
                    let k = self.read_value_at(key, reader, depth - 1)?;
                    let v = self.read_value_at(val, reader, depth - 1)?;
                    entries.push((k, v));
                }
                reader.read_map_end()?;
                Value::Map(entries)
            }
        };
        Ok(value)
    }
}

/// Element tags of empty containers carry no information and are not checked.
fn check_elem(plan: &TypePlan, found: WireType, size: usize) -> Result<(), CodecError> {
    let expected = plan.wire_type();
    if size > 0 && expected != found {
        return Err(CodecError::WireTypeMismatch { expected, found });
    }
    Ok(())
}
