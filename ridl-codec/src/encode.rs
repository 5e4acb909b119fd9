//! Struct encoding.
//!
//! Fields are written in declaration order. A present field is always
//! written. An absent field is handled by its requiredness:
//!
//! - required: written from its declared default, otherwise
//!   [`CodecError::MissingRequiredField`]
//! - default: written from its declared default, otherwise from the zero
//!   value of its type
//! - optional: omitted
//!
//! Every struct ends with a field stop marker. Ids present in the value but
//! unknown to the codec are not written.

use crate::error::CodecError;
use crate::registry::{CodecRegistry, FieldPlan, TypePlan};
use crate::value::{StructValue, Value};
use bytes::Bytes;
use ridl_protocol::{BinarySizer, BinaryWriter, ProtocolWriter};
use ridl_schema::Requiredness;

impl CodecRegistry {
    /// Writes `value` as the struct named `name`. Returns the number of
    /// bytes written.
    pub fn write_struct<W>(
        &self,
        name: &str,
        value: &StructValue,
        writer: &mut W,
    ) -> Result<usize, CodecError>
    where
        W: ProtocolWriter + ?Sized,
    {
        let index = self.index_of(name)?;
        self.write_struct_at(index, value, writer)
    }

    /// Encodes a struct into a standalone buffer with the binary protocol.
    pub fn encode_struct(&self, name: &str, value: &StructValue) -> Result<Bytes, CodecError> {
        let mut writer = BinaryWriter::new();
        self.write_struct(name, value, &mut writer)?;
        Ok(writer.into_bytes().freeze())
    }

    /// Size of the binary encoding of `value`. Runs every write-side check
    /// without producing bytes.
    pub fn encoded_size(&self, name: &str, value: &StructValue) -> Result<usize, CodecError> {
        let mut sizer = BinarySizer::new();
        self.write_struct(name, value, &mut sizer)?;
        Ok(sizer.total())
    }

    /// Writes one value according to `plan`.
    pub fn write_value<W>(
        &self,
        plan: &TypePlan,
        value: &Value,
        writer: &mut W,
    ) -> Result<usize, CodecError>
    where
        W: ProtocolWriter + ?Sized,
    {
        let n = match (plan, value) {
            (TypePlan::Bool, Value::Bool(v)) => writer.write_bool(*v)?,
            (TypePlan::Byte, Value::Byte(v)) => writer.write_byte(*v)?,
            (TypePlan::I16, Value::I16(v)) => writer.write_i16(*v)?,
            (TypePlan::I32, Value::I32(v)) => writer.write_i32(*v)?,
            (TypePlan::I64, Value::I64(v)) => writer.write_i64(*v)?,
            (TypePlan::Double, Value::Double(v)) => writer.write_double(*v)?,
            (TypePlan::String, Value::String(v)) => writer.write_string(v)?,
            (TypePlan::Struct(index), Value::Struct(s)) => self.write_struct_at(*index, s, writer)?,
            (TypePlan::List(elem), Value::List(items)) => {
                let mut n = writer.write_list_begin(elem.wire_type(), items.len())?;
                for item in items {
                    n += self.write_value(elem, item, writer)?;
                }
                n + writer.write_list_end()?
            }
            (TypePlan::Set(elem), Value::Set(items)) => {
                let mut n = writer.write_set_begin(elem.wire_type(), items.len())?;
                for item in items {
                    n += self.write_value(elem, item, writer)?;
                }
                n + writer.write_set_end()?
            }
            (TypePlan::Map(key, val), Value::Map(entries)) => {
                let mut n =
                    writer.write_map_begin(key.wire_type(), val.wire_type(), entries.len())?;
                for (k, v) in entries {
                    n += self.write_value(key, k, writer)?;
                    n += self.write_value(val, v, writer)?;
                }
                n + writer.write_map_end()?
            }
            (plan, value) => {
                return Err(CodecError::mismatch(
                    plan.wire_type().to_string().to_lowercase(),
                    value.kind(),
                ))
            }
        };
        Ok(n)
    }

    fn write_struct_at<W>(
        &self,
        index: usize,
        value: &StructValue,
        writer: &mut W,
    ) -> Result<usize, CodecError>
    where
        W: ProtocolWriter + ?Sized,
    {
        let codec = self.codec_at(index);
        let mut n = writer.write_struct_begin(&codec.name)?;
        for field in &codec.fields {
            let zero;
            let v = match value.get(field.id) {
                Some(v) => v,
                None => match (&field.default, field.requiredness) {
                    (_, Requiredness::Optional) => continue,
                    (Some(default), _) => default,
                    (None, Requiredness::Required) => {
                        return Err(CodecError::MissingRequiredField {
                            struct_name: codec.name.clone(),
                            field: field.name.clone(),
                        })
                    }
                    (None, Requiredness::Default) => {
                        zero = self.zero_for_plan(&field.plan)?;
                        &zero
                    }
                },
            };
            n += self.write_field(field, v, writer)?;
        }
        n += writer.write_field_stop()?;
        n += writer.write_struct_end()?;
        Ok(n)
    }

    fn write_field<W>(&self, field: &FieldPlan, value: &Value, writer: &mut W) -> Result<usize, CodecError>
    where
        W: ProtocolWriter + ?Sized,
    {
        let mut n = writer.write_field_begin(&field.name, field.wire_type, field.id)?;
        n += self.write_value(&field.plan, value, writer)?;
        n += writer.write_field_end()?;
        Ok(n)
    }
}
