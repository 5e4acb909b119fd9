//! Materialization of schema constants into values.

use crate::error::CodecError;
use crate::registry::CodecRegistry;
use crate::value::{StructValue, Value};
use ridl_schema::{ConstValue, Type};

impl CodecRegistry {
    /// Converts a normalized constant of type `ty` into a [`Value`].
    pub fn materialize(&self, ty: &Type, value: &ConstValue) -> Result<Value, CodecError> {
        let schema = self.schema();
        let resolved = schema.resolve(ty)?;
        let mismatch = || CodecError::mismatch(resolved, format!("{:?}", value));

        let out = match (resolved, value) {
            (Type::Void, _) => {
                return Err(CodecError::VoidSerialization {
                    context: "constant".to_string(),
                })
            }
            (Type::Bool, ConstValue::Bool(b)) => Value::Bool(*b),
            (Type::Byte, ConstValue::Integer(i)) => {
                Value::Byte(i8::try_from(*i).map_err(|_| mismatch())?)
            }
            (Type::I16, ConstValue::Integer(i)) => {
                Value::I16(i16::try_from(*i).map_err(|_| mismatch())?)
            }
            (Type::I32 | Type::Enum(_), ConstValue::Integer(i)) => {
                Value::I32(i32::try_from(*i).map_err(|_| mismatch())?)
            }
            (Type::I64, ConstValue::Integer(i)) => Value::I64(*i),
            (Type::Double, ConstValue::Double(d)) => Value::Double(*d),
            (Type::Double, ConstValue::Integer(i)) => Value::Double(*i as f64),
            (Type::String, ConstValue::String(s)) => Value::String(s.clone()),
            (Type::List(elem), ConstValue::List(items)) => Value::List(
                items
                    .iter()
                    .map(|item| self.materialize(elem, item))
                    .collect::<Result<_, _>>()?,
            ),
            (Type::Set(elem), ConstValue::List(items)) => Value::Set(
                items
                    .iter()
                    .map(|item| self.materialize(elem, item))
                    .collect::<Result<_, _>>()?,
            ),
            (Type::Map(key_ty, value_ty), ConstValue::Map(entries)) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| Ok((self.materialize(key_ty, k)?, self.materialize(value_ty, v)?)))
                    .collect::<Result<_, CodecError>>()?,
            ),
            (Type::Struct(name), ConstValue::Struct(members)) => {
                let def = schema
                    .get_struct(name)
                    .ok_or_else(|| CodecError::UnknownStruct(name.clone()))?;
                let mut out = StructValue::new(name.clone());
                for (member, v) in members {
                    let field = def.field_by_name(member).ok_or_else(|| CodecError::UnknownField {
                        struct_name: name.clone(),
                        field: member.clone(),
                    })?;
                    out.set(field.id, self.materialize(&field.ty, v)?);
                }
                Value::Struct(out)
            }
            _ => return Err(mismatch()),
        };
        Ok(out)
    }

    /// Materializes the schema constant named `name`.
    pub fn constant(&self, name: &str) -> Option<Result<Value, CodecError>> {
        let def = self.schema().get_const(name)?;
        Some(self.materialize(&def.ty, &def.value))
    }
}
