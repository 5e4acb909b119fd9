//! Constant-expression values.
//!
//! Documents write constants as plain JSON/YAML values. Compiling the schema
//! checks each literal against its declared type and normalizes it: enum
//! names become ordinals, map keys written as strings are parsed into the
//! key type, and objects given for struct types become [`ConstValue::Struct`].

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// A constant literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum ConstValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    List(Vec<ConstValue>),
    /// Map literal; entries keep the order they were parsed in.
    Map(Vec<(ConstValue, ConstValue)>),
    /// Struct literal, field name to value.
    Struct(Vec<(String, ConstValue)>),
}

impl TryFrom<serde_json::Value> for ConstValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;
        match value {
            Value::Null => Err("null is not a valid constant".to_string()),
            Value::Bool(b) => Ok(ConstValue::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(ConstValue::Integer(i)),
                None => n
                    .as_f64()
                    .map(ConstValue::Double)
                    .ok_or_else(|| format!("unrepresentable number {}", n)),
            },
            Value::String(s) => Ok(ConstValue::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(ConstValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(ConstValue::List),
            Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| Ok((ConstValue::String(k), ConstValue::try_from(v)?)))
                .collect::<Result<Vec<_>, String>>()
                .map(ConstValue::Map),
        }
    }
}

impl From<ConstValue> for serde_json::Value {
    fn from(value: ConstValue) -> Self {
        use serde_json::Value;
        match value {
            ConstValue::Bool(b) => Value::Bool(b),
            ConstValue::Integer(i) => Value::from(i),
            ConstValue::Double(d) => Value::from(d),
            ConstValue::String(s) => Value::String(s),
            ConstValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            ConstValue::Map(entries) => Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.key_string(), Value::from(v)))
                    .collect(),
            ),
            ConstValue::Struct(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl ConstValue {
    fn key_string(&self) -> String {
        match self {
            ConstValue::String(s) => s.clone(),
            ConstValue::Integer(i) => i.to_string(),
            ConstValue::Double(d) => d.to_string(),
            ConstValue::Bool(b) => b.to_string(),
            other => serde_json::Value::from(other.clone()).to_string(),
        }
    }

    /// Checks `self` against `ty` and returns its normalized form.
    ///
    /// `name` is used for error reporting only.
    pub fn normalize(&self, schema: &Schema, ty: &Type, name: &str) -> Result<ConstValue, SchemaError> {
        let ty = schema.resolve(ty)?;
        let mismatch = || SchemaError::constant(name, format!("{:?} is not a valid {}", self, ty));

        match (ty, self) {
            (Type::Void, _) => Err(SchemaError::constant(name, "constants cannot be void")),
            (Type::Bool, ConstValue::Bool(b)) => Ok(ConstValue::Bool(*b)),
            (Type::Bool, ConstValue::Integer(i @ (0 | 1))) => Ok(ConstValue::Bool(*i == 1)),
            (Type::Byte, ConstValue::Integer(i)) => int_in_range(name, *i, i8::MIN as i64, i8::MAX as i64),
            (Type::I16, ConstValue::Integer(i)) => int_in_range(name, *i, i16::MIN as i64, i16::MAX as i64),
            (Type::I32, ConstValue::Integer(i)) => int_in_range(name, *i, i32::MIN as i64, i32::MAX as i64),
            (Type::I64, ConstValue::Integer(i)) => Ok(ConstValue::Integer(*i)),
            (Type::Byte | Type::I16 | Type::I32 | Type::I64, ConstValue::String(s)) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| mismatch())
                .and_then(|i| ConstValue::Integer(i).normalize(schema, ty, name)),
            (Type::Double, ConstValue::Double(d)) => Ok(ConstValue::Double(*d)),
            (Type::Double, ConstValue::Integer(i)) => Ok(ConstValue::Double(*i as f64)),
            (Type::String, ConstValue::String(s)) => Ok(ConstValue::String(s.clone())),
            (Type::Enum(_), ConstValue::Integer(i)) => {
                int_in_range(name, *i, i32::MIN as i64, i32::MAX as i64)
            }
            (Type::Enum(enum_name), ConstValue::String(s)) => {
                let def = schema
                    .get_enum(enum_name)
                    .ok_or_else(|| SchemaError::undefined(enum_name, name))?;
                let short = s
                    .strip_prefix(enum_name.as_str())
                    .and_then(|rest| rest.strip_prefix('.'))
                    .unwrap_or(s);
                def.value_of(short)
                    .map(|v| ConstValue::Integer(v as i64))
                    .ok_or_else(|| {
                        SchemaError::constant(name, format!("{} has no value named '{}'", enum_name, s))
                    })
            }
            (Type::List(elem) | Type::Set(elem), ConstValue::List(items)) => items
                .iter()
                .map(|item| item.normalize(schema, elem, name))
                .collect::<Result<Vec<_>, _>>()
                .map(ConstValue::List),
            (Type::Map(key_ty, value_ty), ConstValue::Map(entries)) => entries
                .iter()
                .map(|(k, v)| {
                    Ok((
                        k.normalize(schema, key_ty, name)?,
                        v.normalize(schema, value_ty, name)?,
                    ))
                })
                .collect::<Result<Vec<_>, SchemaError>>()
                .map(ConstValue::Map),
            (Type::Struct(_), ConstValue::Map(entries)) => {
                let fields = entries
                    .iter()
                    .map(|(k, v)| match k {
                        ConstValue::String(field) => Ok((field.clone(), v.clone())),
                        _ => Err(mismatch()),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                ConstValue::Struct(fields).normalize(schema, ty, name)
            }
            (Type::Struct(struct_name), ConstValue::Struct(fields)) => {
                let def = schema
                    .get_struct(struct_name)
                    .ok_or_else(|| SchemaError::undefined(struct_name, name))?;
                let mut normalized = Vec::with_capacity(fields.len());
                for (field_name, value) in fields {
                    let field = def.field_by_name(field_name).ok_or_else(|| {
                        SchemaError::UndefinedField {
                            owner: struct_name.clone(),
                            field: field_name.clone(),
                        }
                    })?;
                    normalized.push((field_name.clone(), value.normalize(schema, &field.ty, name)?));
                }
                Ok(ConstValue::Struct(normalized))
            }
            _ => Err(mismatch()),
        }
    }
}

fn int_in_range(name: &str, value: i64, min: i64, max: i64) -> Result<ConstValue, SchemaError> {
    if value < min || value > max {
        return Err(SchemaError::constant(
            name,
            format!("{} is out of range [{}, {}]", value, min, max),
        ));
    }
    Ok(ConstValue::Integer(value))
}
