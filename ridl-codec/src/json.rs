//! Conversion between values and JSON.
//!
//! Structs map to objects keyed by field name and enums to their value name
//! (numbers are accepted on input, and unknown ordinals are emitted as
//! numbers). Maps whose key type is a string, integer or enum become
//! objects; other maps become arrays of `[key, value]` pairs.

use crate::error::CodecError;
use crate::registry::CodecRegistry;
use crate::value::{StructValue, Value};
use ridl_schema::Type;
use serde_json::{Map, Value as Json};

impl CodecRegistry {
    pub fn to_json(&self, ty: &Type, value: &Value) -> Result<Json, CodecError> {
        let schema = self.schema();
        let resolved = schema.resolve(ty)?;
        let json = match (resolved, value) {
            (Type::Bool, Value::Bool(v)) => Json::Bool(*v),
            (Type::Byte, Value::Byte(v)) => Json::from(*v),
            (Type::I16, Value::I16(v)) => Json::from(*v),
            (Type::I32, Value::I32(v)) => Json::from(*v),
            (Type::I64, Value::I64(v)) => Json::from(*v),
            (Type::Double, Value::Double(v)) => Json::from(*v),
            (Type::String, Value::String(v)) => Json::String(v.clone()),
            (Type::Enum(name), Value::I32(v)) => {
                match schema.get_enum(name).and_then(|e| e.name_of(*v)) {
                    Some(label) => Json::String(label.to_string()),
                    None => Json::from(*v),
                }
            }
            (Type::Struct(name), Value::Struct(s)) => self.struct_to_json(name, s)?,
            (Type::List(elem), Value::List(items)) | (Type::Set(elem), Value::Set(items)) => {
                Json::Array(
                    items
                        .iter()
                        .map(|item| self.to_json(elem, item))
                        .collect::<Result<_, _>>()?,
                )
            }
            (Type::Map(key_ty, value_ty), Value::Map(entries)) => {
                if self.is_object_key(key_ty)? {
                    let mut object = Map::new();
                    for (k, v) in entries {
                        let key = match self.to_json(key_ty, k)? {
                            Json::String(s) => s,
                            other => other.to_string(),
                        };
                        object.insert(key, self.to_json(value_ty, v)?);
                    }
                    Json::Object(object)
                } else {
                    Json::Array(
                        entries
                            .iter()
                            .map(|(k, v)| {
                                Ok(Json::Array(vec![
                                    self.to_json(key_ty, k)?,
                                    self.to_json(value_ty, v)?,
                                ]))
                            })
                            .collect::<Result<_, CodecError>>()?,
                    )
                }
            }
            (ty, value) => return Err(CodecError::mismatch(ty, value.kind())),
        };
        Ok(json)
    }

    pub fn struct_to_json(&self, name: &str, value: &StructValue) -> Result<Json, CodecError> {
        let def = self
            .schema()
            .get_struct(name)
            .ok_or_else(|| CodecError::UnknownStruct(name.to_string()))?;
        let mut object = Map::new();
        for field in &def.fields {
            if let Some(v) = value.get(field.id) {
                object.insert(field.name.clone(), self.to_json(&field.ty, v)?);
            }
        }
        Ok(Json::Object(object))
    }

    pub fn from_json(&self, ty: &Type, json: &Json) -> Result<Value, CodecError> {
        let schema = self.schema();
        let resolved = schema.resolve(ty)?;
        let mismatch = || CodecError::mismatch(resolved, json_kind(json));

        let value = match (resolved, json) {
            (Type::Bool, Json::Bool(v)) => Value::Bool(*v),
            (Type::Byte, Json::Number(_)) => Value::Byte(int_from_json(json).ok_or_else(mismatch)?),
            (Type::I16, Json::Number(_)) => Value::I16(int_from_json(json).ok_or_else(mismatch)?),
            (Type::I32, Json::Number(_)) => Value::I32(int_from_json(json).ok_or_else(mismatch)?),
            (Type::I64, Json::Number(n)) => Value::I64(n.as_i64().ok_or_else(mismatch)?),
            (Type::Double, Json::Number(n)) => Value::Double(n.as_f64().ok_or_else(mismatch)?),
            (Type::String, Json::String(s)) => Value::String(s.clone()),
            (Type::Enum(_), Json::Number(_)) => Value::I32(int_from_json(json).ok_or_else(mismatch)?),
            (Type::Enum(name), Json::String(label)) => {
                let value = schema
                    .get_enum(name)
                    .and_then(|e| e.value_of(label))
                    .ok_or_else(mismatch)?;
                Value::I32(value)
            }
            (Type::Struct(name), Json::Object(_)) => Value::Struct(self.struct_from_json(name, json)?),
            (Type::List(elem), Json::Array(items)) => Value::List(
                items
                    .iter()
                    .map(|item| self.from_json(elem, item))
                    .collect::<Result<_, _>>()?,
            ),
            (Type::Set(elem), Json::Array(items)) => Value::Set(
                items
                    .iter()
                    .map(|item| self.from_json(elem, item))
                    .collect::<Result<_, _>>()?,
            ),
            (Type::Map(key_ty, value_ty), Json::Object(object)) => {
                let mut entries = Vec::with_capacity(object.len());
                for (k, v) in object {
                    entries.push((self.key_from_json(key_ty, k)?, self.from_json(value_ty, v)?));
                }
                Value::Map(entries)
            }
            (Type::Map(key_ty, value_ty), Json::Array(pairs)) => {
                let mut entries = Vec::with_capacity(pairs.len());
                for pair in pairs {
                    match pair.as_array().map(|p| p.as_slice()) {
                        Some([k, v]) => {
                            entries.push((self.from_json(key_ty, k)?, self.from_json(value_ty, v)?))
                        }
                        _ => return Err(CodecError::mismatch("[key, value] pair", json_kind(pair))),
                    }
                }
                Value::Map(entries)
            }
            _ => return Err(mismatch()),
        };
        Ok(value)
    }

    pub fn struct_from_json(&self, name: &str, json: &Json) -> Result<StructValue, CodecError> {
        let def = self
            .schema()
            .get_struct(name)
            .ok_or_else(|| CodecError::UnknownStruct(name.to_string()))?;
        let object = json
            .as_object()
            .ok_or_else(|| CodecError::mismatch(name, json_kind(json)))?;

        let mut out = StructValue::new(name);
        for (key, v) in object {
            let field = def.field_by_name(key).ok_or_else(|| CodecError::UnknownField {
                struct_name: name.to_string(),
                field: key.clone(),
            })?;
            // null means absent
            if v.is_null() {
                continue;
            }
            out.set(field.id, self.from_json(&field.ty, v)?);
        }
        Ok(out)
    }

    fn is_object_key(&self, key_ty: &Type) -> Result<bool, CodecError> {
        Ok(matches!(
            self.schema().resolve(key_ty)?,
            Type::String | Type::Byte | Type::I16 | Type::I32 | Type::I64 | Type::Enum(_)
        ))
    }

    fn key_from_json(&self, key_ty: &Type, key: &str) -> Result<Value, CodecError> {
        let json = match self.schema().resolve(key_ty)? {
            Type::String => Json::String(key.to_string()),
            Type::Enum(_) => match key.parse::<i64>() {
                Ok(n) => Json::from(n),
                Err(_) => Json::String(key.to_string()),
            },
            _ => key
                .parse::<serde_json::Number>()
                .map(Json::Number)
                .map_err(|_| CodecError::mismatch(key_ty, "string key"))?,
        };
        self.from_json(key_ty, &json)
    }
}

fn int_from_json<T: TryFrom<i64>>(json: &Json) -> Option<T> {
    json.as_i64().and_then(|i| T::try_from(i).ok())
}

fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
