//! Structural fingerprints.
//!
//! A struct's fingerprint is the SHA-256 digest of its canonical type
//! signature, rendered as lowercase hex:
//!
//! ```text
//! sig := "bool" | "byte" | "i16" | "i32" | "i64" | "double" | "string"
//!      | "list<" sig ">" | "set<" sig ">" | "map<" sig "," sig ">"
//!      | "{" id ":" sig ("," id ":" sig)* "}"      fields sorted by id
//!      | "@" Name                                  struct already being expanded
//! ```
//!
//! Enums sign as `i32` and typedefs as their target, so two structs with the
//! same wire shape share a fingerprint regardless of names.

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::types::Type;
use sha2::{Digest, Sha256};

/// Canonical signature of `ty`.
pub fn type_signature(schema: &Schema, ty: &Type) -> Result<String, SchemaError> {
    let mut out = String::new();
    let mut stack = Vec::new();
    write_signature(schema, ty, &mut stack, &mut out)?;
    Ok(out)
}

/// Fingerprint of the struct named `name`.
pub fn struct_fingerprint(schema: &Schema, name: &str) -> Result<String, SchemaError> {
    let signature = type_signature(schema, &Type::Struct(name.to_string()))?;
    Ok(hex::encode(Sha256::digest(signature.as_bytes())))
}

fn write_signature<'a>(
    schema: &'a Schema,
    ty: &'a Type,
    stack: &mut Vec<&'a str>,
    out: &mut String,
) -> Result<(), SchemaError> {
    match schema.resolve(ty)? {
        Type::Void => out.push_str("void"),
        Type::Bool => out.push_str("bool"),
        Type::Byte => out.push_str("byte"),
        Type::I16 => out.push_str("i16"),
        Type::I32 | Type::Enum(_) => out.push_str("i32"),
        Type::I64 => out.push_str("i64"),
        Type::Double => out.push_str("double"),
        Type::String => out.push_str("string"),
        Type::Typedef(name) => return Err(SchemaError::undefined(name, "fingerprint")),
        Type::List(elem) => {
            out.push_str("list<");
            write_signature(schema, elem, stack, out)?;
            out.push('>');
        }
        Type::Set(elem) => {
            out.push_str("set<");
            write_signature(schema, elem, stack, out)?;
            out.push('>');
        }
        Type::Map(key, value) => {
            out.push_str("map<");
            write_signature(schema, key, stack, out)?;
            out.push(',');
            write_signature(schema, value, stack, out)?;
            out.push('>');
        }
        Type::Struct(name) => {
            if stack.contains(&name.as_str()) {
                out.push('@');
                out.push_str(name);
                return Ok(());
            }
            let def = schema
                .get_struct(name)
                .ok_or_else(|| SchemaError::undefined(name, "fingerprint"))?;

            let mut fields: Vec<_> = def.fields.iter().collect();
            fields.sort_by_key(|f| f.id);

            stack.push(name);
            out.push('{');
            for (i, field) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&field.id.to_string());
                out.push(':');
                write_signature(schema, &field.ty, stack, out)?;
            }
            out.push('}');
            stack.pop();
        }
    }
    Ok(())
}
