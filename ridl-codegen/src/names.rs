//! Identifier rules and the mapping from schema types to Rust types.

use crate::error::CodegenError;
use heck::{ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use ridl_schema::{Schema, Type};
use std::collections::HashSet;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Keywords that cannot be written as raw identifiers.
const RESERVED: &[&str] = &["crate", "self", "Self", "super", "_"];

fn escape(ident: String) -> String {
    if RESERVED.contains(&ident.as_str()) {
        format!("{}_", ident)
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{}", ident)
    } else if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", ident)
    } else {
        ident
    }
}

/// Struct field, argument and method names.
pub fn field_ident(name: &str) -> String {
    escape(name.to_snake_case())
}

/// Type, trait and variant names.
pub fn type_ident(name: &str) -> String {
    escape(name.to_upper_camel_case())
}

/// Associated enum constants and `pub const` items.
pub fn const_ident(name: &str) -> String {
    escape(name.to_shouty_snake_case())
}

/// Local variable holding a field while a struct is read. The prefix keeps
/// it clear of keywords and of the protocol parameters.
pub fn local_ident(name: &str) -> String {
    format!("f_{}", name.to_snake_case())
}

/// Schema-aware type mapping.
pub struct RustTypes<'a> {
    schema: &'a Schema,
}

impl<'a> RustTypes<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn resolve<'t>(&self, ty: &'t Type) -> Result<&'t Type, CodegenError>
    where
        'a: 't,
    {
        Ok(self.schema.resolve(ty)?)
    }

    /// Rust spelling of `ty`. Typedefs keep their alias name.
    pub fn rust_type(&self, ty: &Type) -> Result<String, CodegenError> {
        Ok(match ty {
            Type::Void => "()".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Byte => "i8".to_string(),
            Type::I16 => "i16".to_string(),
            Type::I32 => "i32".to_string(),
            Type::I64 => "i64".to_string(),
            Type::Double => "f64".to_string(),
            Type::String => "String".to_string(),
            Type::Enum(name) | Type::Typedef(name) | Type::Struct(name) => type_ident(name),
            Type::List(elem) => format!("Vec<{}>", self.rust_type(elem)?),
            Type::Set(elem) => {
                if self.is_orderable(elem)? {
                    format!("BTreeSet<{}>", self.rust_type(elem)?)
                } else {
                    format!("Vec<{}>", self.rust_type(elem)?)
                }
            }
            Type::Map(key, value) => {
                if self.is_orderable(key)? {
                    format!("BTreeMap<{}, {}>", self.rust_type(key)?, self.rust_type(value)?)
                } else {
                    format!("Vec<({}, {})>", self.rust_type(key)?, self.rust_type(value)?)
                }
            }
        })
    }

    /// Whether the Rust type of `ty` implements `Ord`, which decides between
    /// `BTreeSet`/`BTreeMap` and a plain `Vec`.
    pub fn is_orderable(&self, ty: &Type) -> Result<bool, CodegenError> {
        Ok(match self.resolve(ty)? {
            Type::Bool | Type::Byte | Type::I16 | Type::I32 | Type::I64 | Type::String => true,
            Type::Enum(_) => true,
            Type::Void | Type::Double | Type::Struct(_) | Type::Typedef(_) => false,
            Type::List(elem) | Type::Set(elem) => self.is_orderable(elem)?,
            Type::Map(key, value) => self.is_orderable(key)? && self.is_orderable(value)?,
        })
    }

    /// `WireType::X` path of `ty`.
    pub fn wire_type(&self, ty: &Type) -> Result<String, CodegenError> {
        Ok(format!("WireType::{:?}", self.schema.wire_type(ty)?))
    }

    /// Whether a field of type `ty` inside `owner` must be boxed: true when
    /// `ty` is a struct that contains `owner` again without a container in
    /// between.
    pub fn needs_box(&self, owner: &str, ty: &Type) -> Result<bool, CodegenError> {
        let mut seen = HashSet::new();
        self.reaches(ty, owner, &mut seen)
    }

    fn reaches(
        &self,
        ty: &Type,
        target: &str,
        seen: &mut HashSet<String>,
    ) -> Result<bool, CodegenError> {
        let name = match self.resolve(ty)? {
            Type::Struct(name) => name,
            _ => return Ok(false),
        };
        if name == target {
            return Ok(true);
        }
        if !seen.insert(name.clone()) {
            return Ok(false);
        }
        let def = match self.schema.get_struct(name) {
            Some(def) => def,
            None => return Ok(false),
        };
        for field in &def.fields {
            if self.reaches(&field.ty, target, seen)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
