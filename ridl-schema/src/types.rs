//! The type model and the type-expression syntax used in schema documents.
//!
//! ```text
//! type    := base | name | "list" "<" type ">" | "set" "<" type ">"
//!          | "map" "<" type "," type ">"
//! base    := "void" | "bool" | "byte" | "i8" | "i16" | "i32" | "i64"
//!          | "double" | "string" | "binary"
//! ```
//!
//! Named references are resolved against the schema when it is compiled, so
//! struct types refer to their definition by name. That keeps recursive
//! struct graphs representable without reference cycles.

use crate::error::SchemaError;
use std::fmt;

/// A resolved schema type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Enum(String),
    /// Transparent alias; resolve through [`crate::Schema::resolve`].
    Typedef(String),
    /// Struct or exception.
    Struct(String),
    List(Box<Type>),
    Set(Box<Type>),
    Map(Box<Type>, Box<Type>),
}

impl Type {
    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    pub fn set(elem: Type) -> Self {
        Type::Set(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map(Box::new(key), Box::new(value))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_base(&self) -> bool {
        matches!(
            self,
            Type::Void
                | Type::Bool
                | Type::Byte
                | Type::I16
                | Type::I32
                | Type::I64
                | Type::Double
                | Type::String
        )
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Type::List(_) | Type::Set(_) | Type::Map(_, _))
    }

    fn base_from_keyword(word: &str) -> Option<Type> {
        let ty = match word {
            "void" => Type::Void,
            "bool" => Type::Bool,
            "byte" | "i8" => Type::Byte,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" => Type::I64,
            "double" => Type::Double,
            "string" | "binary" => Type::String,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Bool => f.write_str("bool"),
            Type::Byte => f.write_str("byte"),
            Type::I16 => f.write_str("i16"),
            Type::I32 => f.write_str("i32"),
            Type::I64 => f.write_str("i64"),
            Type::Double => f.write_str("double"),
            Type::String => f.write_str("string"),
            Type::Enum(name) | Type::Typedef(name) | Type::Struct(name) => f.write_str(name),
            Type::List(elem) => write!(f, "list<{}>", elem),
            Type::Set(elem) => write!(f, "set<{}>", elem),
            Type::Map(key, value) => write!(f, "map<{},{}>", key, value),
        }
    }
}

/// A parsed but unresolved type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Base(Type),
    Named(String),
    List(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

impl TypeExpr {
    /// Parses a type expression such as `map<string,list<Point>>`.
    pub fn parse(s: &str) -> Result<Self, SchemaError> {
        let mut parser = Parser::new(s);
        let expr = parser.parse_type()?;
        parser.skip_whitespace();
        if parser.pos < parser.input.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(expr)
    }
}

/// Recursive descent parser for type expressions.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self, reason: &str) -> SchemaError {
        SchemaError::InvalidTypeExpr {
            expr: self.input.to_string(),
            reason: format!("{} at offset {}", reason, self.pos),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.input[self.pos..].chars().next() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), SchemaError> {
        self.skip_whitespace();
        if self.input[self.pos..].starts_with(ch) {
            self.pos += ch.len_utf8();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", ch)))
        }
    }

    fn parse_ident(&mut self) -> Result<&'a str, SchemaError> {
        self.skip_whitespace();
        let start = self.pos;
        for (i, c) in self.input[start..].char_indices() {
            let ok = if i == 0 {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_' || c == '.'
            };
            if !ok {
                break;
            }
            self.pos = start + i + c.len_utf8();
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_type(&mut self) -> Result<TypeExpr, SchemaError> {
        let ident = self.parse_ident()?;
        match ident {
            "list" | "set" => {
                self.expect('<')?;
                let elem = Box::new(self.parse_type()?);
                self.expect('>')?;
                Ok(if ident == "list" {
                    TypeExpr::List(elem)
                } else {
                    TypeExpr::Set(elem)
                })
            }
            "map" => {
                self.expect('<')?;
                let key = Box::new(self.parse_type()?);
                self.expect(',')?;
                let value = Box::new(self.parse_type()?);
                self.expect('>')?;
                Ok(TypeExpr::Map(key, value))
            }
            word => Ok(match Type::base_from_keyword(word) {
                Some(base) => TypeExpr::Base(base),
                None => TypeExpr::Named(word.to_string()),
            }),
        }
    }
}
