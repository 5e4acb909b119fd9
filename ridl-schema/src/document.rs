//! Schema documents.
//!
//! A document is the pre-parsed form of an IDL file, written as JSON or YAML:
//!
//! ```yaml
//! namespace: geo
//! enums:
//!   - name: Unit
//!     values: [METERS, FEET, {name: MILES, value: 10}]
//! structs:
//!   - name: Point
//!     fields:
//!       - {id: 1, name: x, type: i32, requiredness: required}
//!       - {id: 2, name: y, type: i32, requiredness: required}
//! exceptions:
//!   - name: OutOfRange
//!     fields:
//!       - {id: 1, name: reason, type: string}
//! services:
//!   - name: Geo
//!     functions:
//!       - name: dist
//!         returns: i32
//!         args:
//!           - {id: 1, name: a, type: Point}
//!           - {id: 2, name: b, type: Point}
//!         throws:
//!           - {id: 1, name: range, type: OutOfRange}
//! ```

use crate::constant::ConstValue;
use crate::definition::Requiredness;
use crate::error::SchemaError;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw schema document as loaded from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub enums: Vec<EnumDoc>,
    #[serde(default)]
    pub typedefs: Vec<TypedefDoc>,
    #[serde(default)]
    pub structs: Vec<StructDoc>,
    #[serde(default)]
    pub exceptions: Vec<StructDoc>,
    #[serde(default)]
    pub consts: Vec<ConstDoc>,
    #[serde(default)]
    pub services: Vec<ServiceDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDoc {
    pub name: String,
    pub values: Vec<EnumValueDoc>,
}

/// An enum value: either a bare name, or a name with an explicit number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValueDoc {
    Name(String),
    Explicit {
        name: String,
        #[serde(default)]
        value: Option<i32>,
    },
}

impl EnumValueDoc {
    pub fn name(&self) -> &str {
        match self {
            EnumValueDoc::Name(name) => name,
            EnumValueDoc::Explicit { name, .. } => name,
        }
    }

    pub fn value(&self) -> Option<i32> {
        match self {
            EnumValueDoc::Name(_) => None,
            EnumValueDoc::Explicit { value, .. } => *value,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypedefDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructDoc {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

/// A field, argument or declared exception. A missing `id` continues from
/// the previous field (the first defaults to 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDoc {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i16>,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub requiredness: Requiredness,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConstValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub value: ConstValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDoc {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub functions: Vec<FunctionDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDoc {
    pub name: String,
    #[serde(default = "default_return_type")]
    pub returns: String,
    #[serde(default)]
    pub args: Vec<FieldDoc>,
    #[serde(default)]
    pub throws: Vec<FieldDoc>,
    #[serde(default)]
    pub oneway: bool,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl SchemaDocument {
    pub fn from_json_str(s: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Loads a document, choosing the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            other => Err(SchemaError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Validates the document and builds the immutable schema.
    pub fn compile(&self) -> Result<Schema, SchemaError> {
        Schema::compile(self)
    }
}
