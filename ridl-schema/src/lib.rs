//! # ridl-schema
//!
//! Type model for ridl schemas.
//!
//! This crate provides:
//! - The `Type` model (base types, enums, typedefs, structs, containers)
//! - Schema documents in JSON or YAML and their validation into a `Schema`
//! - Synthetic `{service}_{function}_args` / `_result` structs
//! - Wire type tags and structural fingerprints per type

pub mod constant;
pub mod definition;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod schema;
pub mod types;
pub mod wire;

pub use constant::ConstValue;
pub use definition::{
    args_struct_name, result_struct_name, ConstDef, EnumDef, EnumValue, Field, FunctionDef,
    Requiredness, ServiceDef, StructDef, StructKind, TypedefDef, SUCCESS_FIELD_ID,
    SUCCESS_FIELD_NAME,
};
pub use document::SchemaDocument;
pub use error::SchemaError;
pub use schema::{MethodRef, Schema};
pub use types::{Type, TypeExpr};
pub use wire::resolved_wire_type;
