//! Compiled schema definitions.

use crate::constant::ConstValue;
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// Presence rule for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requiredness {
    /// Always written; decoding fails if absent.
    Required,
    /// Written only when present.
    Optional,
    /// Written when present, or from the declared default.
    #[default]
    Default,
}

impl Requiredness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Requiredness::Required => "required",
            Requiredness::Optional => "optional",
            Requiredness::Default => "default",
        }
    }
}

/// A struct field or function argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub id: i16,
    pub name: String,
    pub ty: Type,
    pub requiredness: Requiredness,
    /// Normalized default value, if declared.
    pub default: Option<ConstValue>,
}

impl Field {
    pub fn new(id: i16, name: impl Into<String>, ty: Type, requiredness: Requiredness) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            requiredness,
            default: None,
        }
    }

    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    pub fn is_optional(&self) -> bool {
        self.requiredness == Requiredness::Optional
    }
}

/// What a struct definition was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructKind {
    /// Declared in the schema.
    User,
    /// Synthetic `{service}_{function}_args`.
    Args,
    /// Synthetic `{service}_{function}_result`.
    Result,
}

/// Struct or exception definition.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    /// Fields in declaration order, which is also wire order.
    pub fields: Vec<Field>,
    pub is_exception: bool,
    pub kind: StructKind,
    /// Structural fingerprint, filled in when the schema is compiled.
    pub fingerprint: String,
}

impl StructDef {
    pub fn field(&self, id: i16) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_synthetic(&self) -> bool {
        self.kind != StructKind::User
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub value: i32,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<EnumValue>,
}

impl EnumDef {
    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Returns the name of `value`, if it is one of the declared ordinals.
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value == value)
            .map(|v| v.name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct TypedefDef {
    pub name: String,
    pub target: Type,
}

#[derive(Debug, Clone)]
pub struct ConstDef {
    pub name: String,
    pub ty: Type,
    /// Normalized against `ty`.
    pub value: ConstValue,
}

impl ConstDef {
    /// Looks up a member of a struct literal.
    pub fn struct_member(&self, field: &str) -> Option<&ConstValue> {
        match &self.value {
            ConstValue::Struct(fields) => fields.iter().find(|(n, _)| n == field).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// An RPC method.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub return_type: Type,
    pub args: Vec<Field>,
    /// Declared exceptions; each field's type is an exception struct.
    pub throws: Vec<Field>,
    pub oneway: bool,
}

impl FunctionDef {
    /// Returns the declared exception field whose struct is `exception`.
    pub fn throws_field(&self, exception: &str) -> Option<&Field> {
        self.throws
            .iter()
            .find(|f| matches!(&f.ty, Type::Struct(name) if name == exception))
    }
}

#[derive(Debug, Clone)]
pub struct ServiceDef {
    pub name: String,
    pub extends: Option<String>,
    pub functions: Vec<FunctionDef>,
}

impl ServiceDef {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Name of the synthetic args struct for `function` declared on `service`.
pub fn args_struct_name(service: &str, function: &str) -> String {
    format!("{}_{}_args", service, function)
}

/// Name of the synthetic result struct for `function` declared on `service`.
pub fn result_struct_name(service: &str, function: &str) -> String {
    format!("{}_{}_result", service, function)
}

/// Field id of the `success` slot in result structs.
pub const SUCCESS_FIELD_ID: i16 = 0;

/// Field name of the `success` slot in result structs.
pub const SUCCESS_FIELD_NAME: &str = "success";
