//! Schema error types.

use thiserror::Error;

/// Errors raised while loading or compiling a schema. All of them are fatal
/// for the schema being compiled.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("invalid type expression '{expr}': {reason}")]
    InvalidTypeExpr { expr: String, reason: String },

    #[error("duplicate type name: {0}")]
    DuplicateType(String),

    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("duplicate constant name: {0}")]
    DuplicateConst(String),

    #[error("duplicate field id {id} in {owner}")]
    DuplicateFieldId { owner: String, id: i16 },

    #[error("duplicate field name '{name}' in {owner}")]
    DuplicateFieldName { owner: String, name: String },

    #[error("duplicate enum value '{value}' in {owner}")]
    DuplicateEnumValue { owner: String, value: String },

    #[error("undefined type '{name}' referenced by {context}")]
    UndefinedType { name: String, context: String },

    #[error("field '{field}' of {owner} cannot have type void")]
    VoidField { owner: String, field: String },

    #[error("typedef cycle through '{0}'")]
    TypedefCycle(String),

    #[error("{function} throws '{name}', which is not an exception")]
    NotAnException { function: String, name: String },

    #[error("oneway function {function} must return void and declare no exceptions")]
    InvalidOneway { function: String },

    #[error("undefined service: {0}")]
    UndefinedService(String),

    #[error("service inheritance cycle through '{0}'")]
    ServiceCycle(String),

    #[error("method '{method}' of service {service} is already defined in the hierarchy")]
    DuplicateMethod { service: String, method: String },

    #[error("struct {owner} has no field named '{field}'")]
    UndefinedField { owner: String, field: String },

    #[error("invalid value for constant {name}: {reason}")]
    InvalidConstant { name: String, reason: String },

    #[error("unsupported schema format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    pub(crate) fn undefined(name: impl Into<String>, context: impl Into<String>) -> Self {
        SchemaError::UndefinedType {
            name: name.into(),
            context: context.into(),
        }
    }

    pub(crate) fn constant(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidConstant {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
