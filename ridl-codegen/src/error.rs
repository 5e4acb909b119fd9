//! Error types for code generation.

use ridl_schema::SchemaError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("constant {name} cannot be emitted: {reason}")]
    UnsupportedConstant { name: String, reason: String },

    #[error("void type in {context}")]
    VoidType { context: String },

    #[error("formatting error")]
    Fmt(#[from] fmt::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    pub(crate) fn constant(name: &str, reason: impl Into<String>) -> Self {
        CodegenError::UnsupportedConstant {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
