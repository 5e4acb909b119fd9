//! # ridl-codegen
//!
//! Generates Rust bindings from a ridl schema.
//!
//! One bindings module holds every enum, typedef, constant and struct
//! (synthetic args/result structs included) together with the per-service
//! handler traits, client stubs and processors. Each service also gets a
//! server skeleton that can be copied out and filled in.
//!
//! The generated code depends on `ridl-protocol` and `ridl-rpc`; skeletons
//! additionally use `ridl-server`, `tokio` and `tracing-subscriber`.

pub mod code_writer;
pub mod error;
pub mod names;
pub mod services;
pub mod skeleton;
pub mod structs;
pub mod types;

pub use code_writer::CodeWriter;
pub use error::CodegenError;

use names::RustTypes;
use ridl_schema::Schema;
use std::path::{Path, PathBuf};
use tracing::debug;

const LINT_HEADER: &str =
    "#![allow(dead_code, unused_imports, unused_mut, unreachable_patterns, clippy::all)]";

const PRELUDE: &str = "\
use ridl_protocol::{
    ApplicationException, ApplicationExceptionKind, BinaryReader, BinaryWriter, Bytes,
    MessageHeader, MessageType, ProtocolError, ProtocolReader, ProtocolWriter, WireType,
};
use ridl_rpc::{write_exception, Process, RpcError, StubError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
";

/// Generation options.
#[derive(Debug, Clone)]
pub struct GenOptions {
    /// Name of the bindings module; `None` derives it from the schema
    /// namespace, falling back to `bindings`.
    pub module: Option<String>,
    /// Emit a server skeleton per service.
    pub skeletons: bool,
    /// Start the bindings with a module-level `#![allow(..)]`. Turn this
    /// off for bindings pulled in with `include!`, which rejects inner
    /// attributes; put the allow on the enclosing module instead.
    pub inner_attributes: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            module: None,
            skeletons: true,
            inner_attributes: true,
        }
    }
}

/// One generated source file, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Module name used for the bindings of `schema`.
pub fn module_name(schema: &Schema, options: &GenOptions) -> String {
    use heck::ToSnakeCase;

    options
        .module
        .clone()
        .or_else(|| {
            schema
                .namespace()
                .and_then(|ns| ns.rsplit(['.', ':']).next())
                .filter(|last| !last.is_empty())
                .map(|last| last.to_snake_case())
        })
        .unwrap_or_else(|| "bindings".to_string())
}

/// Generates the bindings module and, if enabled, the server skeletons.
pub fn generate(schema: &Schema, options: &GenOptions) -> Result<Vec<GeneratedFile>, CodegenError> {
    let types = RustTypes::new(schema);
    let module = module_name(schema, options);

    let mut w = CodeWriter::new();
    w.line("// @generated by ridl-codegen. Do not edit.")?;
    w.blank()?;
    if options.inner_attributes {
        w.line(LINT_HEADER)?;
        w.blank()?;
    }
    for line in PRELUDE.lines() {
        if line.is_empty() {
            w.blank()?;
        } else {
            w.line(line)?;
        }
    }

    if !schema.enums().is_empty() {
        w.blank()?;
        for def in schema.enums() {
            types::emit_enum(&mut w, def)?;
        }
    }
    if !schema.typedefs().is_empty() {
        w.blank()?;
        for def in schema.typedefs() {
            types::emit_typedef(&mut w, &types, def)?;
        }
    }
    if !schema.consts().is_empty() {
        w.blank()?;
        for def in schema.consts() {
            types::emit_const(&mut w, &types, def)?;
        }
    }
    w.blank()?;
    for def in schema.structs() {
        structs::StructEmitter::new(&types, def).emit(&mut w)?;
    }
    for service in schema.services() {
        services::ServiceEmitter::new(&types, service)?.emit(&mut w)?;
    }

    let mut files = vec![GeneratedFile {
        path: PathBuf::from(format!("{}.rs", module)),
        contents: w.finish().trim_end().to_string() + "\n",
    }];

    if options.skeletons {
        for service in schema.services() {
            let mut w = CodeWriter::new();
            skeleton::emit_skeleton(&mut w, &types, service, &module)?;
            files.push(GeneratedFile {
                path: PathBuf::from(format!(
                    "{}_server.skeleton.rs",
                    heck::ToSnakeCase::to_snake_case(service.name.as_str())
                )),
                contents: w.finish(),
            });
        }
    }

    debug!(
        "Generated {} file(s) for {} struct(s), {} service(s)",
        files.len(),
        schema.structs().len(),
        schema.services().len()
    );
    Ok(files)
}

/// Writes generated files below `dir`, creating it if needed.
pub fn write_files(dir: impl AsRef<Path>, files: &[GeneratedFile]) -> Result<(), CodegenError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    for file in files {
        std::fs::write(dir.join(&file.path), &file.contents)?;
    }
    Ok(())
}
