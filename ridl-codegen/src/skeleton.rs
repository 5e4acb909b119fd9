//! Server skeletons: a runnable `main` with a stub handler per service.

use crate::code_writer::CodeWriter;
use crate::cw_line;
use crate::error::CodegenError;
use crate::names::{field_ident, type_ident, RustTypes};
use crate::services::{handler_trait_name, ServiceEmitter};
use heck::ToSnakeCase;
use ridl_schema::{MethodRef, ServiceDef};

/// Emits the skeleton for `service`, to be built next to the bindings
/// module `module`.
pub fn emit_skeleton(
    w: &mut CodeWriter,
    types: &RustTypes<'_>,
    service: &ServiceDef,
    module: &str,
) -> Result<(), CodegenError> {
    let schema = types.schema();
    let emitter = ServiceEmitter::new(types, service)?;
    let stub = format!("{}Service", type_ident(&service.name));

    cw_line!(w, "//! Server skeleton for `{}`.", service.name)?;
    w.line("//!")?;
    w.line("//! Fill in the handler methods and build this file as a binary next to")?;
    cw_line!(w, "//! `{}.rs`.", module)?;
    w.blank()?;
    cw_line!(w, "mod {};", module)?;
    w.blank()?;
    cw_line!(w, "use {}::*;", module)?;
    w.line("use std::sync::Arc;")?;
    w.blank()?;
    cw_line!(w, "struct {};", stub)?;

    // root service first
    let mut chain = schema.parents(&service.name)?;
    chain.reverse();
    chain.push(service);
    for owner in chain {
        let mut bodies = Vec::with_capacity(owner.functions.len());
        for function in &owner.functions {
            let method = MethodRef { owner, function };
            let params = function
                .args
                .iter()
                .map(|arg| Ok(format!("_{}: {}", arg.name.to_snake_case(), types.rust_type(&arg.ty)?)))
                .collect::<Result<Vec<_>, CodegenError>>()?;
            let sep = if params.is_empty() { "" } else { ", " };
            let body = if function.oneway || function.return_type.is_void() {
                "Ok(())"
            } else {
                "Ok(Default::default())"
            };
            bodies.push((
                format!(
                    "fn {}(&self{}{}) -> {}",
                    field_ident(&function.name),
                    sep,
                    params.join(", "),
                    emitter.handler_return(&method)?
                ),
                body,
            ));
        }
        w.blank()?;
        w.block(&format!("impl {} for {}", handler_trait_name(&owner.name), stub), |w| {
            for (i, (signature, body)) in bodies.iter().enumerate() {
                if i > 0 {
                    w.blank()?;
                }
                w.block(signature, |w| w.line(body))?;
            }
            Ok(())
        })?;
    }

    w.blank()?;
    w.line("#[tokio::main]")?;
    w.block("async fn main() -> Result<(), Box<dyn std::error::Error>>", |w| {
        w.line("tracing_subscriber::fmt::init();")?;
        w.blank()?;
        cw_line!(w, "let processor = Arc::new({}Processor::new({}));", type_ident(&service.name), stub)?;
        w.line("let config = ridl_server::ServerConfig::new(\"127.0.0.1:9090\".parse()?);")?;
        w.line("ridl_server::Server::new(config, processor).run().await?;")?;
        w.line("Ok(())")
    })?;
    Ok(())
}
