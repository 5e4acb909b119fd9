//! Service bindings: handler traits, client stubs and processors.
//!
//! For a service `Geo` the emitter produces:
//! - `GeoDistError`, one error enum per non-oneway function, with a variant
//!   per declared exception plus `Other(String)`
//! - `GeoHandler`, implemented by the user; it extends the parent's trait
//! - `GeoClient` with `send_*`, `recv_*` and a blocking call per method
//! - `GeoProcessor<H>`, which implements `ridl_rpc::Process`
//! - `GeoMultiface`, a handler that fans each call out to several handlers
//!
//! Client and processor are flattened over the inheritance chain, using
//! the declaring service's synthetic args/result structs.

use crate::code_writer::CodeWriter;
use crate::cw_line;
use crate::error::CodegenError;
use crate::names::{field_ident, type_ident, RustTypes};
use heck::ToSnakeCase;
use ridl_schema::{FunctionDef, MethodRef, ServiceDef};

pub fn error_enum_name(service: &str, function: &str) -> String {
    type_ident(&format!("{}_{}_error", service, function))
}

pub fn handler_trait_name(service: &str) -> String {
    type_ident(&format!("{}_handler", service))
}

/// Suffix of the `send_*`, `recv_*` and `process_*` methods.
fn snake(name: &str) -> String {
    name.to_snake_case()
}

fn variant_name(field: &str) -> String {
    let name = type_ident(field);
    if name == "Other" {
        "OtherException".to_string()
    } else {
        name
    }
}

/// `{open}ApplicationException::new(kind, message{close}`, one argument
/// per line.
fn emit_application_exception(
    w: &mut CodeWriter,
    open: &str,
    kind: &str,
    message: &str,
    close: &str,
) -> std::fmt::Result {
    cw_line!(w, "{}ApplicationException::new(", open)?;
    {
        let _indent = w.indent();
        cw_line!(w, "ApplicationExceptionKind::{},", kind)?;
        cw_line!(w, "{},", message)?;
    }
    w.line(close)
}

pub struct ServiceEmitter<'a, 'b> {
    types: &'b RustTypes<'a>,
    service: &'b ServiceDef,
    methods: Vec<MethodRef<'a>>,
    name: String,
}

impl<'a, 'b> ServiceEmitter<'a, 'b> {
    pub fn new(types: &'b RustTypes<'a>, service: &'b ServiceDef) -> Result<Self, CodegenError> {
        let methods = types.schema().methods(&service.name)?;
        Ok(Self {
            types,
            service,
            methods,
            name: type_ident(&service.name),
        })
    }

    pub fn emit(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        for function in &self.service.functions {
            if !function.oneway {
                self.emit_error_enum(w, function)?;
                w.blank()?;
            }
        }
        self.emit_handler(w)?;
        w.blank()?;
        self.emit_client(w)?;
        w.blank()?;
        self.emit_processor(w)?;
        w.blank()?;
        self.emit_multiface(w)?;
        w.blank()?;
        Ok(())
    }

    /// `a: Point, b: Point`
    pub(crate) fn params(&self, function: &FunctionDef) -> Result<String, CodegenError> {
        Ok(function
            .args
            .iter()
            .map(|arg| Ok(format!("{}: {}", field_ident(&arg.name), self.types.rust_type(&arg.ty)?)))
            .collect::<Result<Vec<_>, CodegenError>>()?
            .join(", "))
    }

    fn arg_names(function: &FunctionDef) -> String {
        function
            .args
            .iter()
            .map(|arg| field_ident(&arg.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Return type of the handler method for `method`.
    pub(crate) fn handler_return(&self, method: &MethodRef<'_>) -> Result<String, CodegenError> {
        if method.function.oneway {
            return Ok("Result<(), String>".to_string());
        }
        Ok(format!(
            "Result<{}, {}>",
            self.types.rust_type(&method.function.return_type)?,
            error_enum_name(&method.owner.name, &method.function.name)
        ))
    }

    fn emit_error_enum(&self, w: &mut CodeWriter, function: &FunctionDef) -> Result<(), CodegenError> {
        let name = error_enum_name(&self.service.name, &function.name);
        cw_line!(w, "/// Failure of `{}.{}`.", self.service.name, function.name)?;
        w.line("#[derive(Debug, Clone, PartialEq)]")?;
        let mut variants = Vec::with_capacity(function.throws.len());
        for field in &function.throws {
            variants.push((variant_name(&field.name), self.types.rust_type(&field.ty)?));
        }
        w.block(&format!("pub enum {}", name), |w| {
            for (variant, ty) in &variants {
                cw_line!(w, "{}({}),", variant, ty)?;
            }
            w.doc("Any other failure; reported to the caller as an internal error.")?;
            w.line("Other(String),")
        })?;
        w.blank()?;

        w.block(&format!("impl fmt::Display for {}", name), |w| {
            w.block("fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result", |w| {
                w.block("match self", |w| {
                    for (variant, _) in &variants {
                        cw_line!(w, "{}::{}(e) => write!(f, \"{}: {{}}\", e),", name, variant, variant)?;
                    }
                    cw_line!(w, "{}::Other(msg) => f.write_str(msg),", name)
                })
            })
        })?;
        w.blank()?;
        cw_line!(w, "impl std::error::Error for {} {{}}", name)?;

        let mut seen = Vec::new();
        for (variant, ty) in &variants {
            // one conversion per exception type, the first field wins
            if seen.contains(ty) {
                continue;
            }
            seen.push(ty.clone());
            w.blank()?;
            w.block(&format!("impl From<{}> for {}", ty, name), |w| {
                w.block(&format!("fn from(e: {}) -> Self", ty), |w| {
                    cw_line!(w, "{}::{}(e)", name, variant)
                })
            })?;
        }
        Ok(())
    }

    fn emit_handler(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let trait_name = handler_trait_name(&self.service.name);
        let bound = match &self.service.extends {
            Some(parent) => handler_trait_name(parent),
            None => "Send + Sync".to_string(),
        };
        let mut signatures = Vec::with_capacity(self.service.functions.len());
        for function in &self.service.functions {
            let method = MethodRef {
                owner: self.service,
                function,
            };
            let params = self.params(function)?;
            let sep = if params.is_empty() { "" } else { ", " };
            signatures.push(format!(
                "fn {}(&self{}{}) -> {};",
                field_ident(&function.name),
                sep,
                params,
                self.handler_return(&method)?
            ));
        }
        cw_line!(w, "/// Server-side implementation of `{}`.", self.service.name)?;
        w.block(&format!("pub trait {}: {}", trait_name, bound), |w| {
            for line in &signatures {
                w.line(line)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    fn emit_client(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let client = format!("{}Client", self.name);
        let parent = self
            .service
            .extends
            .as_ref()
            .map(|p| format!("{}Client", type_ident(p)));
        cw_line!(w, "/// Client stub for `{}`.", self.service.name)?;
        if parent.is_some() {
            w.line("///")?;
            w.line("/// Inherited methods are forwarded to the parent stub, which also")?;
            w.line("/// hands out the sequence ids.")?;
        }
        w.line("#[derive(Debug, Default)]")?;
        w.block(&format!("pub struct {}", client), |w| match &parent {
            Some(parent) => cw_line!(w, "parent: {},", parent),
            None => w.line("seq_id: AtomicI32,"),
        })?;
        w.blank()?;

        let mut result = Ok(());
        w.block(&format!("impl {}", client), |w| {
            result = (|| -> Result<(), CodegenError> {
                w.block("pub fn new() -> Self", |w| w.line("Self::default()"))?;
                w.blank()?;
                if let Some(parent) = &parent {
                    w.block(&format!("pub fn parent(&self) -> &{}", parent), |w| {
                        w.line("&self.parent")
                    })?;
                    w.blank()?;
                    w.block("fn next_seq_id(&self) -> i32", |w| w.line("self.parent.next_seq_id()"))?;
                } else {
                    w.block("fn next_seq_id(&self) -> i32", |w| {
                        w.line("self.seq_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)")
                    })?;
                }
                for method in &self.methods {
                    if method.owner.name != self.service.name {
                        self.emit_forwarders(w, method)?;
                        continue;
                    }
                    w.blank()?;
                    self.emit_send(w, method)?;
                    if !method.function.oneway {
                        w.blank()?;
                        self.emit_recv(w, method)?;
                    }
                    w.blank()?;
                    self.emit_call(w, method)?;
                }
                Ok(())
            })();
            Ok(())
        })?;
        result
    }

    fn send_signature(&self, function: &FunctionDef) -> Result<String, CodegenError> {
        let params = self.params(function)?;
        let sep = if params.is_empty() { "" } else { ", " };
        Ok(format!(
            "pub fn send_{}<W: ProtocolWriter + ?Sized>(&self, o_prot: &mut W{}{}) -> Result<i32, ProtocolError>",
            snake(&function.name),
            sep,
            params
        ))
    }

    fn recv_signature(&self, method: &MethodRef<'_>) -> Result<String, CodegenError> {
        let function = method.function;
        Ok(format!(
            "pub fn recv_{}<R: ProtocolReader + ?Sized>(&self, i_prot: &mut R) -> Result<{}, StubError<{}>>",
            snake(&function.name),
            self.types.rust_type(&function.return_type)?,
            error_enum_name(&method.owner.name, &function.name)
        ))
    }

    /// Doc line, signature and `where` clause of the blocking call.
    fn emit_call_header(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let ident = field_ident(&function.name);
        let params = self.params(function)?;
        let sep = if params.is_empty() { "" } else { ", " };
        if function.oneway {
            cw_line!(w, "/// Sends `{}` through `send`; no reply is expected.", function.name)?;
            w.line(&format!("pub fn {}<F>(&self, send: F{}{}) -> Result<(), ProtocolError>", ident, sep, params))?;
            w.line("where")?;
            w.line("    F: FnOnce(Bytes) -> Result<(), ProtocolError>,")?;
            return Ok(());
        }
        cw_line!(
            w,
            "/// Calls `{}`; `exchange` carries the request to the server and returns the reply.",
            function.name
        )?;
        w.line(&format!(
            "pub fn {}<F>(&self, exchange: F{}{}) -> Result<{}, StubError<{}>>",
            ident,
            sep,
            params,
            self.types.rust_type(&function.return_type)?,
            error_enum_name(&method.owner.name, &function.name)
        ))?;
        w.line("where")?;
        w.line("    F: FnOnce(Bytes) -> Result<Bytes, ProtocolError>,")?;
        Ok(())
    }

    /// Inherited method: every entry point delegates to the parent stub.
    fn emit_forwarders(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let lower = snake(&function.name);
        let args = Self::arg_names(function);
        let sep = if args.is_empty() { "" } else { ", " };

        w.blank()?;
        w.block(&self.send_signature(function)?, |w| {
            cw_line!(w, "self.parent.send_{}(o_prot{}{})", lower, sep, args)
        })?;
        if !function.oneway {
            w.blank()?;
            w.block(&self.recv_signature(method)?, |w| {
                cw_line!(w, "self.parent.recv_{}(i_prot)", lower)
            })?;
        }
        w.blank()?;
        self.emit_call_header(w, method)?;
        let transport = if function.oneway { "send" } else { "exchange" };
        w.block("", |w| {
            cw_line!(
                w,
                "self.parent.{}({}{}{})",
                field_ident(&function.name),
                transport,
                sep,
                args
            )
        })?;
        Ok(())
    }

    fn emit_send(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let message_type = if function.oneway { "Oneway" } else { "Call" };
        let args_struct = type_ident(&method.args_struct());
        let args = Self::arg_names(function);
        w.block(&self.send_signature(function)?, |w| {
            w.line("let seq_id = self.next_seq_id();")?;
            cw_line!(w, "let args = {} {{ {} }};", args_struct, args)?;
            cw_line!(
                w,
                "o_prot.write_message_begin(&MessageHeader::new({:?}, MessageType::{}, seq_id))?;",
                function.name,
                message_type
            )?;
            w.line("args.write(o_prot)?;")?;
            w.line("o_prot.write_message_end()?;")?;
            w.line("o_prot.flush()?;")?;
            w.line("Ok(seq_id)")
        })?;
        Ok(())
    }

    fn emit_recv(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let error = error_enum_name(&method.owner.name, &function.name);
        let result_struct = type_ident(&method.result_struct());
        w.block(&self.recv_signature(method)?, |w| {
            w.line("let header = i_prot.read_message_begin()?;")?;
            w.block("if header.message_type == MessageType::Exception", |w| {
                w.line("let exception = ApplicationException::read(i_prot)?;")?;
                w.line("i_prot.read_message_end()?;")?;
                w.line("return Err(exception.into());")
            })?;
            w.block("if header.message_type != MessageType::Reply", |w| {
                w.line("i_prot.skip(WireType::Struct)?;")?;
                w.line("i_prot.read_message_end()?;")?;
                emit_application_exception(
                    w,
                    "return Err(",
                    "InvalidMessageType",
                    &format!("format!(\"{} expected a reply, got {{}}\", header.message_type)", function.name),
                    ").into());",
                )
            })?;
            cw_line!(w, "if header.name != {:?} {{", function.name)?;
            {
                let _indent = w.indent();
                w.line("i_prot.skip(WireType::Struct)?;")?;
                w.line("i_prot.read_message_end()?;")?;
                emit_application_exception(
                    w,
                    "return Err(",
                    "WrongMethodName",
                    &format!("format!(\"{} got a reply for {{}}\", header.name)", function.name),
                    ").into());",
                )?;
            }
            w.line("}")?;
            cw_line!(w, "let result = {}::read(i_prot)?;", result_struct)?;
            w.line("i_prot.read_message_end()?;")?;
            if !function.return_type.is_void() {
                w.block("if let Some(success) = result.success", |w| w.line("return Ok(success);"))?;
            }
            for field in &function.throws {
                w.block(&format!("if let Some(e) = result.{}", field_ident(&field.name)), |w| {
                    cw_line!(
                        w,
                        "return Err(StubError::Declared({}::{}(e)));",
                        error,
                        variant_name(&field.name)
                    )
                })?;
            }
            if function.return_type.is_void() {
                w.line("Ok(())")
            } else {
                emit_application_exception(
                    w,
                    "Err(",
                    "MissingResult",
                    &format!("\"{} failed: unknown result\"", function.name),
                    ").into())",
                )
            }
        })?;
        Ok(())
    }

    fn emit_call(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let args = Self::arg_names(function);
        let sep = if args.is_empty() { "" } else { ", " };
        let lower = snake(&function.name);
        self.emit_call_header(w, method)?;
        if function.oneway {
            w.block("", |w| {
                w.line("let mut o_prot = BinaryWriter::new();")?;
                cw_line!(w, "self.send_{}(&mut o_prot{}{})?;", lower, sep, args)?;
                w.line("send(o_prot.into_bytes().freeze())")
            })?;
            return Ok(());
        }
        w.block("", |w| {
            w.line("let mut o_prot = BinaryWriter::new();")?;
            cw_line!(w, "self.send_{}(&mut o_prot{}{})?;", lower, sep, args)?;
            w.line("let reply = exchange(o_prot.into_bytes().freeze())?;")?;
            cw_line!(w, "self.recv_{}(&mut BinaryReader::new(reply))", lower)
        })?;
        Ok(())
    }

    fn emit_processor(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let processor = format!("{}Processor", self.name);
        let handler = handler_trait_name(&self.service.name);
        cw_line!(w, "/// Dispatches `{}` calls to a handler.", self.service.name)?;
        w.block(&format!("pub struct {}<H>", processor), |w| w.line("handler: H,"))?;
        w.blank()?;

        let mut result = Ok(());
        w.block(&format!("impl<H: {}> {}<H>", handler, processor), |w| {
            result = (|| -> Result<(), CodegenError> {
                w.block("pub fn new(handler: H) -> Self", |w| w.line("Self { handler }"))?;
                w.blank()?;
                w.block("pub fn handler(&self) -> &H", |w| w.line("&self.handler"))?;
                for method in &self.methods {
                    w.blank()?;
                    self.emit_process_method(w, method)?;
                }
                Ok(())
            })();
            Ok(())
        })?;
        result?;
        w.blank()?;

        w.block(&format!("impl<H: {}> Process for {}<H>", handler, processor), |w| {
            w.block("fn service(&self) -> &str", |w| cw_line!(w, "{:?}", self.service.name))?;
            w.blank()?;
            w.line("fn process(")?;
            {
                let _indent = w.indent();
                w.line("&self,")?;
                w.line("i_prot: &mut dyn ProtocolReader,")?;
                w.line("o_prot: &mut dyn ProtocolWriter,")?;
            }
            w.block(") -> Result<bool, RpcError>", |w| {
                w.line("let header = i_prot.read_message_begin()?;")?;
                w.block(
                    "if !matches!(header.message_type, MessageType::Call | MessageType::Oneway)",
                    |w| {
                        w.line("i_prot.skip(WireType::Struct)?;")?;
                        w.line("i_prot.read_message_end()?;")?;
                        emit_application_exception(
                            w,
                            "let exception = ",
                            "InvalidMessageType",
                            "format!(\"unexpected message type {}\", header.message_type)",
                            ");",
                        )?;
                        w.line("write_exception(o_prot, &header.name, header.seq_id, &exception)?;")?;
                        w.line("return Ok(true);")
                    },
                )?;
                w.block("match header.name.as_str()", |w| {
                    for method in &self.methods {
                        cw_line!(
                            w,
                            "{:?} => self.process_{}(header.seq_id, i_prot, o_prot),",
                            method.function.name,
                            snake(&method.function.name)
                        )?;
                    }
                    w.block("_ =>", |w| {
                        w.line("i_prot.skip(WireType::Struct)?;")?;
                        w.line("i_prot.read_message_end()?;")?;
                        w.block("if header.message_type == MessageType::Oneway", |w| {
                            w.line("return Ok(false);")
                        })?;
                        w.line("let exception = ApplicationException::unknown_method(&header.name);")?;
                        w.line("write_exception(o_prot, &header.name, header.seq_id, &exception)?;")?;
                        w.line("Ok(true)")
                    })
                })
            })
        })?;
        Ok(())
    }

    fn emit_multiface(&self, w: &mut CodeWriter) -> Result<(), CodegenError> {
        let multiface = format!("{}Multiface", self.name);
        let handler = handler_trait_name(&self.service.name);
        let mut chain = self.types.schema().parents(&self.service.name)?;
        chain.reverse();
        chain.push(self.service);

        cw_line!(w, "/// Calls every handler in turn for each `{}` method.", self.service.name)?;
        w.line("///")?;
        w.line("/// The result of the last handler is returned; a failing handler stops")?;
        w.line("/// the fan-out. With no handlers every call fails.")?;
        w.line("#[derive(Default)]")?;
        w.block(&format!("pub struct {}", multiface), |w| {
            cw_line!(w, "handlers: Vec<Arc<dyn {}>>,", handler)
        })?;
        w.blank()?;
        w.block(&format!("impl {}", multiface), |w| {
            w.block(&format!("pub fn new(handlers: Vec<Arc<dyn {}>>) -> Self", handler), |w| {
                w.line("Self { handlers }")
            })?;
            w.blank()?;
            w.block(&format!("pub fn add(&mut self, handler: Arc<dyn {}>)", handler), |w| {
                w.line("self.handlers.push(handler);")
            })?;
            w.blank()?;
            w.block("pub fn len(&self) -> usize", |w| w.line("self.handlers.len()"))
        })?;

        for owner in chain {
            w.blank()?;
            let mut result = Ok(());
            let header = format!("impl {} for {}", handler_trait_name(&owner.name), multiface);
            w.block(&header, |w| {
                result = (|| -> Result<(), CodegenError> {
                    for (i, function) in owner.functions.iter().enumerate() {
                        if i > 0 {
                            w.blank()?;
                        }
                        self.emit_fan_out(w, &MethodRef { owner, function })?;
                    }
                    Ok(())
                })();
                Ok(())
            })?;
            result?;
        }
        Ok(())
    }

    fn emit_fan_out(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let ident = field_ident(&function.name);
        let params = self.params(function)?;
        let sep = if params.is_empty() { "" } else { ", " };
        let cloned = function
            .args
            .iter()
            .map(|arg| format!("{}.clone()", field_ident(&arg.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let no_handlers = if function.oneway {
            "\"no handlers\".to_string()".to_string()
        } else {
            format!(
                "{}::Other(\"no handlers\".to_string())",
                error_enum_name(&method.owner.name, &function.name)
            )
        };

        let signature = format!(
            "fn {}(&self{}{}) -> {}",
            ident,
            sep,
            params,
            self.handler_return(method)?
        );
        w.block(&signature, |w| {
            w.line("let Some((last, rest)) = self.handlers.split_last() else {")?;
            cw_line!(w, "    return Err({});", no_handlers)?;
            w.line("};")?;
            w.block("for handler in rest", |w| cw_line!(w, "handler.{}({})?;", ident, cloned))?;
            cw_line!(w, "last.{}({})", ident, Self::arg_names(function))
        })?;
        Ok(())
    }

    fn emit_process_method(&self, w: &mut CodeWriter, method: &MethodRef<'_>) -> Result<(), CodegenError> {
        let function = method.function;
        let name = &function.name;
        let args_struct = type_ident(&method.args_struct());
        let call_args = function
            .args
            .iter()
            .map(|arg| format!("args.{}", field_ident(&arg.name)))
            .collect::<Vec<_>>()
            .join(", ");
        let call = format!("self.handler.{}({})", field_ident(name), call_args);

        w.line(&format!("fn process_{}(", snake(name)))?;
        {
            let _indent = w.indent();
            w.line("&self,")?;
            w.line("seq_id: i32,")?;
            w.line("i_prot: &mut dyn ProtocolReader,")?;
            w.line("o_prot: &mut dyn ProtocolWriter,")?;
        }
        let mut result = Ok(());
        w.block(") -> Result<bool, RpcError>", |w| {
            result = (|| -> Result<(), CodegenError> {
                cw_line!(
                    w,
                    "let args = {}::read(i_prot).and_then(|args| i_prot.read_message_end().map(|_| args));",
                    args_struct
                )?;
                if function.oneway {
                    w.block("if let Ok(args) = args", |w| {
                        cw_line!(
                            w,
                            "let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {}));",
                            call
                        )
                    })?;
                    w.line("Ok(false)")?;
                    return Ok(());
                }

                w.block_with("let args = match args", ";", |w| {
                    w.line("Ok(args) => args,")?;
                    w.block("Err(e) =>", |w| {
                        w.line("let exception = ApplicationException::new(ApplicationExceptionKind::ProtocolError, e.to_string());")?;
                        cw_line!(w, "write_exception(o_prot, {:?}, seq_id, &exception)?;", name)?;
                        w.line("return Ok(true);")
                    })
                })?;

                let error = error_enum_name(&method.owner.name, name);
                let result_struct = type_ident(&method.result_struct());
                w.block_with(
                    &format!(
                        "let outcome = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {}))",
                        call
                    ),
                    ";",
                    |w| {
                        w.line("Ok(outcome) => outcome,")?;
                        cw_line!(w, "Err(_) => Err({}::Other(\"handler panicked\".to_string())),", error)
                    },
                )?;
                w.block_with("let result = match outcome", ";", |w| {
                    if function.return_type.is_void() {
                        cw_line!(w, "Ok(()) => {}::default(),", result_struct)?;
                    } else {
                        cw_line!(
                            w,
                            "Ok(success) => {} {{ success: Some(success), ..Default::default() }},",
                            result_struct
                        )?;
                    }
                    for field in &function.throws {
                        cw_line!(
                            w,
                            "Err({}::{}(e)) => {} {{ {}: Some(e), ..Default::default() }},",
                            error,
                            variant_name(&field.name),
                            result_struct,
                            field_ident(&field.name)
                        )?;
                    }
                    w.block(&format!("Err({}::Other(msg)) =>", error), |w| {
                        emit_application_exception(
                            w,
                            "let exception = ",
                            "InternalError",
                            &format!("format!(\"Internal error processing {}: {{}}\", msg)", name),
                            ");",
                        )?;
                        cw_line!(w, "write_exception(o_prot, {:?}, seq_id, &exception)?;", name)?;
                        w.line("return Ok(true);")
                    })
                })?;
                cw_line!(
                    w,
                    "o_prot.write_message_begin(&MessageHeader::new({:?}, MessageType::Reply, seq_id))?;",
                    name
                )?;
                w.line("result.write(o_prot)?;")?;
                w.line("o_prot.write_message_end()?;")?;
                w.line("o_prot.flush()?;")?;
                w.line("Ok(true)")?;
                Ok(())
            })();
            Ok(())
        })?;
        result
    }
}
