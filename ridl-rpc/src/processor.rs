//! Server-side dispatch.
//!
//! A [`Processor`] owns a dispatch table mapping method names to handler
//! closures. Processing one message runs the fixed sequence: read the
//! envelope, look up the method, decode the args struct, invoke the
//! handler, then encode either the result struct as a REPLY or an
//! [`ApplicationException`] as an EXCEPTION. Oneway calls never write.
//!
//! Per-call failures are answered on the wire and never surface as an
//! error; only a broken reader or writer does.

use crate::descriptor::{flattened_methods, MethodDescriptor};
use crate::error::{RpcError, ServiceError};
use crate::multiface::Multiface;
use bytes::Bytes;
use ridl_codec::{CodecRegistry, StructValue, Value};
use ridl_protocol::{
    ApplicationException, ApplicationExceptionKind, BinaryReader, BinaryWriter, MessageHeader,
    MessageType, ProtocolError, ProtocolReader, ProtocolWriter, WireType,
};
use ridl_schema::SUCCESS_FIELD_ID;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Something that can answer one RPC message.
///
/// Implemented by the dynamic [`Processor`] and by generated processors.
/// The server runtime only depends on this trait.
pub trait Process: Send + Sync {
    /// Name of the service being served.
    fn service(&self) -> &str;

    /// Processes one message from `reader`, writing any reply to `writer`.
    /// Returns whether a reply was written.
    fn process(
        &self,
        reader: &mut dyn ProtocolReader,
        writer: &mut dyn ProtocolWriter,
    ) -> Result<bool, RpcError>;

    /// Processes one binary protocol message held in memory.
    fn process_message(&self, message: Bytes) -> Result<Option<Bytes>, RpcError> {
        let mut reader = BinaryReader::new(message);
        let mut writer = BinaryWriter::new();
        let replied = self.process(&mut reader, &mut writer)?;
        Ok(replied.then(|| writer.into_bytes().freeze()))
    }
}

/// Handler for one method. Receives the arguments in declaration order and
/// returns the success value (`None` for void methods).
pub type Handler = Arc<dyn Fn(&[Value]) -> Result<Option<Value>, ServiceError> + Send + Sync>;

#[derive(Clone)]
struct DispatchEntry {
    method: Arc<MethodDescriptor>,
    handler: Handler,
}

/// Dynamic processor over a [`CodecRegistry`].
#[derive(Clone)]
pub struct Processor {
    registry: Arc<CodecRegistry>,
    service: String,
    table: HashMap<String, DispatchEntry>,
}

impl std::fmt::Debug for Processor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.table.keys().collect();
        methods.sort();
        f.debug_struct("Processor")
            .field("service", &self.service)
            .field("methods", &methods)
            .finish()
    }
}

impl Processor {
    pub fn builder(registry: Arc<CodecRegistry>, service: &str) -> Result<ProcessorBuilder, RpcError> {
        ProcessorBuilder::new(registry, service)
    }

    /// Processor whose every method succeeds with the zero value of its
    /// return type.
    pub fn null(registry: Arc<CodecRegistry>, service: &str) -> Result<Self, RpcError> {
        let mut builder = ProcessorBuilder::new(registry.clone(), service)?;
        for method in builder.methods.clone() {
            let registry = registry.clone();
            let name = method.name.clone();
            builder = builder.handler(&name, move |_args: &[Value]| {
                if method.returns_void() {
                    return Ok(None);
                }
                registry
                    .zero_value(&method.return_type)
                    .map(Some)
                    .map_err(|e| ServiceError::other(e.to_string()))
            });
        }
        builder.build()
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Names of the methods in the dispatch table, sorted.
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.table.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn write_exception(
        &self,
        writer: &mut dyn ProtocolWriter,
        name: &str,
        seq_id: i32,
        exception: &ApplicationException,
    ) -> Result<(), RpcError> {
        tracing::debug!(
            "{}.{}: replying with exception {} (seq={})",
            self.service,
            name,
            exception,
            seq_id
        );
        write_exception(writer, name, seq_id, exception)?;
        Ok(())
    }

    fn write_reply(
        &self,
        writer: &mut dyn ProtocolWriter,
        method: &MethodDescriptor,
        result_struct: &str,
        seq_id: i32,
        result: &StructValue,
    ) -> Result<(), RpcError> {
        writer.write_message_begin(&MessageHeader::new(
            method.name.clone(),
            MessageType::Reply,
            seq_id,
        ))?;
        self.registry.write_struct(result_struct, result, writer)?;
        writer.write_message_end()?;
        writer.flush()?;
        Ok(())
    }

    /// Builds the result struct for a handler outcome. Exactly one field is
    /// set, except for a void success which leaves it empty.
    fn build_result(
        &self,
        method: &MethodDescriptor,
        result_struct: &str,
        outcome: Result<Option<Value>, ServiceError>,
    ) -> Result<StructValue, ApplicationException> {
        let mut result = StructValue::new(result_struct);
        match outcome {
            Ok(value) => {
                if !method.returns_void() {
                    let value = value.ok_or_else(|| {
                        internal_error(&method.name, "handler returned no value")
                    })?;
                    result.set(SUCCESS_FIELD_ID, value);
                }
            }
            Err(ServiceError::Declared(exception)) => {
                let slot = method.throws_for(exception.name()).ok_or_else(|| {
                    internal_error(
                        &method.name,
                        format!("undeclared exception {}", exception.name()),
                    )
                })?;
                result.set(slot.id, exception);
            }
            Err(ServiceError::Other(message)) => {
                return Err(internal_error(&method.name, message));
            }
        }

        // handler values are checked before anything reaches the writer
        self.registry
            .encoded_size(result_struct, &result)
            .map_err(|e| internal_error(&method.name, e.to_string()))?;
        Ok(result)
    }
}

impl Process for Processor {
    fn service(&self) -> &str {
        &self.service
    }

    fn process(
        &self,
        reader: &mut dyn ProtocolReader,
        writer: &mut dyn ProtocolWriter,
    ) -> Result<bool, RpcError> {
        let header = reader.read_message_begin()?;
        let seq_id = header.seq_id;

        if !matches!(header.message_type, MessageType::Call | MessageType::Oneway) {
            tracing::warn!(
                "{}: unexpected {} message for '{}' (seq={})",
                self.service,
                header.message_type,
                header.name,
                seq_id
            );
            let e = ApplicationException::new(
                ApplicationExceptionKind::InvalidMessageType,
                format!("Unexpected message type {}", header.message_type),
            );
            self.write_exception(writer, &header.name, seq_id, &e)?;
            return Ok(true);
        }

        let Some(entry) = self.table.get(&header.name) else {
            tracing::warn!("{}: unknown method '{}' (seq={})", self.service, header.name, seq_id);
            reader.skip(WireType::Struct)?;
            reader.read_message_end()?;
            reader.read_end()?;
            if header.message_type == MessageType::Oneway {
                return Ok(false);
            }
            let e = ApplicationException::unknown_method(&header.name);
            self.write_exception(writer, &header.name, seq_id, &e)?;
            return Ok(true);
        };
        let method = &entry.method;
        tracing::debug!(
            "{}.{}: {} (seq={})",
            method.service,
            method.name,
            header.message_type,
            seq_id
        );

        let args = self
            .registry
            .read_struct(&method.args_struct, reader)
            .and_then(|args| {
                reader.read_message_end()?;
                reader.read_end()?;
                method.unpack_args(&self.registry, args)
            });
        let args = match args {
            Ok(args) => args,
            Err(e) if e.is_decode_error() || method.oneway => {
                tracing::warn!("{}.{}: bad arguments: {}", method.service, method.name, e);
                if method.oneway {
                    return Ok(false);
                }
                let e = ApplicationException::new(ApplicationExceptionKind::ProtocolError, e.to_string());
                self.write_exception(writer, &method.name, seq_id, &e)?;
                return Ok(true);
            }
            Err(e) => {
                let e = internal_error(&method.name, e.to_string());
                self.write_exception(writer, &method.name, seq_id, &e)?;
                return Ok(true);
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| (entry.handler)(&args)))
            .unwrap_or_else(|_| Err(ServiceError::other("handler panicked")));

        let Some(result_struct) = &method.result_struct else {
            if let Err(e) = outcome {
                tracing::warn!("{}.{}: oneway handler failed: {}", method.service, method.name, e);
            }
            return Ok(false);
        };

        match self.build_result(method, result_struct, outcome) {
            Ok(result) => self.write_reply(writer, method, result_struct, seq_id, &result)?,
            Err(e) => {
                tracing::warn!("{}.{}: {}", method.service, method.name, e.message);
                self.write_exception(writer, &method.name, seq_id, &e)?;
            }
        }
        Ok(true)
    }
}

/// Writes `exception` as an EXCEPTION message answering `name`.
pub fn write_exception<W>(
    writer: &mut W,
    name: &str,
    seq_id: i32,
    exception: &ApplicationException,
) -> Result<usize, ProtocolError>
where
    W: ProtocolWriter + ?Sized,
{
    let mut n =
        writer.write_message_begin(&MessageHeader::new(name, MessageType::Exception, seq_id))?;
    n += exception.write(writer)?;
    n += writer.write_message_end()?;
    writer.flush()?;
    Ok(n)
}

fn internal_error(method: &str, message: impl std::fmt::Display) -> ApplicationException {
    ApplicationException::new(
        ApplicationExceptionKind::InternalError,
        format!("Internal error processing {}: {}", method, message),
    )
}

/// Builds the dispatch table of a [`Processor`].
///
/// Every method of the flattened service, inherited ones included, needs a
/// handler. Handlers of a parent processor can be taken over with
/// [`ProcessorBuilder::inherit`]; explicit handlers take precedence.
pub struct ProcessorBuilder {
    registry: Arc<CodecRegistry>,
    service: String,
    methods: Vec<Arc<MethodDescriptor>>,
    table: HashMap<String, DispatchEntry>,
    error: Option<RpcError>,
}

impl ProcessorBuilder {
    pub fn new(registry: Arc<CodecRegistry>, service: &str) -> Result<Self, RpcError> {
        let methods = flattened_methods(&registry, service)?;
        Ok(Self {
            registry,
            service: service.to_string(),
            methods,
            table: HashMap::new(),
            error: None,
        })
    }

    fn fail(&mut self, error: RpcError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Registers the handler for `method`.
    pub fn handler<F>(mut self, method: &str, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Option<Value>, ServiceError> + Send + Sync + 'static,
    {
        match self.methods.iter().find(|m| m.name == method) {
            Some(desc) => {
                let entry = DispatchEntry {
                    method: desc.clone(),
                    handler: Arc::new(handler),
                };
                self.table.insert(method.to_string(), entry);
            }
            None => {
                let error = RpcError::UnknownMethod {
                    service: self.service.clone(),
                    method: method.to_string(),
                };
                self.fail(error);
            }
        }
        self
    }

    fn extends(&self, service: &str) -> bool {
        self.registry
            .schema()
            .parents(&self.service)
            .map(|chain| chain.iter().any(|s| s.name == service))
            .unwrap_or(false)
    }

    /// Takes over the dispatch entries of a processor for an ancestor
    /// service. Entries already registered here are kept.
    pub fn inherit(mut self, parent: &Processor) -> Self {
        if !self.extends(&parent.service) {
            let error = RpcError::NotAParent {
                service: self.service.clone(),
                parent: parent.service.clone(),
            };
            self.fail(error);
            return self;
        }
        for (name, entry) in &parent.table {
            self.table
                .entry(name.clone())
                .or_insert_with(|| entry.clone());
        }
        self
    }

    /// Registers a [`Multiface`] for every method served by at least one of
    /// `processors`, calling their handlers in the order given.
    ///
    /// Each processor serves this service or one of its ancestors. Fanned
    /// out methods replace handlers registered earlier.
    pub fn fan_out(mut self, processors: &[Processor]) -> Self {
        let mut fans: HashMap<&str, Multiface> = HashMap::new();
        for processor in processors {
            if processor.service != self.service && !self.extends(&processor.service) {
                let error = RpcError::NotAParent {
                    service: self.service.clone(),
                    parent: processor.service.clone(),
                };
                self.fail(error);
                return self;
            }
            for (name, entry) in &processor.table {
                fans.entry(name.as_str())
                    .or_default()
                    .push(entry.handler.clone());
            }
        }
        for method in &self.methods {
            if let Some(fan) = fans.remove(method.name.as_str()) {
                tracing::debug!(
                    "{}.{}: fanning out to {} handlers",
                    self.service,
                    method.name,
                    fan.len()
                );
                let entry = DispatchEntry {
                    method: method.clone(),
                    handler: fan.into_handler(),
                };
                self.table.insert(method.name.clone(), entry);
            }
        }
        self
    }

    pub fn build(self) -> Result<Processor, RpcError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if let Some(missing) = self.methods.iter().find(|m| !self.table.contains_key(&m.name)) {
            return Err(RpcError::MissingHandler {
                service: self.service,
                method: missing.name.clone(),
            });
        }
        tracing::debug!(
            "{}: dispatch table with {} methods",
            self.service,
            self.table.len()
        );
        Ok(Processor {
            registry: self.registry,
            service: self.service,
            table: self.table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ServiceClient;
    use crate::error::CallError;
    use parking_lot::Mutex;
    use ridl_schema::Schema;

    const SCHEMA: &str = r#"
structs:
  - name: Point
    fields:
      - {id: 1, name: x, type: i32, requiredness: required}
      - {id: 2, name: y, type: i32, requiredness: required}
exceptions:
  - name: TooFar
    fields: [{id: 1, name: limit, type: i32}]
  - name: Invalid
    fields: [{id: 1, name: reason, type: string}]
services:
  - name: Base
    functions:
      - {name: ping}
      - {name: version, returns: string}
  - name: Geo
    extends: Base
    functions:
      - name: dist
        returns: i32
        args:
          - {id: 1, name: a, type: Point}
          - {id: 2, name: b, type: Point}
        throws:
          - {id: 1, name: far, type: TooFar}
          - {id: 2, name: invalid, type: Invalid}
      - {name: log, oneway: true, args: [{id: 1, name: line, type: string}]}
      - {name: origin, returns: Point}
"#;

    fn registry() -> Arc<CodecRegistry> {
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        Arc::new(CodecRegistry::compile(Arc::new(schema)).unwrap())
    }

    fn point(x: i32, y: i32) -> Value {
        StructValue::new("Point").with(1, x).with(2, y).into()
    }

    fn coords(v: &Value) -> (i32, i32) {
        let s = v.as_struct().unwrap();
        (
            s.get(1).and_then(Value::as_i32).unwrap(),
            s.get(2).and_then(Value::as_i32).unwrap(),
        )
    }

    fn dist(args: &[Value]) -> Result<Option<Value>, ServiceError> {
        let (ax, ay) = coords(&args[0]);
        let (bx, by) = coords(&args[1]);
        if ax < 0 || bx < 0 {
            return Err(ServiceError::other("negative coordinates"));
        }
        if (ax, ay) == (bx, by) {
            return Err(StructValue::new("Invalid").with(1, "same point").into());
        }
        let d = f64::from((bx - ax).pow(2) + (by - ay).pow(2)).sqrt() as i32;
        if d > 100 {
            return Err(StructValue::new("TooFar").with(1, 100).into());
        }
        Ok(Some(Value::I32(d)))
    }

    fn base_processor(registry: &Arc<CodecRegistry>) -> Processor {
        Processor::builder(registry.clone(), "Base")
            .unwrap()
            .handler("ping", |_| Ok(None))
            .handler("version", |_| Ok(Some(Value::from("1.0"))))
            .build()
            .unwrap()
    }

    fn geo_processor(registry: &Arc<CodecRegistry>, log: Arc<Mutex<Vec<String>>>) -> Processor {
        Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .inherit(&base_processor(registry))
            .handler("dist", dist)
            .handler("log", move |args| {
                log.lock().push(args[0].as_str().unwrap_or_default().to_string());
                Ok(None)
            })
            .handler("origin", |_| Ok(Some(point(0, 0))))
            .build()
            .unwrap()
    }

    fn setup() -> (Processor, ServiceClient, Arc<Mutex<Vec<String>>>) {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let processor = geo_processor(&registry, log.clone());
        let client = ServiceClient::new(registry, "Geo").unwrap();
        (processor, client, log)
    }

    fn call(
        processor: &Processor,
        client: &ServiceClient,
        method: &str,
        args: &[Value],
    ) -> Result<Option<Value>, CallError> {
        client.call(method, args, |request| {
            processor.process_message(request).map_err(CallError::from)
        })
    }

    /// Sends one call and decodes the raw reply without the client stub.
    fn raw_reply(
        processor: &Processor,
        client: &ServiceClient,
        method: &str,
        args: &[Value],
    ) -> (MessageHeader, BinaryReader) {
        let mut writer = BinaryWriter::new();
        client.send(method, args, &mut writer).unwrap();
        let reply = processor
            .process_message(writer.into_bytes().freeze())
            .unwrap()
            .unwrap();
        let mut reader = BinaryReader::new(reply);
        let header = reader.read_message_begin().unwrap();
        (header, reader)
    }

    fn message<F>(name: &str, message_type: MessageType, seq_id: i32, body: F) -> Bytes
    where
        F: FnOnce(&mut BinaryWriter),
    {
        let mut w = BinaryWriter::new();
        w.write_message_begin(&MessageHeader::new(name, message_type, seq_id))
            .unwrap();
        body(&mut w);
        w.write_message_end().unwrap();
        w.into_bytes().freeze()
    }

    fn read_exception(reply: Bytes) -> (MessageHeader, ApplicationException) {
        let mut reader = BinaryReader::new(reply);
        let header = reader.read_message_begin().unwrap();
        (header, ApplicationException::read(&mut reader).unwrap())
    }

    #[test]
    fn test_geo_dist_scenario() {
        let (processor, client, _) = setup();

        let mut writer = BinaryWriter::new();
        let seq_id = client
            .send("dist", &[point(0, 0), point(3, 4)], &mut writer)
            .unwrap();
        let request = writer.into_bytes().freeze();

        let mut reader = BinaryReader::new(request.clone());
        let header = reader.read_message_begin().unwrap();
        assert_eq!(header.name, "dist");
        assert_eq!(header.message_type, MessageType::Call);
        assert_eq!(header.seq_id, seq_id);

        let reply = processor.process_message(request).unwrap().unwrap();
        let mut reader = BinaryReader::new(reply.clone());
        let header = reader.read_message_begin().unwrap();
        assert_eq!(header.message_type, MessageType::Reply);
        assert_eq!(header.seq_id, seq_id);
        let result = processor
            .registry()
            .read_struct("Geo_dist_result", &mut reader)
            .unwrap();
        assert_eq!(result.get(SUCCESS_FIELD_ID), Some(&Value::I32(5)));
        assert!(!result.is_set(1));
        assert!(!result.is_set(2));

        let mut reader = BinaryReader::new(reply);
        let value = client.recv("dist", seq_id, &mut reader).unwrap();
        assert_eq!(value, Some(Value::I32(5)));
    }

    #[test]
    fn test_result_has_exactly_one_field() {
        let (processor, client, _) = setup();
        let cases = [
            (point(0, 0), point(3, 4), SUCCESS_FIELD_ID),
            (point(0, 0), point(300, 400), 1),
            (point(2, 2), point(2, 2), 2),
        ];
        for (a, b, expected) in cases {
            let (header, mut reader) = raw_reply(&processor, &client, "dist", &[a, b]);
            assert_eq!(header.message_type, MessageType::Reply);
            let result = processor
                .registry()
                .read_struct("Geo_dist_result", &mut reader)
                .unwrap();
            assert_eq!(result.len(), 1);
            assert!(result.is_set(expected));
        }
    }

    #[test]
    fn test_declared_exception() {
        let (processor, client, _) = setup();
        let err = call(&processor, &client, "dist", &[point(0, 0), point(300, 400)]).unwrap_err();
        match err {
            CallError::Declared {
                name,
                field,
                exception,
            } => {
                assert_eq!(name, "TooFar");
                assert_eq!(field, "far");
                assert_eq!(exception.get(1), Some(&Value::I32(100)));
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = call(&processor, &client, "dist", &[point(1, 1), point(1, 1)]).unwrap_err();
        assert_eq!(err.declared().map(|(name, _)| name), Some("Invalid"));
    }

    #[test]
    fn test_undeclared_failure_is_internal_error() {
        let (processor, client, _) = setup();
        let err = call(&processor, &client, "dist", &[point(-1, 0), point(3, 4)]).unwrap_err();
        let app = err.application().unwrap();
        assert_eq!(app.kind, ApplicationExceptionKind::InternalError);
        assert!(app.message.contains("negative coordinates"));

        // the processor keeps serving
        let value = call(&processor, &client, "dist", &[point(0, 0), point(6, 8)]).unwrap();
        assert_eq!(value, Some(Value::I32(10)));
    }

    #[test]
    fn test_unknown_method_then_valid_call() {
        let (processor, client, _) = setup();
        let request = message("nope", MessageType::Call, 42, |w| {
            w.write_struct_begin("nope_args").unwrap();
            w.write_field_begin("a", WireType::List, 1).unwrap();
            w.write_list_begin(WireType::String, 1).unwrap();
            w.write_string("ignored").unwrap();
            w.write_field_stop().unwrap();
        });
        let reply = processor.process_message(request).unwrap().unwrap();
        let (header, e) = read_exception(reply);
        assert_eq!(header.message_type, MessageType::Exception);
        assert_eq!(header.seq_id, 42);
        assert_eq!(header.name, "nope");
        assert_eq!(e.kind, ApplicationExceptionKind::UnknownMethod);

        let value = call(&processor, &client, "dist", &[point(0, 0), point(3, 4)]).unwrap();
        assert_eq!(value, Some(Value::I32(5)));
    }

    #[test]
    fn test_invalid_message_type() {
        let (processor, _, _) = setup();
        let request = message("dist", MessageType::Reply, 7, |w| {
            w.write_field_stop().unwrap();
        });
        let reply = processor.process_message(request).unwrap().unwrap();
        let (header, e) = read_exception(reply);
        assert_eq!(header.seq_id, 7);
        assert_eq!(e.kind, ApplicationExceptionKind::InvalidMessageType);
    }

    #[test]
    fn test_bad_args_reply_protocol_error() {
        let (processor, _, _) = setup();
        let request = message("dist", MessageType::Call, 3, |w| {
            w.write_field_begin("a", WireType::Struct, 1).unwrap();
            w.write_field_begin("x", WireType::I32, 1).unwrap();
            w.write_i32(1).unwrap();
            // y is required but missing
            w.write_field_stop().unwrap();
            w.write_field_stop().unwrap();
        });
        let reply = processor.process_message(request).unwrap().unwrap();
        let (header, e) = read_exception(reply);
        assert_eq!(header.seq_id, 3);
        assert_eq!(e.kind, ApplicationExceptionKind::ProtocolError);
    }

    #[test]
    fn test_oneway_never_replies() {
        let (processor, client, log) = setup();
        let mut writer = BinaryWriter::new();
        client
            .send("log", &[Value::from("hello")], &mut writer)
            .unwrap();
        let reply = processor
            .process_message(writer.into_bytes().freeze())
            .unwrap();
        assert!(reply.is_none());

        let value = call(&processor, &client, "log", &[Value::from("again")]).unwrap();
        assert_eq!(value, None);
        assert_eq!(*log.lock(), vec!["hello".to_string(), "again".to_string()]);
    }

    #[test]
    fn test_void_and_inherited_methods() {
        let (processor, client, _) = setup();
        assert_eq!(call(&processor, &client, "ping", &[]).unwrap(), None);
        assert_eq!(
            call(&processor, &client, "version", &[]).unwrap(),
            Some(Value::from("1.0"))
        );
        assert_eq!(client.parent().map(|p| p.service()), Some("Base"));
        assert_eq!(
            processor.methods(),
            vec!["dist", "log", "origin", "ping", "version"]
        );
    }

    #[test]
    fn test_derived_handler_overrides_inherited() {
        let registry = registry();
        let processor = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .handler("version", |_| Ok(Some(Value::from("2.0"))))
            .inherit(&base_processor(&registry))
            .handler("dist", dist)
            .handler("log", |_| Ok(None))
            .handler("origin", |_| Ok(Some(point(1, 1))))
            .build()
            .unwrap();
        let client = ServiceClient::new(registry, "Geo").unwrap();
        assert_eq!(
            call(&processor, &client, "version", &[]).unwrap(),
            Some(Value::from("2.0"))
        );
    }

    #[test]
    fn test_fan_out_returns_last_result() {
        let registry = registry();
        let log = Arc::new(Mutex::new(Vec::new()));
        let null = Processor::null(registry.clone(), "Geo").unwrap();
        let geo = geo_processor(&registry, log.clone());
        let client = ServiceClient::new(registry.clone(), "Geo").unwrap();

        let processor = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .fan_out(&[null.clone(), geo.clone()])
            .build()
            .unwrap();
        assert_eq!(
            call(&processor, &client, "dist", &[point(0, 0), point(3, 4)]).unwrap(),
            Some(Value::I32(5))
        );

        let processor = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .fan_out(&[geo.clone(), null])
            .build()
            .unwrap();
        assert_eq!(
            call(&processor, &client, "dist", &[point(0, 0), point(3, 4)]).unwrap(),
            Some(Value::I32(0))
        );
        // the first handler's declared exception ends the call
        let err = call(&processor, &client, "dist", &[point(0, 0), point(300, 400)]).unwrap_err();
        assert_eq!(err.declared().map(|(name, _)| name), Some("TooFar"));

        let processor = Processor::builder(registry, "Geo")
            .unwrap()
            .fan_out(&[geo.clone(), geo])
            .build()
            .unwrap();
        call(&processor, &client, "log", &[Value::from("twice")]).unwrap();
        assert_eq!(*log.lock(), vec!["twice".to_string(), "twice".to_string()]);
    }

    #[test]
    fn test_fan_out_through_parent() {
        let registry = registry();
        let newer = Processor::builder(registry.clone(), "Base")
            .unwrap()
            .handler("ping", |_| Ok(None))
            .handler("version", |_| Ok(Some(Value::from("2.0"))))
            .build()
            .unwrap();
        let processor = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .fan_out(&[base_processor(&registry), newer])
            .handler("dist", dist)
            .handler("log", |_| Ok(None))
            .handler("origin", |_| Ok(Some(point(0, 0))))
            .build()
            .unwrap();
        let client = ServiceClient::new(registry.clone(), "Geo").unwrap();
        assert_eq!(
            call(&processor, &client, "version", &[]).unwrap(),
            Some(Value::from("2.0"))
        );

        let geo = Processor::null(registry.clone(), "Geo").unwrap();
        let not_parent = Processor::builder(registry, "Base")
            .unwrap()
            .fan_out(&[geo])
            .build();
        assert!(matches!(not_parent, Err(RpcError::NotAParent { .. })));
    }

    #[test]
    fn test_builder_errors() {
        let registry = registry();
        let missing = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .handler("dist", dist)
            .build();
        assert!(matches!(missing, Err(RpcError::MissingHandler { .. })));

        let unknown = Processor::builder(registry.clone(), "Base")
            .unwrap()
            .handler("nope", |_| Ok(None))
            .build();
        assert!(matches!(unknown, Err(RpcError::UnknownMethod { .. })));

        let geo = Processor::null(registry.clone(), "Geo").unwrap();
        let not_parent = Processor::builder(registry.clone(), "Base")
            .unwrap()
            .inherit(&geo)
            .build();
        assert!(matches!(not_parent, Err(RpcError::NotAParent { .. })));

        assert!(Processor::builder(registry, "Missing").is_err());
    }

    #[test]
    fn test_bad_handler_values() {
        let registry = registry();
        let processor = Processor::builder(registry.clone(), "Geo")
            .unwrap()
            .inherit(&base_processor(&registry))
            .handler("dist", |_| Err(StructValue::new("Point").into()))
            .handler("log", |_| Ok(None))
            .handler("origin", |_| Ok(Some(Value::I32(1))))
            .build()
            .unwrap();
        let client = ServiceClient::new(registry, "Geo").unwrap();

        for (method, args) in [
            ("origin", vec![]),
            ("dist", vec![point(0, 0), point(1, 1)]),
        ] {
            let err = call(&processor, &client, method, &args).unwrap_err();
            assert_eq!(
                err.application().map(|e| e.kind),
                Some(ApplicationExceptionKind::InternalError)
            );
        }
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let registry = registry();
        let processor = Processor::builder(registry.clone(), "Base")
            .unwrap()
            .handler("ping", |_| panic!("boom"))
            .handler("version", |_| Ok(Some(Value::from("1.0"))))
            .build()
            .unwrap();
        let client = ServiceClient::new(registry, "Base").unwrap();

        let err = call(&processor, &client, "ping", &[]).unwrap_err();
        assert!(err.application().is_some());
        assert!(call(&processor, &client, "version", &[]).is_ok());
    }

    #[test]
    fn test_null_processor() {
        let registry = registry();
        let processor = Processor::null(registry.clone(), "Geo").unwrap();
        let client = ServiceClient::new(registry, "Geo").unwrap();

        assert_eq!(
            call(&processor, &client, "dist", &[point(0, 0), point(3, 4)]).unwrap(),
            Some(Value::I32(0))
        );
        assert_eq!(
            call(&processor, &client, "origin", &[]).unwrap(),
            Some(point(0, 0))
        );
        assert_eq!(
            call(&processor, &client, "version", &[]).unwrap(),
            Some(Value::from(""))
        );
        assert_eq!(call(&processor, &client, "ping", &[]).unwrap(), None);
    }
}
