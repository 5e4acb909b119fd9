//! Client stub.
//!
//! A call is split into `send` (write the args struct as a CALL or ONEWAY
//! message) and `recv` (read the reply and resolve the result struct). A
//! client for a derived service holds a client for its parent and forwards
//! inherited methods to it.

use crate::descriptor::{MethodDescriptor, ServiceDescriptor};
use crate::error::{CallError, RpcError};
use bytes::Bytes;
use ridl_codec::{CodecRegistry, Value};
use ridl_protocol::{
    ApplicationException, ApplicationExceptionKind, BinaryReader, BinaryWriter, MessageHeader,
    MessageType, ProtocolReader, ProtocolWriter,
};
use ridl_schema::SUCCESS_FIELD_ID;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Client stub for one service.
#[derive(Debug)]
pub struct ServiceClient {
    registry: Arc<CodecRegistry>,
    descriptor: ServiceDescriptor,
    parent: Option<Box<ServiceClient>>,
    /// Shared with the parent chain.
    seq_id: Arc<AtomicI32>,
}

impl ServiceClient {
    pub fn new(registry: Arc<CodecRegistry>, service: &str) -> Result<Self, RpcError> {
        Self::with_seq_ids(registry, service, Arc::new(AtomicI32::new(0)))
    }

    fn with_seq_ids(
        registry: Arc<CodecRegistry>,
        service: &str,
        seq_id: Arc<AtomicI32>,
    ) -> Result<Self, RpcError> {
        let descriptor = ServiceDescriptor::new(&registry, service)?;
        let parent = match descriptor.extends() {
            Some(parent) => Some(Box::new(Self::with_seq_ids(
                registry.clone(),
                parent,
                seq_id.clone(),
            )?)),
            None => None,
        };
        Ok(Self {
            registry,
            descriptor,
            parent,
            seq_id,
        })
    }

    pub fn service(&self) -> &str {
        self.descriptor.name()
    }

    pub fn parent(&self) -> Option<&ServiceClient> {
        self.parent.as_deref()
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Looks up a method, inherited ones included.
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDescriptor>> {
        self.descriptor
            .method(name)
            .or_else(|| self.parent.as_ref()?.method(name))
    }

    /// All callable methods, root service first.
    pub fn methods(&self) -> Vec<&Arc<MethodDescriptor>> {
        let mut out = self
            .parent
            .as_ref()
            .map(|p| p.methods())
            .unwrap_or_default();
        out.extend(self.descriptor.methods());
        out
    }

    fn next_seq_id(&self) -> i32 {
        self.seq_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    fn unknown(&self, method: &str) -> RpcError {
        RpcError::UnknownMethod {
            service: self.service().to_string(),
            method: method.to_string(),
        }
    }

    /// Writes a request for `method`. Returns the sequence id used.
    pub fn send<W>(&self, method: &str, args: &[Value], writer: &mut W) -> Result<i32, CallError>
    where
        W: ProtocolWriter + ?Sized,
    {
        let Some(desc) = self.descriptor.method(method) else {
            return match &self.parent {
                Some(parent) => parent.send(method, args, writer),
                None => Err(self.unknown(method).into()),
            };
        };

        let args = desc.pack_args(args)?;
        let seq_id = self.next_seq_id();
        let message_type = if desc.oneway {
            MessageType::Oneway
        } else {
            MessageType::Call
        };

        writer.write_message_begin(&MessageHeader::new(desc.name.clone(), message_type, seq_id))?;
        self.registry.write_struct(&desc.args_struct, &args, writer)?;
        writer.write_message_end()?;
        writer.flush()?;

        tracing::debug!(
            "{}.{}: sent {} (seq={})",
            desc.service,
            desc.name,
            message_type,
            seq_id
        );
        Ok(seq_id)
    }

    /// Reads the reply to `method`. Returns the success value, or `None`
    /// for void methods. A sequence id other than `seq_id` is logged but
    /// accepted.
    pub fn recv<R>(&self, method: &str, seq_id: i32, reader: &mut R) -> Result<Option<Value>, CallError>
    where
        R: ProtocolReader + ?Sized,
    {
        let Some(desc) = self.descriptor.method(method) else {
            return match &self.parent {
                Some(parent) => parent.recv(method, seq_id, reader),
                None => Err(self.unknown(method).into()),
            };
        };
        let Some(result_struct) = &desc.result_struct else {
            return Err(RpcError::Oneway {
                method: desc.name.clone(),
            }
            .into());
        };

        let header = reader.read_message_begin()?;
        match header.message_type {
            MessageType::Exception => {
                let e = ApplicationException::read(reader)?;
                reader.read_message_end()?;
                reader.read_end()?;
                return Err(e.into());
            }
            MessageType::Reply => {}
            other => {
                return Err(ApplicationException::new(
                    ApplicationExceptionKind::InvalidMessageType,
                    format!("{} failed: unexpected {} message", desc.name, other),
                )
                .into());
            }
        }
        if header.name != desc.name {
            return Err(ApplicationException::new(
                ApplicationExceptionKind::WrongMethodName,
                format!("{} failed: wrong method name '{}'", desc.name, header.name),
            )
            .into());
        }
        if header.seq_id != seq_id {
            tracing::warn!(
                "{}: reply seq id {} does not match request {}",
                desc.name,
                header.seq_id,
                seq_id
            );
        }

        let mut result = self.registry.read_struct(result_struct, reader)?;
        reader.read_message_end()?;
        reader.read_end()?;

        if !desc.returns_void() {
            if let Some(success) = result.take(SUCCESS_FIELD_ID) {
                return Ok(Some(success));
            }
        }
        for slot in &desc.throws {
            if let Some(Value::Struct(exception)) = result.take(slot.id) {
                return Err(CallError::Declared {
                    name: slot.exception.clone(),
                    field: slot.field.clone(),
                    exception,
                });
            }
        }
        if desc.returns_void() {
            return Ok(None);
        }
        Err(ApplicationException::new(
            ApplicationExceptionKind::MissingResult,
            format!("{} failed: unknown result", desc.name),
        )
        .into())
    }

    /// Sends a request, hands it to `exchange` and reads the reply it
    /// returns. `exchange` returns `None` for oneway methods.
    pub fn call<F>(&self, method: &str, args: &[Value], exchange: F) -> Result<Option<Value>, CallError>
    where
        F: FnOnce(Bytes) -> Result<Option<Bytes>, CallError>,
    {
        let oneway = self
            .method(method)
            .ok_or_else(|| self.unknown(method))?
            .oneway;

        let mut writer = BinaryWriter::new();
        let seq_id = self.send(method, args, &mut writer)?;
        let reply = exchange(writer.into_bytes().freeze())?;
        if oneway {
            return Ok(None);
        }

        let reply = reply.ok_or_else(|| CallError::Transport(format!("no reply to {}", method)))?;
        let mut reader = BinaryReader::new(reply);
        self.recv(method, seq_id, &mut reader)
    }
}
