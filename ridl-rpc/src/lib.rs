//! # ridl-rpc
//!
//! RPC layer for ridl services.
//!
//! - [`ServiceDescriptor`] / [`MethodDescriptor`]: per-method view of a
//!   service (synthetic args/result structs, argument slots, declared
//!   exceptions)
//! - [`ServiceClient`]: client stub with `send` / `recv` / `call`
//! - [`Processor`]: dispatch table and the process-one-call algorithm,
//!   behind the object-safe [`Process`] trait
//! - [`Multiface`]: one handler fanning a call out to several
//!
//! Handlers return `Result<Option<Value>, ServiceError>`. A
//! [`ServiceError::Declared`] exception is carried in the result struct;
//! anything else reaches the caller as an `ApplicationException`.

pub mod client;
pub mod descriptor;
pub mod error;
pub mod multiface;
pub mod processor;

pub use client::ServiceClient;
pub use descriptor::{
    flattened_methods, ArgDescriptor, MethodDescriptor, ServiceDescriptor, ThrowsDescriptor,
};
pub use error::{CallError, RpcError, ServiceError, StubError};
pub use multiface::Multiface;
pub use processor::{write_exception, Handler, Process, Processor, ProcessorBuilder};
