//! # ridl-server
//!
//! TCP server for ridl services.
//!
//! This crate provides:
//! - An async accept loop with a connection cap, idle timeout and shutdown
//! - Per-connection frame decoding and dispatch to a `ridl_rpc::Process`
//! - YAML / environment configuration
//! - Loading a schema file into a processor for the `ridl` binary

pub mod config;
pub mod error;
pub mod server;
pub mod service;

pub use config::{Config, ConfigError, NetworkConfig, ServiceConfig};
pub use error::ServerError;
pub use server::{Server, ServerConfig, ServerStats};
pub use service::{null_processor, select_service};
