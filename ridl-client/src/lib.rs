//! # ridl-client
//!
//! Client library for ridl.
//!
//! This crate provides:
//! - Async TCP connection with connect and request timeouts
//! - [`Client`], which drives a [`ServiceClient`](ridl_rpc::ServiceClient)
//!   stub over one connection

pub mod client;
pub mod connection;
pub mod error;

pub use client::Client;
pub use connection::{Connection, ConnectionConfig};
pub use error::ClientError;
