//! High-level client API.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use ridl_codec::{CodecRegistry, Value};
use ridl_protocol::{BinaryReader, BinaryWriter};
use ridl_rpc::{RpcError, ServiceClient};
use std::sync::Arc;

/// Calls the methods of one service over one connection.
pub struct Client {
    conn: Arc<Connection>,
    stub: ServiceClient,
}

impl Client {
    /// Creates a client for `service` (not yet connected).
    pub fn new(
        config: ConnectionConfig,
        registry: Arc<CodecRegistry>,
        service: &str,
    ) -> Result<Self, ClientError> {
        Ok(Self::with_stub(config, ServiceClient::new(registry, service)?))
    }

    pub fn with_stub(config: ConnectionConfig, stub: ServiceClient) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
            stub,
        }
    }

    /// Connects to the server.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    pub fn stub(&self) -> &ServiceClient {
        &self.stub
    }

    /// Calls `method` with positional arguments.
    ///
    /// Returns the success value, or `None` for void and oneway methods.
    /// Oneway calls return as soon as the request is written.
    pub async fn call(&self, method: &str, args: &[Value]) -> Result<Option<Value>, ClientError> {
        let oneway = self
            .stub
            .method(method)
            .ok_or_else(|| RpcError::UnknownMethod {
                service: self.stub.service().to_string(),
                method: method.to_string(),
            })?
            .oneway;

        let mut writer = BinaryWriter::new();
        let seq_id = self.stub.send(method, args, &mut writer)?;
        let request = writer.into_bytes().freeze();

        if oneway {
            self.conn.send(request).await?;
            return Ok(None);
        }

        let reply = self.conn.request(request).await?;
        let mut reader = BinaryReader::new(reply);
        Ok(self.stub.recv(method, seq_id, &mut reader)?)
    }
}
