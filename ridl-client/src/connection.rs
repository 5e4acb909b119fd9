//! Connection management.
//!
//! One request is in flight at a time: the stream and its frame decoder
//! sit behind a single lock that is held from the write of a request until
//! its reply frame is decoded.

use crate::error::ClientError;
use bytes::Bytes;
use ridl_protocol::{Encoder, FrameDecoder, MAX_PAYLOAD_SIZE};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Time allowed for one request/reply exchange.
    pub request_timeout: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
    /// Largest reply payload accepted.
    pub max_frame_bytes: u32,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_bytes: MAX_PAYLOAD_SIZE,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    pub fn with_max_frame_bytes(mut self, max: u32) -> Self {
        self.max_frame_bytes = max.clamp(1, MAX_PAYLOAD_SIZE);
        self
    }
}

struct Link {
    stream: TcpStream,
    decoder: FrameDecoder,
}

/// A connection to a ridl server.
pub struct Connection {
    config: ConnectionConfig,
    link: Mutex<Option<Link>>,
    connected: AtomicBool,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            link: Mutex::new(None),
            connected: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects to the server, replacing any existing stream.
    pub async fn connect(&self) -> Result<(), ClientError> {
        tracing::debug!("Connecting to {}...", self.config.addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        .map_err(|_| {
            tracing::debug!("Connection timeout");
            ClientError::Timeout
        })?
        .map_err(|e| {
            tracing::debug!("Connection failed: {}", e);
            ClientError::Io(e)
        })?;

        stream.set_nodelay(true).ok();

        *self.link.lock().await = Some(Link {
            stream,
            decoder: FrameDecoder::with_max_payload(self.config.max_frame_bytes),
        });
        self.connected.store(true, Ordering::SeqCst);

        tracing::debug!("Connected to {}", self.config.addr);
        Ok(())
    }

    /// Returns whether the connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Sends one message without waiting for a reply (oneway calls).
    pub async fn send(&self, message: Bytes) -> Result<(), ClientError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let frame = Encoder::encode_payload(message)?;
        let result =
            tokio::time::timeout(self.config.request_timeout, write_frame(link, &frame)).await;

        match result {
            Ok(Ok(())) => {
                tracing::debug!("Sent {} byte frame", frame.len());
                Ok(())
            }
            Ok(Err(e)) => {
                self.reset(&mut guard);
                Err(ClientError::Io(e))
            }
            Err(_) => {
                self.reset(&mut guard);
                Err(ClientError::Timeout)
            }
        }
    }

    /// Sends one message and waits for the next reply frame.
    ///
    /// On any failure the stream is dropped: a late reply would otherwise
    /// be taken as the answer to the following request.
    pub async fn request(&self, message: Bytes) -> Result<Bytes, ClientError> {
        let mut guard = self.link.lock().await;
        let link = guard.as_mut().ok_or(ClientError::NotConnected)?;

        let frame = Encoder::encode_payload(message)?;
        let result = tokio::time::timeout(
            self.config.request_timeout,
            exchange(link, &frame, self.config.read_buffer_size),
        )
        .await;

        match result {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                self.reset(&mut guard);
                Err(e)
            }
            Err(_) => {
                tracing::debug!("Request timed out");
                self.reset(&mut guard);
                Err(ClientError::Timeout)
            }
        }
    }

    fn reset(&self, link: &mut Option<Link>) {
        self.connected.store(false, Ordering::SeqCst);
        *link = None;
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        tracing::debug!("Closing connection...");
        self.connected.store(false, Ordering::SeqCst);

        if let Some(mut link) = self.link.lock().await.take() {
            let _ = link.stream.shutdown().await;
        }

        tracing::debug!("Connection closed");
        Ok(())
    }
}

async fn write_frame(link: &mut Link, frame: &[u8]) -> std::io::Result<()> {
    link.stream.write_all(frame).await?;
    link.stream.flush().await
}

async fn exchange(link: &mut Link, frame: &[u8], buffer_size: usize) -> Result<Bytes, ClientError> {
    write_frame(link, frame).await?;
    tracing::debug!("Request sent ({} bytes), waiting for reply...", frame.len());

    let mut buf = vec![0u8; buffer_size];
    loop {
        if let Some(reply) = link.decoder.decode_message()? {
            tracing::debug!("Reply received ({} bytes)", reply.len());
            return Ok(reply);
        }

        let n = link.stream.read(&mut buf).await?;
        if n == 0 {
            tracing::debug!("Connection closed (0 bytes)");
            return Err(ClientError::ConnectionClosed);
        }
        link.decoder.extend(&buf[..n]);
    }
}
