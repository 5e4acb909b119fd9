//! TCP server implementation.
//!
//! Each connection carries a sequence of frames, one message per frame.
//! Complete messages are handed to the [`Process`] implementation on the
//! blocking pool, and any reply is framed and written back before the next
//! message on that connection is read.

use crate::config::NetworkConfig;
use crate::error::ServerError;
use ridl_protocol::{Encoder, FrameDecoder, MAX_PAYLOAD_SIZE};
use ridl_rpc::Process;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Largest accepted frame payload.
    pub max_frame_bytes: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for ServerConfig {
    fn from(network: &NetworkConfig) -> Self {
        Self {
            bind_addr: network.bind_addr,
            idle_timeout: network.idle_timeout(),
            max_connections: network.max_connections,
            max_frame_bytes: network.max_frame_bytes.min(MAX_PAYLOAD_SIZE),
        }
    }
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Server statistics.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub connections_total: AtomicU64,
    pub connections_active: AtomicU64,
    pub connections_rejected: AtomicU64,
    pub requests_total: AtomicU64,
    pub errors_total: AtomicU64,
}

/// TCP server for one service.
pub struct Server {
    config: ServerConfig,
    processor: Arc<dyn Process>,
    stats: Arc<ServerStats>,
    shutdown: broadcast::Sender<()>,
    running: AtomicBool,
}

impl Server {
    /// Creates a new server dispatching to `processor`.
    pub fn new(config: ServerConfig, processor: Arc<dyn Process>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            processor,
            stats: Arc::new(ServerStats::default()),
            shutdown: shutdown_tx,
            running: AtomicBool::new(false),
        }
    }

    /// Binds the configured address and runs the server.
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Runs the accept loop on an already bound listener until
    /// [`Server::shutdown`] is called.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        self.running.store(true, Ordering::SeqCst);

        tracing::info!(
            "Serving {} on {}",
            self.processor.service(),
            listener.local_addr()?
        );

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((tcp_stream, addr)) => {
                            if self.stats.connections_active.load(Ordering::Relaxed)
                                >= self.config.max_connections as u64
                            {
                                tracing::warn!("Connection limit reached, rejecting {}", addr);
                                self.stats.connections_rejected.fetch_add(1, Ordering::Relaxed);
                                continue;
                            }

                            self.stats.connections_total.fetch_add(1, Ordering::Relaxed);
                            self.stats.connections_active.fetch_add(1, Ordering::Relaxed);

                            let processor = self.processor.clone();
                            let stats = self.stats.clone();
                            let config = self.config.clone();
                            let mut conn_shutdown = self.shutdown.subscribe();

                            tokio::spawn(async move {
                                let result = Self::handle_connection(
                                    tcp_stream,
                                    addr,
                                    processor,
                                    stats.clone(),
                                    config,
                                    &mut conn_shutdown,
                                )
                                .await;

                                if let Err(e) = result {
                                    tracing::debug!("Connection {} error: {}", addr, e);
                                    stats.errors_total.fetch_add(1, Ordering::Relaxed);
                                }

                                stats.connections_active.fetch_sub(1, Ordering::Relaxed);
                                tracing::info!("Client disconnected: {}", addr);
                            });
                        }
                        Err(e) => {
                            tracing::error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Server shutting down");
                    break;
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Reads frames until the peer closes, the connection idles out or the
    /// server shuts down.
    async fn handle_connection(
        mut stream: TcpStream,
        addr: SocketAddr,
        processor: Arc<dyn Process>,
        stats: Arc<ServerStats>,
        config: ServerConfig,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!("Client connected: {}", addr);

        let mut decoder = FrameDecoder::with_max_payload(config.max_frame_bytes);
        let mut buf = [0u8; 8192];

        loop {
            tokio::select! {
                result = stream.read(&mut buf) => {
                    match result {
                        Ok(0) => {
                            tracing::debug!("[{}] Connection closed by client", addr);
                            return Ok(());
                        }
                        Ok(n) => {
                            tracing::debug!("[{}] Received {} bytes", addr, n);
                            decoder.extend(&buf[..n]);
                        }
                        Err(e) => {
                            tracing::debug!("[{}] Read error: {}", addr, e);
                            return Err(ServerError::Io(e));
                        }
                    }
                }

                _ = tokio::time::sleep(config.idle_timeout) => {
                    tracing::debug!("[{}] Idle timeout", addr);
                    return Ok(());
                }

                _ = shutdown.recv() => {
                    tracing::debug!("[{}] Shutdown signal received", addr);
                    return Err(ServerError::ShuttingDown);
                }
            }

            while let Some(message) = decoder.decode_message()? {
                stats.requests_total.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("[{}] Message: {} bytes", addr, message.len());

                let processor = processor.clone();
                let reply = tokio::task::spawn_blocking(move || processor.process_message(message))
                    .await
                    .map_err(|e| ServerError::Handler(e.to_string()))?;

                match reply {
                    Ok(Some(reply)) => {
                        let frame = Encoder::encode_payload(reply)?;
                        stream.write_all(&frame).await?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("[{}] Dropping connection after malformed message: {}", addr, e);
                        return Err(e.into());
                    }
                }
            }
        }
    }

    /// Initiates server shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Returns whether the server is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns server statistics.
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
