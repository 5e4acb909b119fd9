//! ridl - schema-driven RPC server
//!
//! Serves one service of a schema document over the ridl binary protocol,
//! answering every call with the zero value of the method's return type.

use ridl_server::{null_processor, Config, Server, ServerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if RIDL_CONFIG is set, then env overrides)
    let config_path = std::env::var("RIDL_CONFIG").ok();
    let config = match Config::load() {
        Ok(c) => {
            if let Some(path) = &config_path {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    tracing::info!("Starting ridl server");
    tracing::info!("  Bind address: {}", config.network.bind_addr);
    tracing::info!("  Max connections: {}", config.network.max_connections);
    tracing::info!("  Idle timeout: {}s", config.network.idle_timeout_secs);

    let processor = match null_processor(&config.service) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Failed to load service: {}", e);
            return Err(e.into());
        }
    };

    let server = Arc::new(Server::new(
        ServerConfig::from(&config.network),
        Arc::new(processor),
    ));

    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Blocks until shutdown
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
