//! ridl-cli - Command-line interface for ridl
//!
//! Checks schemas, prints fingerprints, generates Rust bindings, encodes and
//! decodes structs, and calls methods on a running server.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ridl-cli")]
#[command(about = "Command-line interface for ridl schemas and services")]
#[command(version)]
pub struct Cli {
    /// Schema document (YAML or JSON)
    #[arg(short, long, env = "RIDL_SCHEMA")]
    schema: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate the schema and print a summary
    Check,

    /// Print structural fingerprints
    Fingerprint {
        /// Only this struct
        name: Option<String>,

        /// Include synthetic args/result structs
        #[arg(long)]
        all: bool,
    },

    /// Generate Rust bindings
    Gen {
        /// Output directory
        #[arg(short, long, default_value = "src")]
        out: PathBuf,

        /// Module name (defaults to the last segment of the namespace)
        #[arg(short, long)]
        module: Option<String>,

        /// Skip the server skeletons
        #[arg(long)]
        no_skeleton: bool,
    },

    /// Encode a struct given as JSON (or @file.json) and print it as hex
    Encode {
        /// Struct name
        name: String,

        /// Struct JSON
        value: String,
    },

    /// Decode a hex-encoded struct and print it as JSON
    Decode {
        /// Struct name
        name: String,

        /// Encoded bytes, hex
        hex: String,
    },

    /// Call a method on a running server
    Call {
        /// Server address
        #[arg(short = 'a', long, default_value = "127.0.0.1:9090", env = "RIDL_SERVER")]
        server: SocketAddr,

        /// Service (required when the schema declares several)
        #[arg(long, env = "RIDL_SERVICE")]
        service: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "30")]
        timeout: u64,

        /// Method name
        method: String,

        /// Positional arguments, one JSON value (or @file.json) each
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match commands::execute(&cli.schema, cli.command).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
