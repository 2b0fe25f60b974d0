//! SSMP Server Binary
//!
//! Starts the TCP server for SSMP.

use std::sync::Arc;
use std::thread;

use clap::Parser;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use ssmp::{Config, Engine, Server, ShutdownHandle, Store};
use tracing_subscriber::{fmt, EnvFilter};

/// SSMP Server
#[derive(Parser, Debug)]
#[command(name = "ssmp-server")]
#[command(about = "In-memory key-value store speaking SSMP")]
#[command(version)]
struct Args {
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind
    #[arg(short, long, default_value_t = 6380)]
    port: u16,

    /// Largest accepted request payload in MB
    #[arg(short = 'm', long, default_value_t = 16)]
    max_payload_mb: u32,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ssmp=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("SSMP Server v{}", ssmp::VERSION);

    let config = Config::builder()
        .host_port(&args.host, args.port)
        .max_payload_size(args.max_payload_mb.saturating_mul(1024 * 1024))
        .build();

    let store = Arc::new(Store::new());
    let engine = Arc::new(Engine::new(store));

    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = install_signal_handler(server.shutdown_handle()) {
        tracing::error!("Failed to install signal handler: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Stop the accept loop on SIGINT/SIGTERM
fn install_signal_handler(handle: ShutdownHandle) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    thread::Builder::new()
        .name("ssmp-signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                tracing::info!(signal, "Received signal, shutting down");
                handle.shutdown();
            }
        })?;

    Ok(())
}
