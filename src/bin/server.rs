//! LodeKV Server Binary
//!
//! Starts the event loop and flushes the snapshot on Ctrl+C.

use std::time::Duration;

use clap::Parser;
use lodekv::network::Server;
use lodekv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// LodeKV Server
#[derive(Parser, Debug)]
#[command(name = "lodekv-server")]
#[command(about = "Single-threaded RESP key-value server backed by a skip list")]
#[command(version)]
struct Args {
    /// Snapshot file (loaded at startup, written at shutdown)
    #[arg(short, long, default_value = "data.db")]
    snapshot: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Seconds of silence before a connection is closed
    #[arg(short = 't', long, default_value = "10")]
    idle_timeout_secs: u64,

    /// Maximum poll wait in milliseconds
    #[arg(short, long, default_value = "500")]
    poll_interval_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lodekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    tracing::info!("LodeKV Server v{}", lodekv::VERSION);
    tracing::info!("Snapshot file: {}", args.snapshot);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .snapshot_path(&args.snapshot)
        .listen_addr(&args.listen)
        .idle_timeout(Duration::from_secs(args.idle_timeout_secs))
        .poll_interval(Duration::from_millis(args.poll_interval_ms))
        .build();

    // Open engine (loads the snapshot)
    let engine = Engine::open(&config);
    tracing::info!("Engine initialized with {} keys", engine.store().len());

    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
