//! BlinkDB server entry point.
//!
//! Sets up logging, loads the snapshot file, serves clients until
//! interrupted, and writes the snapshot back on the way out.

use blinkdb::commands::CommandHandler;
use blinkdb::connection::{handle_connection, ConnectionStats};
use blinkdb::storage::{StorageEngine, DEFAULT_CAPACITY, DEFAULT_DATA_FILE};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Maximum number of live keys
    capacity: usize,
    /// Snapshot file path
    data_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: blinkdb::DEFAULT_HOST.to_string(),
            port: blinkdb::DEFAULT_PORT,
            capacity: DEFAULT_CAPACITY,
            data_file: DEFAULT_DATA_FILE.to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = Self::take_value(&args, i);
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = Self::take_value(&args, i).parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--capacity" | "-c" => {
                    config.capacity = Self::take_value(&args, i).parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid capacity");
                        std::process::exit(1);
                    });
                    i += 2;
                }
                "--data-file" | "-d" => {
                    config.data_file = Self::take_value(&args, i);
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("BlinkDB version {}", blinkdb::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn take_value(args: &[String], i: usize) -> String {
        match args.get(i + 1) {
            Some(value) => value.clone(),
            None => {
                eprintln!("Error: {} requires a value", args[i]);
                std::process::exit(1);
            }
        }
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
BlinkDB - An In-Memory Key-Value Store with Typed Values

USAGE:
    blinkdb [OPTIONS]

OPTIONS:
    -h, --host <HOST>         Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>         Port to listen on (default: 9001)
    -c, --capacity <KEYS>     Maximum live keys before eviction (default: 1000)
    -d, --data-file <PATH>    Snapshot file (default: blinkdb_data.txt)
    -v, --version             Print version information
        --help                Print this help message

CONNECTING:
    Commands are plain lines terminated by CRLF:
    $ nc 127.0.0.1 9001
    PING
    +PONG
    SET greet hello
    +OK
    GET greet
    $5
    hello
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    // Create the storage engine (shared across all connections)
    let storage = Arc::new(StorageEngine::with_capacity(config.capacity));
    info!(capacity = config.capacity, "storage engine initialized");

    // Load the snapshot; a missing or unreadable file means an empty store
    match storage.load_file(&config.data_file) {
        Ok(loaded) => info!(keys = loaded, file = %config.data_file, "snapshot loaded"),
        Err(e) => warn!(file = %config.data_file, error = %e, "no snapshot loaded"),
    }

    let stats = Arc::new(ConnectionStats::new());

    // A bind failure is fatal; the `?` exits non-zero before serving
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("listening on {}", config.bind_address());

    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("shutdown signal received, stopping server");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), stats) => {}
        _ = shutdown => {}
    }

    // Snapshot on the way out; failure is logged, not fatal
    match storage.save_file(&config.data_file) {
        Ok(written) => info!(keys = written, file = %config.data_file, "snapshot saved"),
        Err(e) => error!(file = %config.data_file, error = %e, "failed to save snapshot"),
    }

    info!("server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("failed to accept connection: {}", e);
            }
        }
    }
}
