//! LineKV - A Minimal In-Memory Multi-Type Key-Value Store
//!
//! Main entry point for the LineKV server: argument parsing, logging
//! setup, snapshot load, the TCP accept loop, and graceful shutdown with
//! a snapshot save.

use linekv::commands::Dispatcher;
use linekv::connection::{handle_connection, ConnectionStats};
use linekv::storage::{self, Store};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Listen backlog, matching the original deployment's small queue.
const BACKLOG: u32 = 5;

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Where the snapshot dump file lives
    snapshot_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: linekv::DEFAULT_HOST.to_string(),
            port: linekv::DEFAULT_PORT,
            snapshot_path: PathBuf::from(linekv::DEFAULT_SNAPSHOT_PATH),
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
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--snapshot" | "-s" => {
                    if i + 1 < args.len() {
                        config.snapshot_path = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --snapshot requires a path");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("LineKV version {}", linekv::VERSION);
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

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
LineKV - A Minimal In-Memory Multi-Type Key-Value Store

USAGE:
    linekv [OPTIONS]

OPTIONS:
    -h, --host <HOST>        Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>        Port to listen on (default: 6380)
    -s, --snapshot <PATH>    Snapshot dump file (default: linekv-dump.json)
    -v, --version            Print version information
        --help               Print this help message

EXAMPLES:
    linekv                         # Start on 127.0.0.1:6380
    linekv --port 7000             # Start on port 7000
    linekv --host 0.0.0.0          # Listen on all interfaces

CONNECTING:
    Use the bundled client, or anything that can write lines to a socket:
    $ linekv-cli
    127.0.0.1:6380> PING
    PONG
    127.0.0.1:6380> SET name Johan
    OK
    127.0.0.1:6380> GET name
    Johan
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
    __    _          __ ___    __
   / /   (_)___  ___/ //_/ |  / /
  / /   / / __ \/ _ \ ,<  | | / /
 / /___/ / / / /  __/ /| | | |/ /
/_____/_/_/ /_/\___/_/ |_| |___/

LineKV v{} - In-Memory Multi-Type Key-Value Store
──────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        linekv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    print_banner(&config);

    // Rebuild the store from the dump file when one exists
    let store = storage::load_from_file(&config.snapshot_path);
    if !store.is_empty() {
        info!(keys = store.len(), "Store restored from snapshot");
    }
    let store = Arc::new(Mutex::new(store));

    // Connection statistics shared by all handlers
    let stats = Arc::new(ConnectionStats::new());

    // Bind the TCP listener with the protocol's socket options
    let listener = bind_listener(&config)?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&store), stats) => {}
        _ = shutdown => {}
    }

    // One last snapshot on the way out, under the same lock as commands
    save_snapshot(&store, &config.snapshot_path);

    info!("Server shutdown complete");
    Ok(())
}

/// Binds the listener with SO_REUSEADDR and the configured backlog.
fn bind_listener(config: &Config) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address {}: {}", config.bind_address(), e))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;

    Ok(socket.listen(BACKLOG)?)
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, store: Arc<Mutex<Store>>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                // Each connection gets its own dispatcher handle
                let dispatcher = Dispatcher::new(Arc::clone(&store));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, dispatcher, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Writes the shutdown snapshot; failure is logged, not fatal.
fn save_snapshot(store: &Arc<Mutex<Store>>, path: &std::path::Path) {
    let store = store.lock().unwrap_or_else(PoisonError::into_inner);
    match storage::save_to_file(&store, path) {
        Ok(()) => info!(path = %path.display(), keys = store.len(), "Snapshot written"),
        Err(e) => warn!(path = %path.display(), error = %e, "Snapshot write failed"),
    }
}
