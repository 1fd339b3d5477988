//! # LineKV - A Minimal In-Memory Multi-Type Key-Value Store
//!
//! LineKV is a small Redis-inspired key-value server written in Rust. It
//! keeps strings, lists, and hashes in one in-memory key space, expires
//! keys lazily, and speaks a line-oriented text protocol (one
//! newline-terminated command in, one newline-terminated reply out).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             LineKV                               │
//! │                                                                  │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐           │
//! │  │ TCP Server  │───>│ Connection  │───>│ Dispatcher  │           │
//! │  │ (Listener)  │    │  Handler    │    │             │           │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘           │
//! │                                               │                  │
//! │  ┌─────────────┐                              ▼                  │
//! │  │ Line proto  │                 ┌──────────────────────────┐    │
//! │  │ Command /   │                 │       Mutex<Store>       │    │
//! │  │ Reply       │                 │  entries + expirations   │    │
//! │  └─────────────┘                 └──────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every connection runs on its own task, but one mutex guards the whole
//! store and is held for the full duration of each command. Throughput is
//! therefore bounded by single-threaded command execution regardless of
//! connection count — a deliberate simplicity-over-scalability tradeoff.
//!
//! ## Quick Start
//!
//! ```ignore
//! use linekv::commands::Dispatcher;
//! use linekv::connection::{handle_connection, ConnectionStats};
//! use linekv::storage::Store;
//! use std::sync::{Arc, Mutex};
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(Mutex::new(Store::new()));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6380").await.unwrap();
//!
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let dispatcher = Dispatcher::new(Arc::clone(&store));
//!         let stats = Arc::clone(&stats);
//!
//!         tokio::spawn(handle_connection(stream, addr, dispatcher, stats));
//!     }
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `SET key value [EX milliseconds]` / `GET key` / `DEL key [key ...]`
//! - `LPUSH key value [value ...]` / `RPUSH key value [value ...]` /
//!   `LRANGE key start stop`
//! - `HSET key field value` / `HGET key field` / `HDEL key field [field ...]`
//! - `TTL key` / `EXPIRE key seconds`
//! - `PING` / `COMMAND` / `QUIT`
//!
//! ## Module Overview
//!
//! - [`protocol`]: line parsing into typed commands, reply rendering
//! - [`storage`]: the store engine, value model, lazy expiry, snapshots
//! - [`commands`]: the dispatcher mapping commands onto the store
//! - [`connection`]: per-client framing and lifecycle
//!
//! ## Design Highlights
//!
//! ### Lazy expiry only
//!
//! A key's deadline is enforced when the key is next accessed, never by a
//! background sweeper. A key that expires and is never touched again stays
//! resident; that memory growth is an accepted, documented tradeoff.
//!
//! ### One lock, whole store
//!
//! Commands from all connections serialize on a single mutex. There is no
//! per-key locking and no read/write distinction, which keeps every
//! cross-type invariant trivially safe.
//!
//! ### Errors as values
//!
//! WRONGTYPE, arity, parse, and unknown-command failures all travel back
//! to the client as one-line `ERROR:` replies; only a genuine panic is
//! caught at the dispatch boundary and reported as an internal error.

pub mod commands;
pub mod connection;
pub mod protocol;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Dispatcher, Outcome};
pub use connection::{handle_connection, ConnectionError, ConnectionStats};
pub use protocol::{Command, ParseError, Reply};
pub use storage::{Store, StoreError, Value};

/// The default port LineKV listens on (deliberately not Redis's 6379)
pub const DEFAULT_PORT: u16 = 6380;

/// The default host LineKV binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default dump file for snapshots
pub const DEFAULT_SNAPSHOT_PATH: &str = "linekv-dump.json";

/// Version of LineKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
