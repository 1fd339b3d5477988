//! Connection Module
//!
//! Per-connection framing and lifecycle. The listener in `main` accepts
//! sockets and spawns one task per client:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                TCP Listener                  │
//! │                 (main.rs)                    │
//! └──────────────────────┬───────────────────────┘
//!                        │ accept(), spawn task
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │             ConnectionHandler                │
//! │                                              │
//! │  read bytes ──> split lines ──> dispatch     │
//! │                                    │         │
//! │              write reply + '\n' <──┘         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Workers are detached: nothing joins them, they end when the peer closes
//! the socket or sends `QUIT`. All of them funnel into the same store
//! mutex, so command execution is serialized no matter how many
//! connections are open.

pub mod handler;

// Re-export commonly used types
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
