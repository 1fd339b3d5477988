//! Command Dispatch Module
//!
//! Turns request lines into store operations and replies.
//!
//! ```text
//! request line
//!       │
//!       ▼
//! ┌─────────────────┐   parse / arity errors answered here,
//! │   Dispatcher    │   without touching the lock
//! │                 │
//! │  Parse          │
//! │  Validate arity │
//! │  Execute ───────┼──> Mutex<Store>   (held for the whole command)
//! │  Render         │
//! └────────┬────────┘
//!          │
//!          ▼
//!       Outcome (reply / silent / reply-then-close)
//! ```

pub mod dispatcher;

// Re-export the dispatcher types
pub use dispatcher::{Dispatcher, Outcome};
