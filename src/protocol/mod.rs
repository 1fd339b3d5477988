//! Line Protocol Implementation
//!
//! The wire protocol is text, not RESP: a request is one newline-terminated
//! line of whitespace-separated tokens, and a response is one line (one per
//! element for sequence results). The connection stays open across requests
//! until the peer closes it or sends `QUIT`.
//!
//! ## Modules
//!
//! - `command`: parses a request line into a typed [`Command`]
//! - `reply`: the [`Reply`] values and their wire rendering
//!
//! ## Example
//!
//! ```
//! use linekv::protocol::{Command, Reply};
//!
//! let command = Command::parse("GET name").unwrap().unwrap();
//! assert_eq!(command, Command::Get { key: "name".to_string() });
//!
//! let reply = Reply::Integer(2);
//! assert_eq!(reply.render(), ":2");
//! ```

pub mod command;
pub mod reply;

// Re-export commonly used types for convenience
pub use command::{Command, ParseError};
pub use reply::Reply;
