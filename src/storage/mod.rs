//! Storage Module
//!
//! The in-memory key space and everything that lives in it.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                    Store                     │
//! │                                              │
//! │  entries:     key ──> Value (Str/List/Hash)  │
//! │  expirations: key ──> absolute deadline      │
//! │                                              │
//! │  expirations ⊆ entries, always               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Expiry is lazy only: deadlines are enforced when a key is next touched,
//! never by a background task. The snapshot boundary serializes both maps
//! to one blob and restores them wholesale.
//!
//! ## Example
//!
//! ```
//! use linekv::storage::Store;
//!
//! let mut store = Store::new();
//! store.set("name", "Johan", None).unwrap();
//! assert_eq!(store.get("name").unwrap(), Some("Johan".to_string()));
//!
//! // SET with a millisecond TTL
//! store.set("session", "token123", Some("60000")).unwrap();
//! assert!(store.ttl("session") >= 0);
//! ```

pub mod snapshot;
pub mod store;
pub mod value;

// Re-export commonly used types
pub use snapshot::{load_from_file, save_to_file, SnapshotError};
pub use store::{Store, StoreError};
pub use value::Value;
