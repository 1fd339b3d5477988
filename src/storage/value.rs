//! Stored Value Model
//!
//! Every key in the store maps to exactly one [`Value`], a closed tagged
//! variant over the three supported shapes. Commands match on the variant
//! explicitly; applying a command to the wrong shape is a `WRONGTYPE` error
//! rather than a silent coercion.
//!
//! Changing a key's shape requires deleting it first; the one exception is
//! `SET`, which always replaces whatever was there with a `Str`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A single stored value.
///
/// All payloads are text. Lists use a `VecDeque` so both `LPUSH` and
/// `RPUSH` are O(1); hashes keep unique field names with no meaningful
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// A plain text string.
    Str(String),
    /// An ordered sequence, pushed at either end and read by index range.
    List(VecDeque<String>),
    /// A field-name to text mapping.
    Hash(HashMap<String, String>),
}

impl Value {
    /// Human-readable shape name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Hash(_) => "hash",
        }
    }
}
