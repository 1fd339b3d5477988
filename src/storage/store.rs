//! Store Engine with Lazy Expiry
//!
//! The [`Store`] owns two maps: `entries` (key to [`Value`]) and
//! `expirations` (key to absolute deadline). The expiration map is always a
//! subset of the entry map; any deletion removes a key from both.
//!
//! Expiry is strictly lazy: a deadline is only enforced when the key is next
//! touched by a command. There is no background sweep, so a key that is
//! never accessed after expiring stays resident. That memory growth is an
//! accepted tradeoff of the design, not something callers should work
//! around.
//!
//! The store itself is not synchronized. Callers wrap it in a single
//! `Mutex` and hold the lock for the full duration of one command, which
//! serializes all command execution across connections.

use crate::storage::value::Value;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

/// Errors a store command can report to the client.
///
/// These are values, not faults: the connection stays up and the store
/// stays usable after any of them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a different shape than the command expects.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// `SET ... EX` was given a non-integer or non-positive millisecond
    /// count. The key being set has already been deleted by the time this
    /// is returned.
    #[error("Invalid expiration time format.")]
    InvalidExpiration,
}

/// The in-memory key space.
///
/// Created once at process start (empty, or rebuilt from a snapshot) and
/// mutated only through the command methods below.
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) entries: HashMap<String, Value>,
    pub(crate) expirations: HashMap<String, Instant>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident keys, including expired-but-unswept ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are resident.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deletes `key` from both maps if its deadline is strictly in the
    /// past. Returns true exactly when the key was expired and removed;
    /// a key with no deadline always survives.
    fn check_and_expire(&mut self, key: &str) -> bool {
        match self.expirations.get(key) {
            Some(deadline) if *deadline < Instant::now() => {
                trace!(key, "key expired, deleting lazily");
                self.entries.remove(key);
                self.expirations.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Removes `key` from both maps unconditionally.
    fn purge(&mut self, key: &str) {
        self.entries.remove(key);
        self.expirations.remove(key);
    }

    /// `SET key value [EX milliseconds]`
    ///
    /// Always overwrites to a `Str`, whatever shape the key held before.
    /// With `EX`, the raw argument must parse as a positive integer
    /// millisecond count; otherwise the key just set is deleted again and
    /// the command fails. Without `EX`, any existing deadline is cleared.
    pub fn set(&mut self, key: &str, value: &str, expire_ms: Option<&str>) -> Result<(), StoreError> {
        self.check_and_expire(key);
        self.entries
            .insert(key.to_string(), Value::Str(value.to_string()));

        match expire_ms {
            Some(raw) => {
                let ms = match raw.parse::<i64>() {
                    Ok(ms) if ms > 0 => ms as u64,
                    _ => {
                        // Partial-effect policy: the failed SET leaves no key
                        // behind, not the old value and not the new one.
                        self.purge(key);
                        return Err(StoreError::InvalidExpiration);
                    }
                };
                self.expirations
                    .insert(key.to_string(), Instant::now() + Duration::from_millis(ms));
            }
            None => {
                self.expirations.remove(key);
            }
        }

        Ok(())
    }

    /// `GET key`
    ///
    /// Returns the string value, or `None` if the key is absent or just
    /// expired. Any non-`Str` shape is a `WRONGTYPE` error and the stored
    /// value is left untouched.
    pub fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        if self.check_and_expire(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// `DEL key [key ...]`
    ///
    /// Counts every key this call removed from the map, whether it was
    /// live or had lapsed and was swept by the lazy check just now.
    pub fn del(&mut self, keys: &[String]) -> i64 {
        let mut deleted = 0;
        for key in keys {
            let expired = self.check_and_expire(key);
            if self.entries.remove(key.as_str()).is_some() {
                self.expirations.remove(key.as_str());
                deleted += 1;
            } else if expired {
                deleted += 1;
            }
        }
        deleted
    }

    /// `LPUSH key value [value ...]`
    ///
    /// Each value is inserted at the front in argument order, so the last
    /// argument ends up at the head. Creates the list if the key is absent
    /// or just expired; any other shape is `WRONGTYPE`.
    pub fn lpush(&mut self, key: &str, values: &[String]) -> Result<usize, StoreError> {
        self.check_and_expire(key);
        let list = self.list_entry(key)?;
        for value in values {
            list.push_front(value.clone());
        }
        Ok(list.len())
    }

    /// `RPUSH key value [value ...]`
    ///
    /// Appends at the back in argument order. Creation and type rules as
    /// for `LPUSH`.
    pub fn rpush(&mut self, key: &str, values: &[String]) -> Result<usize, StoreError> {
        self.check_and_expire(key);
        let list = self.list_entry(key)?;
        for value in values {
            list.push_back(value.clone());
        }
        Ok(list.len())
    }

    /// Fetches the list at `key`, creating an empty one for an absent key.
    fn list_entry(&mut self, key: &str) -> Result<&mut VecDeque<String>, StoreError> {
        match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::List(VecDeque::new()))
        {
            Value::List(list) => Ok(list),
            _ => Err(StoreError::WrongType),
        }
    }

    /// `LRANGE key start stop`
    ///
    /// Inclusive slice; negative indices count from the end (-1 is the
    /// last element). Indices are normalized against the current length
    /// and clamped to bounds; inverted or fully out-of-range requests
    /// yield an empty sequence, as does a missing or expired key.
    pub fn lrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        if self.check_and_expire(key) {
            return Ok(Vec::new());
        }
        let list = match self.entries.get(key) {
            Some(Value::List(list)) => list,
            Some(_) => return Err(StoreError::WrongType),
            None => return Ok(Vec::new()),
        };

        let len = list.len() as i64;
        let mut start = if start < 0 { len + start } else { start };
        let mut stop = if stop < 0 { len + stop } else { stop };
        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if start > stop || start >= len {
            return Ok(Vec::new());
        }

        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    /// `HSET key field value`
    ///
    /// Returns 1 when the field was newly created, 0 when an existing
    /// field was overwritten. Creates the hash if the key is absent or
    /// just expired; any other shape is `WRONGTYPE`.
    pub fn hset(&mut self, key: &str, field: &str, value: &str) -> Result<i64, StoreError> {
        self.check_and_expire(key);
        let hash = match self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(HashMap::new()))
        {
            Value::Hash(hash) => hash,
            _ => return Err(StoreError::WrongType),
        };
        let created = hash.insert(field.to_string(), value.to_string()).is_none();
        Ok(if created { 1 } else { 0 })
    }

    /// `HGET key field`
    ///
    /// `None` for a missing key or field; `WRONGTYPE` for a non-hash key.
    pub fn hget(&mut self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        if self.check_and_expire(key) {
            return Ok(None);
        }
        match self.entries.get(key) {
            Some(Value::Hash(hash)) => Ok(hash.get(field).cloned()),
            Some(_) => Err(StoreError::WrongType),
            None => Ok(None),
        }
    }

    /// `HDEL key field [field ...]`
    ///
    /// Counts the fields actually removed. Removing the last field deletes
    /// the key entirely, deadline included.
    pub fn hdel(&mut self, key: &str, fields: &[String]) -> Result<i64, StoreError> {
        self.check_and_expire(key);
        let hash = match self.entries.get_mut(key) {
            Some(Value::Hash(hash)) => hash,
            Some(_) => return Err(StoreError::WrongType),
            None => return Ok(0),
        };

        let mut removed = 0;
        for field in fields {
            if hash.remove(field.as_str()).is_some() {
                removed += 1;
            }
        }
        if hash.is_empty() {
            self.purge(key);
        }
        Ok(removed)
    }

    /// `TTL key`
    ///
    /// `-2` if the key is absent, was just lazily expired, or its deadline
    /// has lapsed without being swept yet; `-1` if it exists with no
    /// deadline; otherwise the whole seconds remaining (floor).
    pub fn ttl(&mut self, key: &str) -> i64 {
        if !self.entries.contains_key(key) {
            return -2;
        }
        if self.check_and_expire(key) {
            return -2;
        }
        match self.expirations.get(key) {
            Some(deadline) => {
                let now = Instant::now();
                if *deadline > now {
                    (*deadline - now).as_secs() as i64
                } else {
                    -2
                }
            }
            None => -1,
        }
    }

    /// `EXPIRE key seconds`
    ///
    /// Returns 0 for an absent (or just-expired) key. For a live key,
    /// `seconds <= 0` removes any deadline (the key becomes persistent)
    /// and positive seconds set a fresh deadline; both return 1.
    pub fn expire(&mut self, key: &str, seconds: i64) -> i64 {
        if !self.entries.contains_key(key) {
            return 0;
        }
        if self.check_and_expire(key) {
            return 0;
        }

        if seconds <= 0 {
            self.expirations.remove(key);
        } else {
            self.expirations
                .insert(key.to_string(), Instant::now() + Duration::from_secs(seconds as u64));
        }
        1
    }
}
