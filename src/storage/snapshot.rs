//! Snapshot Persistence Boundary
//!
//! Two whole-state operations: [`Store::snapshot`] serializes the entry and
//! expiration maps into one opaque blob, and [`Store::restore`] replaces the
//! store's contents from such a blob. There is no incremental or streaming
//! persistence; the server writes the blob to a dump file on shutdown and
//! reads it back at startup, holding the same store lock as command traffic.
//!
//! Deadlines are kept as monotonic instants in memory, so the blob carries
//! them rebased to Unix-epoch milliseconds. Entries that have already
//! lapsed by restore time are kept resident and swept on next access, the
//! same lazy policy applied to everything else.

use crate::storage::store::Store;
use crate::storage::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors crossing the snapshot boundary.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Reading or writing the dump file failed.
    #[error("snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store state could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The blob did not decode to the expected two maps. The store has
    /// been reset to empty by the time this is returned.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[source] serde_json::Error),
}

/// On-disk image of the store: the two maps, with deadlines rebased to
/// Unix-epoch milliseconds.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRecord {
    entries: HashMap<String, Value>,
    expirations: HashMap<String, u64>,
}

impl Store {
    /// Serializes the whole store state into one opaque blob.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let now_wall = SystemTime::now();
        let now_mono = Instant::now();

        let expirations = self
            .expirations
            .iter()
            .map(|(key, deadline)| {
                let at = match deadline.checked_duration_since(now_mono) {
                    Some(ahead) => now_wall + ahead,
                    // Lapsed but unswept; keep the deadline in the past so
                    // the restored key expires on first access.
                    None => now_wall - now_mono.duration_since(*deadline),
                };
                let ms = at
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                (key.clone(), ms)
            })
            .collect();

        let record = SnapshotRecord {
            entries: self.entries.clone(),
            expirations,
        };
        serde_json::to_vec(&record).map_err(SnapshotError::Encode)
    }

    /// Replaces the store's contents wholesale from a snapshot blob.
    ///
    /// On success, returns the number of keys restored. On any decode
    /// failure the store falls back to empty and the error is reported.
    /// Expiration entries without a matching key are dropped to keep the
    /// subset invariant.
    pub fn restore(&mut self, blob: &[u8]) -> Result<usize, SnapshotError> {
        let record: SnapshotRecord = match serde_json::from_slice(blob) {
            Ok(record) => record,
            Err(e) => {
                *self = Store::new();
                return Err(SnapshotError::Decode(e));
            }
        };

        let now_wall = SystemTime::now();
        let now_mono = Instant::now();

        self.expirations = record
            .expirations
            .into_iter()
            .filter(|(key, _)| record.entries.contains_key(key))
            .map(|(key, ms)| {
                let at = UNIX_EPOCH + Duration::from_millis(ms);
                let deadline = match at.duration_since(now_wall) {
                    Ok(ahead) => now_mono + ahead,
                    Err(lapsed) => now_mono
                        .checked_sub(lapsed.duration())
                        .unwrap_or(now_mono),
                };
                (key, deadline)
            })
            .collect();
        self.entries = record.entries;

        Ok(self.entries.len())
    }
}

/// Rebuilds a store from the dump file at `path`.
///
/// A missing file yields a fresh empty store; a malformed one is logged
/// and likewise falls back to empty.
pub fn load_from_file(path: &Path) -> Store {
    let mut store = Store::new();
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot file, starting empty");
        return store;
    }

    match std::fs::read(path) {
        Ok(blob) => match store.restore(&blob) {
            Ok(restored) => {
                debug!(path = %path.display(), keys = restored, "snapshot restored");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "snapshot rejected, starting empty");
            }
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot unreadable, starting empty");
        }
    }
    store
}

/// Writes the store's snapshot blob to the dump file at `path`.
pub fn save_to_file(store: &Store, path: &Path) -> Result<(), SnapshotError> {
    let blob = store.snapshot()?;
    std::fs::write(path, blob)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut store = Store::new();
        store.set("name", "Johan", None).unwrap();
        store
            .rpush("l", &["a".to_string(), "b".to_string()])
            .unwrap();
        store.hset("h", "f", "v").unwrap();
        store.set("temp", "data", Some("60000")).unwrap();

        let blob = store.snapshot().unwrap();

        let mut restored = Store::new();
        assert_eq!(restored.restore(&blob).unwrap(), 4);
        assert_eq!(restored.get("name").unwrap(), Some("Johan".to_string()));
        assert_eq!(
            restored.lrange("l", 0, -1).unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(restored.hget("h", "f").unwrap(), Some("v".to_string()));

        // The deadline survives the rebase roughly intact.
        let ttl = restored.ttl("temp");
        assert!(ttl > 0 && ttl <= 60, "ttl was {ttl}");
        assert_eq!(restored.ttl("name"), -1);
    }

    #[test]
    fn test_restore_garbage_falls_back_to_empty() {
        let mut store = Store::new();
        store.set("key", "value", None).unwrap();

        assert!(store.restore(b"not json at all").is_err());
        assert!(store.is_empty());

        // Right format family, wrong shape.
        let mut store = Store::new();
        store.set("key", "value", None).unwrap();
        assert!(store.restore(b"{\"entries\": 7}").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_restore_drops_orphan_expirations() {
        let blob = br#"{
            "entries": {"live": {"Str": "v"}},
            "expirations": {"live": 99999999999999, "ghost": 1}
        }"#;

        let mut store = Store::new();
        assert_eq!(store.restore(blob).unwrap(), 1);
        assert_eq!(store.get("live").unwrap(), Some("v".to_string()));
        assert_eq!(store.ttl("ghost"), -2);
    }

    #[test]
    fn test_lapsed_entries_survive_restore_until_accessed() {
        let mut store = Store::new();
        store.set("short", "data", Some("1")).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let blob = store.snapshot().unwrap();
        let mut restored = Store::new();

        // The lapsed key is resident after restore and swept on access.
        assert_eq!(restored.restore(&blob).unwrap(), 1);
        assert_eq!(restored.get("short").unwrap(), None);
        assert!(restored.is_empty());
    }

    #[test]
    fn test_file_round_trip() {
        let mut store = Store::new();
        store.set("key", "value", None).unwrap();

        let path = std::env::temp_dir().join(format!("linekv-snap-{}.json", std::process::id()));
        save_to_file(&store, &path).unwrap();

        let mut loaded = load_from_file(&path);
        assert_eq!(loaded.get("key").unwrap(), Some("value".to_string()));

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let store = load_from_file(Path::new("/nonexistent/linekv-dump.json"));
        assert!(store.is_empty());
    }
}
