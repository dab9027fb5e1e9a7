//! Snapshot storage
//!
//! Key/value persistence for the suggestion and vote stores so a restart
//! does not lose an in-flight cycle. Writes are best effort: callers log a
//! failure and carry on with their in-memory state.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot key for the suggestion store
pub const SUGGESTIONS_KEY: &str = "suggestions";
/// Snapshot key for the vote store
pub const VOTES_KEY: &str = "votes";
/// Snapshot key for the last published tally
pub const RESULTS_KEY: &str = "results";

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Key/value snapshot persistence
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Replace the value stored under `key`
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError>;

    /// Load the value stored under `key`, `None` when nothing was stored
    fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;
}

/// Shared snapshot store
pub type DynSnapshotStore = Arc<dyn SnapshotStore>;

/// Serialize and persist, logging instead of failing.
///
/// Returns whether the write succeeded.
pub fn persist_best_effort<T: Serialize>(store: &dyn SnapshotStore, key: &str, value: &T) -> bool {
    let result = serde_json::to_value(value)
        .map_err(StorageError::from)
        .and_then(|v| store.persist(key, &v));
    match result {
        Ok(()) => {
            debug!(key = %key, "snapshot persisted");
            true
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to persist snapshot");
            false
        }
    }
}

/// Load and deserialize a snapshot, falling back to the default when it is
/// missing or unreadable.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn SnapshotStore, key: &str) -> T {
    match store.load(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(key = %key, error = %e, "corrupt snapshot, using empty default");
                T::default()
            }
        },
        Ok(None) => {
            debug!(key = %key, "no snapshot found, starting empty");
            T::default()
        }
        Err(e) => {
            warn!(key = %key, error = %e, "failed to read snapshot, using empty default");
            T::default()
        }
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Stores each key as `<dir>/<key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SnapshotStore for JsonFileStore {
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        validate_key(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write to a sibling temp file and rename so a crash mid-write never
        // leaves a truncated snapshot behind.
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, mainly for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
    writes: RwLock<HashMap<String, usize>>,
    failing: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Current value under `key`
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Number of successful writes to `key`
    pub fn write_count(&self, key: &str) -> usize {
        self.writes.read().get(key).copied().unwrap_or(0)
    }

    /// Insert a raw value, bypassing the failure switch
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }
}

impl SnapshotStore for MemoryStore {
    fn persist(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes disabled".to_string()));
        }
        self.values.write().insert(key.to_string(), value.clone());
        *self.writes.write().entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }
}
