//! Snapshot persistence.
//!
//! A [`SnapshotStore`] is a key-scoped durable medium holding opaque bytes.
//! The runtime never talks to a medium directly: it calls a
//! [`StatePersistence`] hook after every reduced action, and the feature
//! crate decides how its state becomes a snapshot.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by snapshot media
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Underlying filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key cannot be used by this medium
    #[error("Invalid snapshot key: {0}")]
    InvalidKey(String),

    /// Medium is not usable (poisoned lock, closed handle)
    #[error("Snapshot medium unavailable: {0}")]
    Unavailable(String),
}

/// Key-scoped durable storage for whole-state snapshots
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot stored under `key`, if any
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the medium cannot be read.
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the snapshot stored under `key`
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the medium cannot be written.
    fn save(&self, key: &str, snapshot: &[u8]) -> Result<(), PersistenceError>;
}

/// Hook invoked by the runtime after each action is reduced
///
/// Implementations write the full state synchronously; there is no
/// incremental persistence.
pub trait StatePersistence<S>: Send + Sync {
    /// Persist a snapshot of `state`
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the snapshot cannot be encoded or written.
    fn persist(&self, state: &S) -> Result<(), PersistenceError>;
}

/// In-process snapshot medium
///
/// Useful for tests and for sessions that should not outlive the process.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    /// Create an empty medium
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether no snapshot has been saved yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn save(&self, key: &str, snapshot: &[u8]) -> Result<(), PersistenceError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        entries.insert(key.to_string(), snapshot.to_vec());
        Ok(())
    }
}

/// Directory-backed snapshot medium
///
/// Each key maps to `<dir>/<key>.json`. Saves go through a temporary file
/// and a rename so a crash never leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a medium rooted at `dir` (created lazily on first save)
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the snapshot files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded snapshot");
                Ok(Some(bytes))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, snapshot: &[u8]) -> Result<(), PersistenceError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, snapshot)?;
        std::fs::rename(&tmp, &path)?;

        tracing::trace!(path = %path.display(), bytes = snapshot.len(), "Saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_round_trip() {
        let store = InMemorySnapshotStore::new();
        assert!(store.is_empty());
        assert_eq!(store.load("waste-storage").unwrap(), None);

        store.save("waste-storage", b"{\"tickets\":[]}").unwrap();
        assert_eq!(
            store.load("waste-storage").unwrap().as_deref(),
            Some(&b"{\"tickets\":[]}"[..])
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn in_memory_save_replaces_previous_snapshot() {
        let store = InMemorySnapshotStore::new();
        store.save("k", b"one").unwrap();
        store.save("k", b"two").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some(&b"two"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nested"));

        assert_eq!(store.load("waste-storage").unwrap(), None);
        store.save("waste-storage", b"[1,2,3]").unwrap();
        assert_eq!(
            store.load("waste-storage").unwrap().as_deref(),
            Some(&b"[1,2,3]"[..])
        );
        assert!(dir.path().join("nested/waste-storage.json").exists());
        assert!(!dir.path().join("nested/waste-storage.json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path());

        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(
                matches!(store.save(key, b"x"), Err(PersistenceError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
