//! Cart Storage
//!
//! Durable key-value port the cart is persisted through. Writes must be
//! flushed before they return: a mutation is only complete once its blob is
//! on the backing store.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use mockall::automock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// Fixed key the cart blob is stored under.
pub const CART_STORAGE_KEY: &str = "cartItems";

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem error.
    #[error("cart storage io error: {0}")]
    Io(#[from] io::Error),

    /// Key cannot be mapped onto the backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Backend cannot currently serve requests.
    #[error("cart storage unavailable: {0}")]
    Unavailable(String),
}

/// Key-value blob storage for the persisted cart.
#[automock]
pub trait CartStorage: Send + Sync {
    /// Read the blob stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Durably store `value` under `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the blob could not be flushed.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Process-local storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<FxHashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|error| StorageError::Unavailable(error.to_string()))?;

        Ok(blobs.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|error| StorageError::Unavailable(error.to_string()))?;

        blobs.insert(key.to_string(), value.to_string());

        Ok(())
    }
}

/// One JSON file per key inside a directory.
///
/// Writes go to a temporary sibling, are synced, then renamed over the
/// target, so a reader never observes a half-written blob.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Store blobs under `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory blobs are stored in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(format!("{key}.json")))
    }
}

impl CartStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let staging = self.root.join(format!(".{key}.json.tmp"));

        fs::create_dir_all(&self.root)?;

        let mut file = fs::File::create(&staging)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;

        fs::rename(&staging, &path)?;

        debug!(path = %path.display(), bytes = value.len(), "flushed cart blob");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn memory_storage_round_trips() -> TestResult {
        let storage = MemoryStorage::new();

        assert_eq!(storage.read(CART_STORAGE_KEY)?, None);

        storage.write(CART_STORAGE_KEY, "{\"items\":[]}")?;

        assert_eq!(
            storage.read(CART_STORAGE_KEY)?.as_deref(),
            Some("{\"items\":[]}")
        );

        Ok(())
    }

    #[test]
    fn file_storage_round_trips_and_overwrites() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.read(CART_STORAGE_KEY)?, None);

        storage.write(CART_STORAGE_KEY, "first")?;
        storage.write(CART_STORAGE_KEY, "second")?;

        assert_eq!(storage.read(CART_STORAGE_KEY)?.as_deref(), Some("second"));
        assert!(dir.path().join("nested").join("cartItems.json").exists());
        assert!(!dir.path().join("nested").join(".cartItems.json.tmp").exists());

        Ok(())
    }

    #[test]
    fn file_storage_rejects_path_like_keys() -> TestResult {
        let dir = tempfile::tempdir()?;
        let storage = FileStorage::new(dir.path());

        let result = storage.write("../escape", "x");

        assert!(
            matches!(result, Err(StorageError::InvalidKey(_))),
            "expected InvalidKey, got {result:?}"
        );

        Ok(())
    }
}
