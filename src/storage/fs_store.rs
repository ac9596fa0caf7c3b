//! Filesystem-backed key-value store.
//!
//! Each key is stored as `{data_dir}/{key}.json`. Writes are atomic (temp
//! file + fsync + rename) so a crash never leaves a half-written value.
//!
//! # Examples
//!
//! ```no_run
//! use festival::storage::FsStore;
//!
//! let store = FsStore::new("/tmp/festival-store").unwrap();
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::KeyValueStore;
use crate::error::{FestivalError, PersistenceError};

const INVALID_KEY: &str = "keys may only contain [A-Za-z0-9_-]";

/// One JSON file per key under a data directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    data_dir: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `data_dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FestivalError::Io`] if the directory cannot be created.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, FestivalError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File path for `key`. Keys are restricted to `[A-Za-z0-9_-]`.
    fn key_path(&self, key: &str) -> Option<PathBuf> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        valid.then(|| self.data_dir.join(format!("{key}.json")))
    }

    fn write_atomic(&self, key: &str, path: &Path, value: &str) -> Result<(), PersistenceError> {
        let write_err = |e: std::io::Error| PersistenceError::Write {
            key: key.to_owned(),
            message: e.to_string(),
        };

        // Unique per write: concurrent sets on one key must not share a temp file.
        let tmp_path = self
            .data_dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4()));
        std::fs::write(&tmp_path, value.as_bytes()).map_err(write_err)?;

        if let Ok(file) = std::fs::File::open(&tmp_path) {
            let _ = file.sync_all();
        }

        std::fs::rename(&tmp_path, path).map_err(write_err)
    }
}

#[async_trait]
impl KeyValueStore for FsStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let path = self.key_path(key).ok_or_else(|| PersistenceError::Read {
            key: key.to_owned(),
            message: INVALID_KEY.to_owned(),
        })?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read {
                key: key.to_owned(),
                message: format!("{}: {e}", path.display()),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let path = self.key_path(key).ok_or_else(|| PersistenceError::Write {
            key: key.to_owned(),
            message: INVALID_KEY.to_owned(),
        })?;
        let store = self.clone();
        let owned_key = key.to_owned();
        let value = value.to_owned();
        tokio::task::spawn_blocking(move || store.write_atomic(&owned_key, &path, &value))
            .await
            .map_err(|e| PersistenceError::Write {
                key: key.to_owned(),
                message: format!("write task failed: {e}"),
            })?
    }
}
