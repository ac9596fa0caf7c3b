//! Key-value persistence.
//!
//! Defines the [`KeyValueStore`] trait used for favorites, settings and the
//! notification ledger, plus [`MemoryStore`] for tests and ephemeral usage.
//! The filesystem backend lives in [`fs_store`].
//!
//! # Examples
//!
//! ```
//! use festival::storage::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let store2 = store.clone();
//! assert!(format!("{store2:?}").contains("MemoryStore"));
//! ```

pub mod fs_store;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::error::PersistenceError;

pub use fs_store::FsStore;

/// Store key for the favorites map.
pub const KEY_FAVORITES: &str = "favorites";
/// Store key for the reminder offset list.
pub const KEY_NOTIFICATION_TIMES: &str = "notificationTimes";
/// Store key for the recurring-reminder toggles.
pub const KEY_REMINDER_TOGGLES: &str = "reminderToggles";
/// Store key for the notification ledger.
pub const KEY_NOTIFICATION_LEDGER: &str = "notificationLedger";

/// Async string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. `Ok(None)` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    /// Write (overwrite) a value.
    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Read and decode a JSON value stored under `key`.
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, PersistenceError> {
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| PersistenceError::Codec {
            key: key.to_owned(),
            source,
        })
}

/// Encode `value` as JSON and store it under `key`.
pub async fn save_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(value).map_err(|source| PersistenceError::Codec {
        key: key.to_owned(),
        source,
    })?;
    store.set(key, &json).await
}

/// In-memory store. Values are lost when the last clone is dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.values
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
