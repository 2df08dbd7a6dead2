//! Client-local key-value storage for the persisted wallet session.
//!
//! Values are opaque strings, as in a browser's local storage. Typed access
//! goes through [`read_json`] / [`write_json`], which turn undecodable records
//! into [`StorageError::PersistedStateCorrupt`].

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::model::WalletProvider;

pub const WALLET_CONNECTION_KEY: &str = "wallet_connection";
pub const USER_PREFERENCES_KEY: &str = "user_preferences";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Persisted state under '{key}' is corrupt: {reason}")]
    PersistedStateCorrupt { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;
    fn remove_item(&self, key: &str) -> StorageResult<()>;
}

/// Record written on wallet connect. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedConnection {
    pub address: String,
    pub provider: WalletProvider,
    pub timestamp: i64,
}

pub fn read_json<T: DeserializeOwned>(storage: &dyn LocalStorage, key: &str) -> StorageResult<Option<T>> {
    let Some(raw) = storage.get_item(key)? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| StorageError::PersistedStateCorrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

pub fn write_json<T: Serialize>(storage: &dyn LocalStorage, key: &str, value: &T) -> StorageResult<()> {
    let raw = serde_json::to_string(value)?;
    storage.set_item(key, &raw)
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.items().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        self.items().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.items().remove(key);
        Ok(())
    }
}

/// Stores every key in a single JSON object file. The file is rewritten on
/// each mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::PersistedStateCorrupt {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Current contents for a read-modify-write. A corrupt file counts as
    /// empty and is flagged so the caller rewrites it.
    fn load_for_write(&self) -> StorageResult<(BTreeMap<String, String>, bool)> {
        match self.load() {
            Ok(items) => Ok((items, false)),
            Err(StorageError::PersistedStateCorrupt { key, reason }) => {
                warn!("💾 Resetting corrupt storage file {}: {}", key, reason);
                Ok((BTreeMap::new(), true))
            }
            Err(e) => Err(e),
        }
    }

    fn save(&self, items: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(items)?)?;
        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        Ok(self.load()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let (mut items, _) = self.load_for_write()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let (mut items, corrupt) = self.load_for_write()?;
        if items.remove(key).is_some() || corrupt {
            self.save(&items)?;
        }
        Ok(())
    }
}
