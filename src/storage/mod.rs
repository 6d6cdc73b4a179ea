//! Local key-value cache
//!
//! Values are stored as JSON under string keys in a single file in the user's
//! data directory. Failures never take the dashboard down: reads fall back to
//! a default and writes keep the in-memory value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode stored value: {0}")]
    Serialize(#[from] serde_json::Error),
}

type Entries = BTreeMap<String, serde_json::Value>;

struct StoreInner {
    path: Option<PathBuf>,
    entries: Mutex<Entries>,
}

/// Shared handle to the cache file
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<StoreInner>,
}

impl LocalStore {
    /// `<data_dir>/sentinel-dash/store.json`
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::data_dir()?.join("sentinel-dash").join("store.json"))
    }

    /// Open the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Entries>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring corrupt store {}: {}", path.display(), e);
                    Entries::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Entries::new(),
            Err(e) => {
                tracing::warn!("Could not read store {}: {}", path.display(), e);
                Entries::new()
            }
        };

        Self {
            inner: Arc::new(StoreInner {
                path: Some(path),
                entries: Mutex::new(entries),
            }),
        }
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: None,
                entries: Mutex::new(Entries::new()),
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Typed read; `Ok(None)` when the key was never written
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.entries().get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Typed read that falls back to `default` on a missing key or bad value
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::error!("Error reading stored key \"{}\": {}", key, e);
                default
            }
        }
    }

    /// Write `value` under `key` and persist the whole map.
    ///
    /// The in-memory map is updated even when persisting fails.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(value)?;
        let mut entries = self.entries();
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn flush(&self, entries: &Entries) -> Result<(), StorageError> {
        let Some(path) = self.inner.path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A single value kept in sync with the store
pub struct Persisted<T> {
    key: String,
    value: T,
    store: LocalStore,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn load(store: &LocalStore, key: impl Into<String>, initial: T) -> Self {
        let key = key.into();
        let value = store.get_or(&key, initial);
        Self {
            key,
            value,
            store: store.clone(),
        }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn set(&mut self, value: T) {
        self.value = value;
        if let Err(e) = self.store.set(&self.key, &self.value) {
            tracing::error!("Error setting stored key \"{}\": {}", self.key, e);
        }
    }

    pub fn update(&mut self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value);
        self.set(next);
    }
}
