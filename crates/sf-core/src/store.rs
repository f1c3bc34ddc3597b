//! Settings persistence
//!
//! A [`LocalStore`] owns one key in a [`StorageBackend`] and reads/writes a
//! flat settings object through the nested [`codec`](crate::codec). Reading a
//! missing key seeds it with the store's defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, warn};
use rand::Rng;
use serde_json::{Map, Value};

use crate::codec;
use crate::error::{Error, TransientIoError};

/// Key-value text storage, shaped after the browser's local storage.
pub trait StorageBackend: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), TransientIoError>;
    fn remove_item(&self, key: &str) -> Result<(), TransientIoError>;
}

// =============================================================================
// Backends
// =============================================================================

/// In-memory storage. Clones share the same underlying map, which is how two
/// script instances on the same origin see each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TransientIoError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| TransientIoError::Storage("memory storage poisoned".to_string()))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), TransientIoError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| TransientIoError::Storage("memory storage poisoned".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file_name))
    }
}

impl StorageBackend for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), TransientIoError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            TransientIoError::Storage(format!("Failed to create '{}': {}", self.dir.display(), e))
        })?;
        let path = self.path_for(key);
        fs::write(&path, value)
            .map_err(|e| TransientIoError::Storage(format!("Failed to write '{}': {}", path.display(), e)))
    }

    fn remove_item(&self, key: &str) -> Result<(), TransientIoError> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TransientIoError::Storage(format!(
                "Failed to remove '{}': {}",
                path.display(),
                e
            ))),
        }
    }
}

// =============================================================================
// Local Store
// =============================================================================

type ChangeListener = Box<dyn Fn(&Map<String, Value>) + Send + Sync>;

/// A settings object persisted under one storage key, with defaults.
pub struct LocalStore {
    backend: Arc<dyn StorageBackend>,
    key: String,
    defaults: Map<String, Value>,
    defaults_set: bool,
    on_change: Option<ChangeListener>,
}

impl LocalStore {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>, defaults: Map<String, Value>) -> Self {
        Self {
            backend,
            key: key.into(),
            defaults,
            defaults_set: false,
            on_change: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored object, seeding defaults when nothing is stored yet.
    pub fn get(&mut self) -> Result<Map<String, Value>, Error> {
        self.defaults_set = false;
        match self.backend.get_item(&self.key) {
            None => {
                debug!("Seeding '{}' with {} defaults", self.key, self.defaults.len());
                self.restore_defaults()
            }
            Some(text) => codec::decode(&text).map_err(|e| {
                warn!("Stored settings under '{}' are unreadable", self.key);
                Error::from(TransientIoError::Storage(format!("Corrupt store '{}': {}", self.key, e)))
            }),
        }
    }

    pub fn restore_defaults(&mut self) -> Result<Map<String, Value>, Error> {
        self.defaults_set = true;
        let defaults = self.defaults.clone();
        self.save(&defaults)?;
        Ok(defaults)
    }

    pub fn save(&mut self, data: &Map<String, Value>) -> Result<(), Error> {
        self.backend.set_item(&self.key, &codec::encode(data))?;
        if let Some(listener) = &self.on_change {
            listener(data);
        }
        Ok(())
    }

    pub fn delete(&mut self) -> Result<(), Error> {
        self.backend.remove_item(&self.key)?;
        Ok(())
    }

    pub fn on_change(&mut self, listener: impl Fn(&Map<String, Value>) + Send + Sync + 'static) -> &mut Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    /// Whether the last [`get`](Self::get) had to fall back to defaults.
    pub fn were_defaults_set(&self) -> bool {
        self.defaults_set
    }
}

/// Random sync id in `0..1_000_000_000`.
pub fn generate_id() -> u64 {
    rand::thread_rng().gen_range(0..1_000_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn defaults() -> Map<String, Value> {
        json!({"enabled": false, "rules": []}).as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_seeds_defaults_once() {
        let storage = MemoryStorage::new();
        let mut store = LocalStore::new(Arc::new(storage.clone()), "sf-settings", defaults());

        assert_eq!(store.get().unwrap(), defaults());
        assert!(store.were_defaults_set());
        assert!(storage.get_item("sf-settings").is_some());

        store.get().unwrap();
        assert!(!store.were_defaults_set());
    }

    #[test]
    fn test_save_notifies_listener() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut store = LocalStore::new(Arc::new(MemoryStorage::new()), "k", defaults());
        store.on_change(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let mut data = defaults();
        data.insert("enabled".to_string(), json!(true));
        store.save(&data).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.get().unwrap()["enabled"], json!(true));
    }

    #[test]
    fn test_shared_memory_storage() {
        let storage = MemoryStorage::new();
        let mut first = LocalStore::new(Arc::new(storage.clone()), "k", defaults());
        let mut second = LocalStore::new(Arc::new(storage), "k", defaults());

        let mut data = defaults();
        data.insert("rules".to_string(), json!(["a", "b"]));
        first.save(&data).unwrap();

        assert_eq!(second.get().unwrap()["rules"], json!(["a", "b"]));
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("store"));
        let mut store = LocalStore::new(Arc::new(storage.clone()), "sf-settings-id", defaults());

        let mut data = defaults();
        data.insert("id".to_string(), json!(7));
        store.save(&data).unwrap();
        assert_eq!(store.get().unwrap()["id"], json!(7));

        store.delete().unwrap();
        assert!(storage.get_item("sf-settings-id").is_none());
        store.delete().unwrap();
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let storage = MemoryStorage::new();
        storage.set_item("k", "{broken").unwrap();
        let mut store = LocalStore::new(Arc::new(storage), "k", defaults());
        assert!(store.get().is_err());
    }

    #[test]
    fn test_generate_id_range() {
        for _ in 0..100 {
            assert!(generate_id() < 1_000_000_000);
        }
    }
}
