use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

/// Overlay key for the locally-updated course collection.
pub const COURSES_OVERLAY_KEY: &str = "temp_courses";

/// Overlay key for the locally-updated enrollment collection.
pub const ENROLLMENTS_OVERLAY_KEY: &str = "temp_enrollments";

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("Overlay storage error: {0}")]
    Storage(String),

    #[error("Overlay '{key}' contains unreadable data: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize overlay '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<std::io::Error> for OverlayError {
    fn from(e: std::io::Error) -> Self {
        OverlayError::Storage(e.to_string())
    }
}

/// A string key/value store, the persistence behind the overlay.
/// Values are always written and read whole.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, OverlayError>;
    fn set(&self, key: &str, value: &str) -> Result<(), OverlayError>;
    fn remove(&self, key: &str) -> Result<(), OverlayError>;
}

/// Session-only storage; everything is gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, OverlayError> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), OverlayError> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), OverlayError> {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, OverlayError> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, OverlayError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), OverlayError> {
        // Write beside the target then rename, so a reader never sees half a file
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), OverlayError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Whole-collection patches that shadow the static snapshot.
///
/// Once a key has been written it is the truth for that key until it is
/// written again; the overlay never expires.
pub struct OverlayStore {
    store: Box<dyn KeyValueStore>,
}

impl OverlayStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    pub fn read_overlay<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, OverlayError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let data = serde_json::from_str(&raw).map_err(|source| OverlayError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(data))
    }

    /// Replace the whole collection stored under `key`.
    pub fn write_overlay<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> Result<(), OverlayError> {
        let raw = serde_json::to_string(data).map_err(|source| OverlayError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &raw)?;
        debug!(key, bytes = raw.len(), "Overlay written");
        Ok(())
    }

    /// Raw stored text, used to restore a key after a failed multi-step write.
    pub fn read_raw(&self, key: &str) -> Result<Option<String>, OverlayError> {
        self.store.get(key)
    }

    pub fn restore_raw(&self, key: &str, previous: Option<&str>) -> Result<(), OverlayError> {
        match previous {
            Some(raw) => self.store.set(key, raw),
            None => self.store.remove(key),
        }
    }

    pub fn remove_overlay(&self, key: &str) -> Result<(), OverlayError> {
        self.store.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    fn items(ids: &[&str]) -> Vec<Item> {
        ids.iter().map(|id| Item { id: id.to_string() }).collect()
    }

    #[test]
    fn test_write_replaces_whole_collection() {
        let overlay = OverlayStore::in_memory();
        assert_eq!(overlay.read_overlay::<Vec<Item>>(COURSES_OVERLAY_KEY).unwrap(), None);

        overlay.write_overlay(COURSES_OVERLAY_KEY, &items(&["a", "b"])).unwrap();
        overlay.write_overlay(COURSES_OVERLAY_KEY, &items(&["c"])).unwrap();

        let read: Vec<Item> = overlay.read_overlay(COURSES_OVERLAY_KEY).unwrap().unwrap();
        assert_eq!(read, items(&["c"]));
    }

    #[test]
    fn test_corrupt_overlay_is_reported() {
        let store = MemoryStore::new();
        store.set(ENROLLMENTS_OVERLAY_KEY, "{ definitely not json").unwrap();
        let overlay = OverlayStore::new(Box::new(store));

        let err = overlay.read_overlay::<Vec<Item>>(ENROLLMENTS_OVERLAY_KEY).unwrap_err();
        assert!(matches!(err, OverlayError::Corrupt { .. }));
    }

    #[test]
    fn test_restore_raw() {
        let overlay = OverlayStore::in_memory();
        overlay.write_overlay("k", &items(&["a"])).unwrap();
        let previous = overlay.read_raw("k").unwrap();

        overlay.write_overlay("k", &items(&["a", "b"])).unwrap();
        overlay.restore_raw("k", previous.as_deref()).unwrap();
        assert_eq!(overlay.read_overlay::<Vec<Item>>("k").unwrap(), Some(items(&["a"])));

        overlay.restore_raw("k", None).unwrap();
        assert_eq!(overlay.read_overlay::<Vec<Item>>("k").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempfile::TempDir::new().expect("Failed to create temp directory");

        let first = OverlayStore::new(Box::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
        first.write_overlay(COURSES_OVERLAY_KEY, &items(&["x"])).unwrap();

        let second = OverlayStore::new(Box::new(FileStore::new(dir.path().to_path_buf()).unwrap()));
        assert_eq!(
            second.read_overlay::<Vec<Item>>(COURSES_OVERLAY_KEY).unwrap(),
            Some(items(&["x"]))
        );
        assert!(!dir.path().join(".temp_courses.json.tmp").exists());

        second.remove_overlay(COURSES_OVERLAY_KEY).unwrap();
        second.remove_overlay(COURSES_OVERLAY_KEY).unwrap();
        assert_eq!(second.read_overlay::<Vec<Item>>(COURSES_OVERLAY_KEY).unwrap(), None);
    }
}
