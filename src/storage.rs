//! Durable client-side key/value storage.
//!
//! Holds the credential pair and UI preferences between runs. [`FileStore`]
//! keeps everything in one JSON object on disk; [`MemoryStore`] is the
//! non-persistent variant used by tests and one-shot clients.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;

/// Storage key for the access credential.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Storage key for the refresh credential.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Storage key for the display language code.
pub const LANGUAGE_KEY: &str = "language";
/// Storage key for the theme name.
pub const THEME_KEY: &str = "theme";

/// A string key/value store that survives restarts.
pub trait KeyValueStore: Send + Sync + Debug {
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Apply several writes as one update; `None` removes the key.
    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<()> {
        for (key, value) in changes {
            match value {
                Some(value) => self.set(key, value)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// In-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON-file backed store.
///
/// The file is read once on open and rewritten (via a temp file + rename) on
/// every change.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(
            name: "storage.opened",
            path = %path.display(),
            keys = entries.len(),
            "Client state opened"
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_through(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.apply(&[(key, Some(value))])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.apply(&[(key, None)])
    }

    fn apply(&self, changes: &[(&str, Option<&str>)]) -> Result<()> {
        let mut guard = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    next.insert((*key).to_string(), (*value).to_string());
                }
                None => {
                    next.remove(*key);
                }
            }
        }
        // Memory only changes once the file write succeeded.
        self.write_through(&next)?;
        *guard = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(THEME_KEY).is_none());
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        store.remove(THEME_KEY).unwrap();
        assert!(store.get(THEME_KEY).is_none());
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = FileStore::open(&path).unwrap();
        store
            .apply(&[
                (ACCESS_TOKEN_KEY, Some("a")),
                (REFRESH_TOKEN_KEY, Some("r")),
            ])
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(ACCESS_TOKEN_KEY).as_deref(), Some("a"));
        assert_eq!(reopened.get(REFRESH_TOKEN_KEY).as_deref(), Some("r"));

        reopened
            .apply(&[(ACCESS_TOKEN_KEY, None), (REFRESH_TOKEN_KEY, None)])
            .unwrap();
        let reopened = FileStore::open(&path).unwrap();
        assert!(reopened.get(ACCESS_TOKEN_KEY).is_none());
    }

    #[test]
    fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(FileStore::open(&path).is_err());
    }
}
