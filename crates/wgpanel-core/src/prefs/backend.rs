// ── Key/value persistence ──
//
// Raw string storage behind the preference store. Values are JSON text,
// one entry per key, so a corrupt entry never takes its siblings with it.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure writing preferences to durable storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to encode preference {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
}

/// Raw string key/value storage.
pub trait KvBackend: Send + Sync + fmt::Debug {
    fn get_raw(&self, key: &str) -> Option<String>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove_raw(&self, key: &str) -> Result<(), StoreError>;
    /// All keys, in no particular order.
    fn keys(&self) -> Vec<String>;
}

// ── In-memory backend ───────────────────────────────────────────────

/// Volatile backend; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: DashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

// ── File backend ────────────────────────────────────────────────────

/// One JSON document mapping key → JSON-encoded value string.
///
/// Loaded once on open; every write rewrites the whole document through a
/// temp file + rename so a crash never leaves a half-written file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: DashMap<String, String>,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Open (or lazily create) the document at `path`.
    ///
    /// A missing file is an empty store. An unreadable or malformed file is
    /// logged and treated as empty; it is replaced on the next write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = DashMap::new();

        match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<BTreeMap<String, String>>(&text) {
                Ok(map) => {
                    debug!(path = %path.display(), entries = map.len(), "preferences loaded");
                    for (key, value) in map {
                        entries.insert(key, value);
                    }
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring malformed preference file");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read preference file");
            }
        }

        Self {
            path,
            entries,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let snapshot: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_vec_pretty(&snapshot).map_err(|source| StoreError::Encode {
            key: "<document>".into(),
            source,
        })?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(&body).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl KvBackend for FileBackend {
    fn get_raw(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        self.flush()
    }

    fn remove_raw(&self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }
}

// ── Namespaced typed view ───────────────────────────────────────────

/// Typed, optionally namespaced view over a [`KvBackend`].
///
/// `with_namespace("abc")` maps key `sortOrder` to `abc_sortOrder` in the
/// shared backend.
#[derive(Debug, Clone)]
pub struct KvStore {
    backend: Arc<dyn KvBackend>,
    namespace: Option<String>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            backend,
            namespace: None,
        }
    }

    /// In-memory store, mostly for tests.
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Same backend, keys prefixed with `"{scope}_"`.
    pub fn with_namespace(&self, scope: &str) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            namespace: Some(scope.to_owned()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn full_key(&self, key: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}_{key}"),
            None => key.to_owned(),
        }
    }

    /// Decode an entry. Missing and malformed entries both read as `None`;
    /// malformed ones are logged.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full = self.full_key(key);
        let raw = self.backend.get_raw(&full)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %full, error = %e, "ignoring malformed preference");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let full = self.full_key(key);
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
            key: full.clone(),
            source,
        })?;
        self.backend.set_raw(&full, raw)
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove_raw(&self.full_key(key))
    }

    /// Whether a raw entry exists, decodable or not.
    pub fn contains(&self, key: &str) -> bool {
        self.backend.get_raw(&self.full_key(key)).is_some()
    }

    /// Keys visible in this view, with the namespace prefix stripped.
    ///
    /// The root view lists only keys that carry no namespace of their own,
    /// i.e. those in `known`.
    pub fn keys(&self, known: &[&str]) -> Vec<String> {
        let mut keys: Vec<String> = match &self.namespace {
            Some(ns) => {
                let prefix = format!("{ns}_");
                self.backend
                    .keys()
                    .into_iter()
                    .filter_map(|k| k.strip_prefix(&prefix).map(str::to_owned))
                    .filter(|k| known.contains(&k.as_str()))
                    .collect()
            }
            None => self
                .backend
                .keys()
                .into_iter()
                .filter(|k| known.contains(&k.as_str()))
                .collect(),
        };
        keys.sort();
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn namespace_prefixes_keys() {
        let root = KvStore::memory();
        let scoped = root.with_namespace("panel1");
        scoped.set("sortOrder", &json!(["name-a"])).unwrap();

        assert!(root.contains("panel1_sortOrder"));
        assert!(!root.contains("sortOrder"));
        assert_eq!(scoped.get::<Vec<String>>("sortOrder").unwrap(), ["name-a"]);
        assert_eq!(scoped.keys(&["sortOrder", "uiState"]), ["sortOrder"]);
        assert!(root.keys(&["sortOrder"]).is_empty());
    }

    #[test]
    fn malformed_entry_reads_as_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_raw("clientsPerPage", "{not json".into()).unwrap();
        backend.set_raw("themeMode", "\"dark\"".into()).unwrap();
        let store = KvStore::new(backend);

        assert!(store.get::<u32>("clientsPerPage").is_none());
        assert!(store.contains("clientsPerPage"));
        assert_eq!(store.get::<String>("themeMode").as_deref(), Some("dark"));
    }

    #[test]
    fn file_backend_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let backend = FileBackend::open(&path);
        backend.set_raw("a", "1".into()).unwrap();
        backend.set_raw("b", "\"x\"".into()).unwrap();
        backend.remove_raw("a").unwrap();

        let reopened = FileBackend::open(&path);
        assert_eq!(reopened.get_raw("b").as_deref(), Some("\"x\""));
        assert!(reopened.get_raw("a").is_none());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "garbage").unwrap();

        let backend = FileBackend::open(&path);
        assert!(backend.keys().is_empty());
        backend.set_raw("k", "true".into()).unwrap();
        assert_eq!(FileBackend::open(&path).get_raw("k").as_deref(), Some("true"));
    }
}
