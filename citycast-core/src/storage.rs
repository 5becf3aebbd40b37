//! Key-value persistence for city lists, the last viewed city and the
//! country cache.

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Key holding the serialized city directory.
pub const CITY_LIST_KEY: &str = "cityList";
/// Key holding the last viewed city.
pub const DEFAULT_CITY_KEY: &str = "defaultCity";
/// Key holding the cached country list.
pub const COUNTRIES_KEY: &str = "countries";

/// A blob store addressed by string keys.
pub trait Store: Send + Sync + Debug {
    /// Returns `None` when nothing was saved under `key` yet.
    fn load(&self, key: &str) -> Result<Option<String>>;

    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<key>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(anyhow!("Invalid storage key '{key}'"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Store for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read stored data: {}", path.display()))?;
        Ok(Some(contents))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create data directory: {}", self.dir.display())
        })?;

        fs::write(&path, value)
            .with_context(|| format!("Failed to write stored data: {}", path.display()))?;

        tracing::debug!(key, path = %path.display(), "saved blob");
        Ok(())
    }
}

/// In-process store that counts its writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.blobs.lock().ok().and_then(|blobs| blobs.get(key).cloned())
    }
}

impl Store for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        blobs.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
