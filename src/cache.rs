use std::{
    collections::{BTreeMap, HashMap},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use thiserror::Error;

use crate::{model::Coordinate, normalize::clean_whitespace, resolver::Resolution};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode cache: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn cache_key(raw: &str) -> String {
    clean_whitespace(raw).to_uppercase()
}

// older cache files store `[lat, lon]` pairs
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCoordinate {
    Object(Coordinate),
    Pair([Option<f64>; 2]),
}

impl From<StoredCoordinate> for Coordinate {
    fn from(value: StoredCoordinate) -> Self {
        match value {
            StoredCoordinate::Object(x) => x,
            StoredCoordinate::Pair([lat, lon]) => Self { lat, lon },
        }
    }
}

#[derive(Default)]
pub struct PersistentCache {
    entries: RwLock<BTreeMap<String, Coordinate>>,
}

impl PersistentCache {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        let raw: BTreeMap<String, StoredCoordinate> = match read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|x| serde_json::from_str(&x).map_err(|e| e.to_string()))
        {
            Ok(x) => x,
            Err(e) => {
                log::warn!("ignoring cache {}: {e}", path.display());
                return Self::default();
            }
        };

        let entries = raw.into_iter().map(|(k, v)| (k, v.into())).collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let mut output = serde_json::to_string_pretty(&*self.entries.read())?;
        output.push('\n');
        write(path, output).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, key: &str) -> Option<Coordinate> {
        self.entries.read().get(key).copied()
    }

    pub fn insert(&self, key: String, value: Coordinate) {
        self.entries.write().insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn resolved(&self) -> usize {
        self.entries.read().values().filter(|x| x.is_resolved()).count()
    }
}

type Slot = Arc<Mutex<Option<Resolution>>>;

// a slot stays locked while its key resolves, so each key resolves once per run
#[derive(Default)]
pub struct RunMemo {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RunMemo {
    pub fn get_or_resolve(&self, key: &str, resolve: impl FnOnce() -> Resolution) -> Resolution {
        let slot = self.slots.lock().entry(key.to_string()).or_default().clone();

        let mut slot = slot.lock();
        if let Some(x) = slot.as_ref() {
            return x.clone();
        }
        let resolution = resolve();
        *slot = Some(resolution.clone());
        resolution
    }
}
