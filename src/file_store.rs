//! JSON-file store for the native binary. Several processes may share one
//! file; each sees the others' writes through [`FileStore::poll_changes`].

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::storage::{KeyValueStore, StorageChange};

type Items = BTreeMap<String, String>;

pub struct FileStore {
    path: PathBuf,
    cache: Items,
    pending: Vec<StorageChange>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let cache = read_items(&path)?;
        log::debug!("opened store {} ({} keys)", path.display(), cache.len());
        Ok(Self {
            path,
            cache,
            pending: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-reads the file and reports every key whose value differs from what
    /// this process last saw. Own writes never show up here.
    pub fn poll_changes(&mut self) -> Result<Vec<StorageChange>, StoreError> {
        let on_disk = read_items(&self.path)?;
        let mut changes = std::mem::take(&mut self.pending);
        changes.extend(diff(&self.cache, &on_disk));
        self.cache = on_disk;
        Ok(changes)
    }

    fn update(&mut self, apply: impl FnOnce(&mut Items) -> bool) -> Result<(), StoreError> {
        // Merge onto the latest file contents so other processes' keys survive.
        // Whatever they changed since the last poll is still owed to the caller.
        let mut items = read_items(&self.path)?;
        let missed = diff(&self.cache, &items);
        self.pending.extend(missed);
        if apply(&mut items) {
            write_items(&self.path, &items)?;
        }
        self.cache = items;
        Ok(())
    }
}

fn diff(seen: &Items, on_disk: &Items) -> Vec<StorageChange> {
    if seen == on_disk {
        return Vec::new();
    }
    if on_disk.is_empty() {
        return vec![StorageChange::cleared()];
    }
    let mut changes = Vec::new();
    for (key, value) in on_disk {
        if seen.get(key) != Some(value) {
            changes.push(StorageChange::set(key, value));
        }
    }
    for key in seen.keys() {
        if !on_disk.contains_key(key) {
            changes.push(StorageChange::removed(key));
        }
    }
    changes
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.update(|items| {
            let previous = items.insert(key.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.update(|items| items.remove(key).is_some())
    }
}

fn read_items(path: &Path) -> Result<Items, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Items::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if text.trim().is_empty() {
        return Ok(Items::new());
    }
    match serde_json::from_str(&text) {
        Ok(items) => Ok(items),
        Err(e) => {
            // The next write replaces it.
            log::warn!("ignoring unreadable store {}: {}", path.display(), e);
            Ok(Items::new())
        }
    }
}

fn write_items(path: &Path, items: &Items) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = serde_json::to_string_pretty(items).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, text).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
