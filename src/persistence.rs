//! Version persistence
//!
//! The reconciliation engine only ever reads a [`VersionSnapshot`]: an
//! immutable view of the versions stored for an entry before the pass
//! started. Writing the merged result back is the caller's job, through
//! [`VersionPersistence::save`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{Entry, Version};
use crate::path::encode_entry_path;

/// Previously persisted versions of one entry, keyed by version name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionSnapshot {
    versions: BTreeMap<String, Version>,
}

impl VersionSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_versions(versions: BTreeMap<String, Version>) -> Self {
        Self { versions }
    }

    pub fn from_entry(entry: &Entry) -> Self {
        Self::from_versions(entry.versions.clone())
    }

    pub fn get(&self, name: &str) -> Option<&Version> {
        self.versions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Version> {
        self.versions.values()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// "Existing version by name" lookups for an entry path
/// (`<host>/<org>/<repo>[/<entry>]`).
pub trait ExistingVersionLookup: Send + Sync {
    fn existing_versions(&self, entry_path: &str) -> Result<VersionSnapshot>;
}

/// Accepts merged entries for write-back.
pub trait VersionPersistence: ExistingVersionLookup {
    fn save(&self, entry: &Entry) -> Result<()>;

    fn load_entry(&self, entry_path: &str) -> Result<Option<Entry>>;

    /// Every stored entry, ordered by path.
    fn entries(&self) -> Result<Vec<Entry>>;
}

/// Entries held in process memory. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryVersionStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries.lock().map_err(|_| Error::LockPoisoned {
            context: "version store".to_string(),
        })
    }
}

impl ExistingVersionLookup for MemoryVersionStore {
    fn existing_versions(&self, entry_path: &str) -> Result<VersionSnapshot> {
        Ok(self
            .lock()?
            .get(entry_path)
            .map(VersionSnapshot::from_entry)
            .unwrap_or_default())
    }
}

impl VersionPersistence for MemoryVersionStore {
    fn save(&self, entry: &Entry) -> Result<()> {
        self.lock()?.insert(entry.path(), entry.clone());
        Ok(())
    }

    fn load_entry(&self, entry_path: &str) -> Result<Option<Entry>> {
        Ok(self.lock()?.get(entry_path).cloned())
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        let mut entries: Vec<Entry> = self.lock()?.values().cloned().collect();
        entries.sort_by_key(|e| e.path());
        Ok(entries)
    }
}

/// One pretty-printed JSON file per entry inside a state directory.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    dir: PathBuf,
}

impl JsonStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, entry_path: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_entry_path(entry_path)))
    }

    fn read(path: &Path) -> Result<Entry> {
        let text = fs::read_to_string(path).map_err(|e| Error::Persistence {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Persistence {
            message: format!("{} is not a valid entry: {}", path.display(), e),
        })
    }
}

impl ExistingVersionLookup for JsonStateStore {
    fn existing_versions(&self, entry_path: &str) -> Result<VersionSnapshot> {
        Ok(self
            .load_entry(entry_path)?
            .map(|entry| VersionSnapshot::from_entry(&entry))
            .unwrap_or_default())
    }
}

impl VersionPersistence for JsonStateStore {
    fn save(&self, entry: &Entry) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::Persistence {
            message: format!("cannot create {}: {}", self.dir.display(), e),
        })?;
        let target = self.file_for(&entry.path());
        let staging = target.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(entry)?;
        fs::write(&staging, text)?;
        fs::rename(&staging, &target)?;
        log::debug!("Saved {} to {}", entry.path(), target.display());
        Ok(())
    }

    fn load_entry(&self, entry_path: &str) -> Result<Option<Entry>> {
        let path = self.file_for(entry_path);
        if !path.is_file() {
            return Ok(None);
        }
        let entry = Self::read(&path)?;
        // Encoded names may collide; the stored path is authoritative.
        Ok((entry.path() == entry_path).then_some(entry))
    }

    fn entries(&self) -> Result<Vec<Entry>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                entries.push(Self::read(&path)?);
            }
        }
        entries.sort_by_key(|e| e.path());
        Ok(entries)
    }
}
