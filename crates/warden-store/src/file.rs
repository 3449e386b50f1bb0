//! File-backed storage backend.
//!
//! All entries live in one JSON object on disk:
//!
//! ```json
//! { "accessToken": "eyJ...", "user": "{\"id\":\"u-1\",...}" }
//! ```
//!
//! Reads are served from an in-memory copy loaded at open time. Every
//! write rewrites the whole file: the new document goes to a temp file
//! next to the target, then is renamed over it. A rename within one
//! directory is atomic, so a crash leaves either the old or the new
//! document, never a truncated one.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rand::Rng;

use crate::{KeyValueStore, StoreError};

/// A [`KeyValueStore`] persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// A missing file is an empty store. A file that isn't a JSON object
    /// of strings is discarded with a warning: stale credentials are not
    /// worth refusing to start over.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file exists but can't be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries: BTreeMap<String, String> = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "credential file is corrupt, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                BTreeMap::new()
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        tracing::debug!(
            path = %path.display(),
            entries = entries.len(),
            "credential file opened"
        );
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to the entries and persists the result.
    ///
    /// The in-memory copy is only replaced once the file write succeeded,
    /// so memory and disk never disagree.
    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        change(&mut next);
        if next == *entries {
            return Ok(());
        }
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let suffix: u64 = rand::rng().random();
        let tmp = self.path.with_extension(format!("tmp-{suffix:016x}"));

        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn set_many(&self, batch: Vec<(&str, String)>) -> Result<(), StoreError> {
        self.update(|entries| {
            for (key, value) in batch {
                entries.insert(key.to_string(), value);
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StoreError> {
        self.update(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}
