//! Draft store backed by one JSON file per key.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use evently_core::persistence::{DraftStore, DraftStoreError};

/// Stores each key as `<dir>/<sanitized key>.json`.
///
/// Writes go to a temporary sibling first and are moved into place with a
/// rename, so a crash never leaves a half-written snapshot behind.
#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    /// Open the store, creating `dir` if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, DraftStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

impl DraftStore for FileDraftStore {
    fn get(&self, key: &str) -> Result<Option<String>, DraftStoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        if let Err(e) = write_then_rename(&tmp, &path, value.as_bytes()) {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %tmp.display(), error = %cleanup, "Stale temp file");
                }
            }
            return Err(e.into());
        }
        tracing::debug!(path = %path.display(), bytes = value.len(), "Draft file written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DraftStoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
