//! # JSON File Store
//!
//! One pretty-printed snapshot document per owner key, at
//! `<dir>/<owner_key>.json`. Writes go to a temporary file in the same
//! directory which is then renamed over the target.

use super::{SnapshotStore, validate_owner_key};
use crate::export::{export_json, load_json};
use crate::store::Roster;
use crate::{InvigilError, Snapshot};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Use `dir` for snapshot files, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, InvigilError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| InvigilError::Persistence(e.to_string()))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding the snapshot of `owner_key`.
    pub fn path_for(&self, owner_key: &str) -> Result<PathBuf, InvigilError> {
        validate_owner_key(owner_key)?;
        Ok(self.dir.join(format!("{}.json", owner_key)))
    }
}

impl SnapshotStore for FileSnapshotStore {
    /// Keys absent from the stored document fall back to a fresh dataset.
    fn load(&self, owner_key: &str) -> Result<Option<Snapshot>, InvigilError> {
        let path = self.path_for(owner_key)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(InvigilError::Persistence(e.to_string())),
        };
        load_json(&text, Roster::seeded().to_snapshot()).map(Some)
    }

    fn save(&self, owner_key: &str, snapshot: &Snapshot) -> Result<(), InvigilError> {
        let path = self.path_for(owner_key)?;
        let text = export_json(snapshot)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| InvigilError::Persistence(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| InvigilError::Persistence(e.to_string()))
    }
}
