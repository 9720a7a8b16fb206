//! # redb Snapshot Store
//!
//! Snapshots kept in an embedded redb database, one row per owner key in the
//! `snapshots` table. Values use the binary persistence format.

use super::{SnapshotStore, validate_owner_key};
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::{InvigilError, Snapshot};
use redb::{Database, ReadableDatabase, TableDefinition};
use std::path::Path;

/// Table for snapshots: owner key -> header + postcard bytes
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

fn io_error(e: impl std::fmt::Display) -> InvigilError {
    InvigilError::Persistence(e.to_string())
}

pub struct RedbSnapshotStore {
    db: Database,
}

impl std::fmt::Debug for RedbSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbSnapshotStore").finish_non_exhaustive()
    }
}

impl RedbSnapshotStore {
    /// Open or create the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InvigilError> {
        let db = Database::create(path.as_ref()).map_err(io_error)?;
        {
            let write_txn = db.begin_write().map_err(io_error)?;
            let _ = write_txn.open_table(SNAPSHOTS).map_err(io_error)?;
            write_txn.commit().map_err(io_error)?;
        }
        Ok(Self { db })
    }
}

impl SnapshotStore for RedbSnapshotStore {
    fn load(&self, owner_key: &str) -> Result<Option<Snapshot>, InvigilError> {
        validate_owner_key(owner_key)?;
        let read_txn = self.db.begin_read().map_err(io_error)?;
        let table = read_txn.open_table(SNAPSHOTS).map_err(io_error)?;
        let Some(bytes) = table.get(owner_key).map_err(io_error)? else {
            return Ok(None);
        };
        snapshot_from_bytes(bytes.value()).map(Some)
    }

    fn save(&self, owner_key: &str, snapshot: &Snapshot) -> Result<(), InvigilError> {
        validate_owner_key(owner_key)?;
        let bytes = snapshot_to_bytes(snapshot)?;
        let write_txn = self.db.begin_write().map_err(io_error)?;
        {
            let mut table = write_txn.open_table(SNAPSHOTS).map_err(io_error)?;
            table
                .insert(owner_key, bytes.as_slice())
                .map_err(io_error)?;
        }
        write_txn.commit().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Teacher, TeacherId};
    use tempfile::TempDir;

    #[test]
    fn save_then_load_per_owner() {
        let dir = TempDir::new().expect("tempdir");
        let store = RedbSnapshotStore::open(dir.path().join("invigil.redb")).expect("open");

        let a = Snapshot {
            teachers: vec![Teacher::new(TeacherId(1), "Ali", "")],
            ..Snapshot::default()
        };
        store.save("a", &a).expect("save");
        store.save("b", &Snapshot::default()).expect("save");

        assert_eq!(store.load("a").expect("load"), Some(a));
        assert_eq!(store.load("b").expect("load"), Some(Snapshot::default()));
        assert_eq!(store.load("c").expect("load"), None);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("invigil.redb");
        {
            let store = RedbSnapshotStore::open(&path).expect("open");
            store.save("default", &Snapshot::default()).expect("save");
        }
        let store = RedbSnapshotStore::open(&path).expect("reopen");
        assert!(store.load("default").expect("load").is_some());
    }
}
