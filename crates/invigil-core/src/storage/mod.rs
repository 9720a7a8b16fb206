//! # Snapshot Storage
//!
//! Backends that load and save whole snapshots per owner key.
//!
//! Stores are synchronous. The app decides when to call `save` (debounced)
//! and logs failures; nothing here retries.

pub mod file_store;
pub mod redb_store;

pub use file_store::FileSnapshotStore;
pub use redb_store::RedbSnapshotStore;

use crate::{InvigilError, Snapshot};

/// A place snapshots can be loaded from and saved to.
pub trait SnapshotStore: Send + Sync {
    /// The stored snapshot for `owner_key`, or `None` if nothing was saved yet.
    fn load(&self, owner_key: &str) -> Result<Option<Snapshot>, InvigilError>;

    /// Overwrite the stored snapshot for `owner_key`.
    fn save(&self, owner_key: &str, snapshot: &Snapshot) -> Result<(), InvigilError>;
}

/// Reject owner keys that are empty, too long, or not `[A-Za-z0-9_-]`.
pub fn validate_owner_key(owner_key: &str) -> Result<(), InvigilError> {
    let valid = !owner_key.is_empty()
        && owner_key.len() <= 64
        && owner_key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(InvigilError::InvalidValue {
            field: "owner_key",
            value: owner_key.to_string(),
        })
    }
}
