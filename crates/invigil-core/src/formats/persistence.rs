//! # Persistence Format
//!
//! Binary serialization for roster snapshots.
//!
//! Format: Header (5 bytes) + postcard-serialized snapshot.
//! - 4 bytes: Magic ("INVG")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, and the
//! decoded snapshot is checked against the roster invariants.

use crate::export::validate;
use crate::primitives::{FORMAT_VERSION, MAGIC_BYTES, MAX_SNAPSHOT_SIZE};
use crate::{InvigilError, Snapshot};

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The persistence header precedes every stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *MAGIC_BYTES,
            version: FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), InvigilError> {
        if &self.magic != MAGIC_BYTES {
            return Err(InvigilError::Serialization(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != FORMAT_VERSION {
            return Err(InvigilError::Serialization(format!(
                "Unsupported version: {} (expected {})",
                self.version, FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InvigilError> {
        let (Some(magic), Some(&version)) = (bytes.get(0..4), bytes.get(4)) else {
            return Err(InvigilError::Serialization(
                "Header too short".to_string(),
            ));
        };
        let mut header = Self::new();
        header.magic.copy_from_slice(magic);
        header.version = version;
        Ok(header)
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Encode a snapshot (header + payload). No I/O.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, InvigilError> {
    let payload =
        postcard::to_stdvec(snapshot).map_err(|e| InvigilError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
    bytes.extend_from_slice(&PersistenceHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a snapshot. No I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, InvigilError> {
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(InvigilError::Serialization(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();
    let snapshot: Snapshot = postcard::from_bytes(payload).map_err(|e| {
        InvigilError::Serialization(format!("Failed to deserialize snapshot: {}", e))
    })?;
    validate(&snapshot)?;
    Ok(snapshot)
}
