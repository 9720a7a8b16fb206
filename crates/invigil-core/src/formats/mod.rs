//! # Formats Module
//!
//! Binary encoding of snapshots for the redb backend.
//! The JSON document format lives in `export`.

pub mod persistence;

pub use persistence::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
