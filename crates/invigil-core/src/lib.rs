//! # invigil-core
//!
//! The scheduling and conflict-resolution engine for exam staff assignment.
//!
//! Teachers are seated as examiners (commission members) or proctors in
//! exam sessions. The engine guarantees that no teacher holds two seats at
//! the same (date, time), merges exam sessions, and derives workload
//! statistics and printable notices.
//!
//! ## Components
//!
//! - `store`: the `Roster` of teachers, exams and settings
//! - `availability`: which teachers may fill a seat
//! - `editor`: validated create/update/delete
//! - `merge`: two-step merge of exam sessions
//! - `stats`: per-teacher workload
//! - `notice`: assignment notices and the exam program
//! - `session`: roster plus the volatile edit buffer
//! - `export`, `formats`, `storage`: snapshot documents and backends
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no logging: errors are returned, the app logs them
//! - Every failing operation leaves the roster unchanged

// =============================================================================
// MODULES
// =============================================================================

pub mod availability;
pub mod collation;
pub mod editor;
pub mod export;
pub mod formats;
pub mod merge;
pub mod notice;
pub mod primitives;
pub mod session;
pub mod stats;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ErrorKind, Exam, ExamDraft, ExamId, Grade, InvigilError, Role, Seat, Settings, SettingsPatch,
    Slot, Snapshot, Teacher, TeacherId, parse_date, parse_time,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use availability::Resolver;
pub use editor::Editor;
pub use export::{SnapshotDocument, export_json, import_json, load_json};
pub use merge::{MergeSelection, MergeStep};
pub use notice::{Duty, Notice, ProgramRow};
pub use session::{EditBuffer, Session};
pub use stats::{RosterMetrics, TeacherLoad};
pub use store::Roster;

// =============================================================================
// RE-EXPORTS: Formats & Storage
// =============================================================================

pub use formats::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
pub use storage::{FileSnapshotStore, RedbSnapshotStore, SnapshotStore};
