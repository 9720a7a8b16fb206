//! # Engine Primitives
//!
//! Fixed constants of the assignment engine: wire formats, limits, defaults
//! for a fresh dataset, and the labels printed on notices.

// =============================================================================
// FORMATS
// =============================================================================

/// Magic bytes for the binary snapshot header.
pub const MAGIC_BYTES: &[u8; 4] = b"INVG";

/// Current binary snapshot format version.
///
/// Increment this when making breaking changes to the binary layout.
pub const FORMAT_VERSION: u8 = 1;

/// Calendar date format used on the wire and in output.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time-of-day format used on the wire and in output.
pub const TIME_FORMAT: &str = "%H:%M";

/// Separator placed between subjects and grades of merged exams.
pub const MERGE_SEPARATOR: &str = " / ";

// =============================================================================
// LIMITS
// =============================================================================

/// Maximum seats in a single role array.
pub const MAX_ROLE_SEATS: usize = 64;

/// Maximum length of teacher names, branches and subjects, in characters.
pub const MAX_TEXT_LENGTH: usize = 256;

/// Maximum size of a snapshot payload (binary or JSON text).
///
/// Checked before any decoding happens.
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Quiet period after the last edit before the snapshot is written.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 1500;

/// Owner key used when none is configured.
pub const DEFAULT_OWNER_KEY: &str = "default";

// =============================================================================
// DEFAULTS FOR A FRESH DATASET
// =============================================================================

pub const DEFAULT_SCHOOL_NAME: &str = "İBNİ SİNA MESLEKİ VE TEKNİK ANADOLU LİSESİ";
pub const DEFAULT_EXAM_PERIOD: &str = "2024-2025 EĞİTİM ÖĞRETİM YILI ŞUBAT DÖNEMİ";
pub const DEFAULT_PRINCIPAL_NAME: &str = "Okul Müdürü Adı";

/// Grade level of a new exam draft.
pub const DEFAULT_GRADE_LEVEL: u8 = 9;

/// Grade levels offered for exams.
pub const STANDARD_GRADE_LEVELS: [u8; 4] = [9, 10, 11, 12];

/// The example teacher seeded into an empty dataset.
pub const SAMPLE_TEACHER_NAME: &str = "Örnek Öğretmen";
pub const SAMPLE_TEACHER_BRANCH: &str = "Matematik";

// =============================================================================
// NOTICE LABELS
// =============================================================================

/// Duty title for examiners (commission members).
pub const EXAMINER_TITLE: &str = "KOMİSYON ÜYESİ";

/// Duty title for proctors.
pub const PROCTOR_TITLE: &str = "GÖZETMEN";
