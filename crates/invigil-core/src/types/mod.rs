//! # Core Type Definitions
//!
//! This module contains the domain types for the assignment engine:
//! - Identifiers (`TeacherId`, `ExamId`)
//! - Records (`Teacher`, `Exam`, `Settings`)
//! - Scheduling vocabulary (`Slot`, `Role`, `Seat`, `Grade`)
//! - The staged edit buffer (`ExamDraft`)
//! - Error types (`InvigilError`, `ErrorKind`)
//!
//! ## Seat References
//!
//! Role arrays hold `Seat = Option<TeacherId>`. A teacher's display name is
//! looked up only when something is presented, so renaming a teacher never
//! touches exam records.

use crate::primitives::{
    DATE_FORMAT, DEFAULT_EXAM_PERIOD, DEFAULT_GRADE_LEVEL, DEFAULT_PRINCIPAL_NAME,
    DEFAULT_SCHOOL_NAME, EXAMINER_TITLE, MERGE_SEPARATOR, PROCTOR_TITLE, TIME_FORMAT,
};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Unique identifier of a teacher (staff member).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeacherId(pub u64);

/// Unique identifier of an exam session record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExamId(pub u64);

impl fmt::Display for TeacherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A seat in a role array. `None` is an unfilled seat.
pub type Seat = Option<TeacherId>;

// =============================================================================
// TEACHER
// =============================================================================

/// A staff member who can be seated as examiner or proctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    /// Display name. Never empty for teachers created through the editor.
    pub name: String,
    /// Subject or department; may be empty.
    pub branch: String,
}

impl Teacher {
    #[must_use]
    pub fn new(id: TeacherId, name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            branch: branch.into(),
        }
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// The two role arrays of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Commission member grading the exam.
    Examiner,
    /// Invigilator supervising the room.
    Proctor,
}

impl Role {
    /// The role array that is not `self`.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Role::Examiner => Role::Proctor,
            Role::Proctor => Role::Examiner,
        }
    }

    /// Title printed on assignment notices.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Role::Examiner => EXAMINER_TITLE,
            Role::Proctor => PROCTOR_TITLE,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Examiner => "examiner",
            Role::Proctor => "proctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = InvigilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "examiner" | "examiners" => Ok(Role::Examiner),
            "proctor" | "proctors" => Ok(Role::Proctor),
            _ => Err(InvigilError::InvalidValue {
                field: "role",
                value: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// GRADE
// =============================================================================

/// Grade label of an exam, e.g. `"9. Sınıf"`.
///
/// Standard levels are 9 through 12. Merged exams carry a combined label
/// such as `"9. Sınıf / 10. Sınıf"`, so the label is kept as free text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Grade(pub String);

impl Grade {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Label for a standard grade level.
    #[must_use]
    pub fn level(level: u8) -> Self {
        Self(format!("{}. Sınıf", level))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Label of a merge: the target label when both agree, otherwise both
    /// joined source-first.
    #[must_use]
    pub fn combine(source: &Grade, target: &Grade) -> Grade {
        if source == target {
            target.clone()
        } else {
            Grade(format!("{}{}{}", source.0, MERGE_SEPARATOR, target.0))
        }
    }
}

impl Default for Grade {
    fn default() -> Self {
        Self::level(DEFAULT_GRADE_LEVEL)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SLOT
// =============================================================================

/// A (date, time) pair identifying concurrent exam sessions.
///
/// Orders by date, then time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Slot {
    #[must_use]
    pub const fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self { date, time }
    }

    /// Parse a slot from `YYYY-MM-DD` and `HH:MM` strings.
    pub fn parse(date: &str, time: &str) -> Result<Self, InvigilError> {
        Ok(Self::new(parse_date(date)?, parse_time(time)?))
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.date.format(DATE_FORMAT),
            self.time.format(TIME_FORMAT)
        )
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Result<NaiveDate, InvigilError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| InvigilError::InvalidValue {
        field: "date",
        value: value.to_string(),
    })
}

/// Parse a time of day in `HH:MM` form (`HH:MM:SS` is accepted too).
pub fn parse_time(value: &str) -> Result<NaiveTime, InvigilError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| InvigilError::InvalidValue {
            field: "time",
            value: value.to_string(),
        })
}

// =============================================================================
// EXAM
// =============================================================================

/// A committed exam session with its staffing.
///
/// `examiners.len()` and `proctors.len()` are the examiner/proctor counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub slot: Slot,
    pub subject: String,
    pub grade: Grade,
    pub student_count: u32,
    pub examiners: Vec<Seat>,
    pub proctors: Vec<Seat>,
}

impl Exam {
    /// The role array for `role`.
    #[must_use]
    pub fn seats(&self, role: Role) -> &[Seat] {
        match role {
            Role::Examiner => &self.examiners,
            Role::Proctor => &self.proctors,
        }
    }

    /// Mutable access to the role array for `role`.
    pub fn seats_mut(&mut self, role: Role) -> &mut Vec<Seat> {
        match role {
            Role::Examiner => &mut self.examiners,
            Role::Proctor => &mut self.proctors,
        }
    }

    /// All filled seats across both role arrays, examiners first.
    pub fn assigned(&self) -> impl Iterator<Item = TeacherId> + '_ {
        self.examiners
            .iter()
            .chain(self.proctors.iter())
            .filter_map(|seat| *seat)
    }

    /// Whether `teacher` sits anywhere in `role`.
    #[must_use]
    pub fn has_role(&self, teacher: TeacherId, role: Role) -> bool {
        self.seats(role).contains(&Some(teacher))
    }

    /// Whether `teacher` sits anywhere in this exam.
    #[must_use]
    pub fn holds(&self, teacher: TeacherId) -> bool {
        self.has_role(teacher, Role::Examiner) || self.has_role(teacher, Role::Proctor)
    }

    /// The role `teacher` holds here. Examiner wins if both arrays name them.
    #[must_use]
    pub fn role_of(&self, teacher: TeacherId) -> Option<Role> {
        if self.has_role(teacher, Role::Examiner) {
            Some(Role::Examiner)
        } else if self.has_role(teacher, Role::Proctor) {
            Some(Role::Proctor)
        } else {
            None
        }
    }

    /// Vacate every seat held by `teacher`. Returns the number of seats freed.
    pub fn vacate(&mut self, teacher: TeacherId) -> usize {
        let mut freed = 0;
        for seat in self.examiners.iter_mut().chain(self.proctors.iter_mut()) {
            if *seat == Some(teacher) {
                *seat = None;
                freed += 1;
            }
        }
        freed
    }
}

// =============================================================================
// EXAM DRAFT (edit buffer)
// =============================================================================

/// An exam being composed before it is committed.
///
/// Date and time are optional here; the editor rejects a commit without them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamDraft {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub subject: String,
    pub grade: Grade,
    pub student_count: u32,
    pub examiners: Vec<Seat>,
    pub proctors: Vec<Seat>,
}

impl Default for ExamDraft {
    fn default() -> Self {
        Self {
            date: None,
            time: None,
            subject: String::new(),
            grade: Grade::default(),
            student_count: 0,
            examiners: vec![None],
            proctors: vec![None],
        }
    }
}

impl ExamDraft {
    /// A draft pre-filled from a committed exam (for in-place editing).
    #[must_use]
    pub fn from_exam(exam: &Exam) -> Self {
        Self {
            date: Some(exam.slot.date),
            time: Some(exam.slot.time),
            subject: exam.subject.clone(),
            grade: exam.grade.clone(),
            student_count: exam.student_count,
            examiners: exam.examiners.clone(),
            proctors: exam.proctors.clone(),
        }
    }

    /// The slot, once both date and time are chosen.
    #[must_use]
    pub fn slot(&self) -> Option<Slot> {
        match (self.date, self.time) {
            (Some(date), Some(time)) => Some(Slot::new(date, time)),
            _ => None,
        }
    }

    #[must_use]
    pub fn seats(&self, role: Role) -> &[Seat] {
        match role {
            Role::Examiner => &self.examiners,
            Role::Proctor => &self.proctors,
        }
    }

    pub fn seats_mut(&mut self, role: Role) -> &mut Vec<Seat> {
        match role {
            Role::Examiner => &mut self.examiners,
            Role::Proctor => &mut self.proctors,
        }
    }

    /// Change the seat count of `role`.
    ///
    /// Seats keep their index; growing pads with empty seats, shrinking drops
    /// the tail. Dropped assignments are not restored by growing again.
    pub fn resize(&mut self, role: Role, count: usize) {
        self.seats_mut(role).resize(count, None);
    }

    /// Put `seat` at `index` of `role`.
    pub fn assign(&mut self, role: Role, index: usize, seat: Seat) -> Result<(), InvigilError> {
        let seats = self.seats_mut(role);
        let len = seats.len();
        match seats.get_mut(index) {
            Some(slot) => {
                *slot = seat;
                Ok(())
            }
            None => Err(InvigilError::SeatOutOfRange { role, index, len }),
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Global settings printed on notices and constraining exam slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub school_name: String,
    pub exam_period: String,
    pub principal_name: String,
    /// Dates exams may be scheduled on. Empty means unrestricted.
    pub allowed_dates: BTreeSet<NaiveDate>,
    /// Times exams may start at. Empty means unrestricted.
    pub allowed_times: BTreeSet<NaiveTime>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            school_name: DEFAULT_SCHOOL_NAME.to_string(),
            exam_period: DEFAULT_EXAM_PERIOD.to_string(),
            principal_name: DEFAULT_PRINCIPAL_NAME.to_string(),
            allowed_dates: BTreeSet::new(),
            allowed_times: BTreeSet::new(),
        }
    }
}

impl Settings {
    /// Whether `date` may be used for an exam.
    #[must_use]
    pub fn allows_date(&self, date: NaiveDate) -> bool {
        self.allowed_dates.is_empty() || self.allowed_dates.contains(&date)
    }

    /// Whether `time` may be used for an exam.
    #[must_use]
    pub fn allows_time(&self, time: NaiveTime) -> bool {
        self.allowed_times.is_empty() || self.allowed_times.contains(&time)
    }
}

/// A partial settings update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub school_name: Option<String>,
    pub exam_period: Option<String>,
    pub principal_name: Option<String>,
    pub allowed_dates: Option<BTreeSet<NaiveDate>>,
    pub allowed_times: Option<BTreeSet<NaiveTime>>,
}

impl SettingsPatch {
    /// Apply the present keys over `settings`.
    pub fn apply_to(self, settings: &mut Settings) {
        if let Some(v) = self.school_name {
            settings.school_name = v;
        }
        if let Some(v) = self.exam_period {
            settings.exam_period = v;
        }
        if let Some(v) = self.principal_name {
            settings.principal_name = v;
        }
        if let Some(v) = self.allowed_dates {
            settings.allowed_dates = v;
        }
        if let Some(v) = self.allowed_times {
            settings.allowed_times = v;
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// The full dataset: the unit of persistence, import and export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub exams: Vec<Exam>,
    pub teachers: Vec<Teacher>,
    pub settings: Settings,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the assignment engine.
///
/// Every failing operation leaves the store in its last valid state.
#[derive(Debug, Error)]
pub enum InvigilError {
    /// A required field was left empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A field value could not be parsed.
    #[error("Invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },

    /// The exam date is not one of the allowed dates.
    #[error("Date {0} is not an allowed exam date")]
    DateNotAllowed(NaiveDate),

    /// The exam time is not one of the allowed times.
    #[error("Time {0} is not an allowed exam time")]
    TimeNotAllowed(NaiveTime),

    /// The teacher already sits in another exam at the same slot.
    #[error("Teacher {teacher} is already assigned at {slot} in exam {exam}")]
    SlotConflict {
        teacher: TeacherId,
        slot: Slot,
        exam: ExamId,
    },

    /// The teacher is seated more than once within one exam.
    #[error("Teacher {0} is seated more than once in the same exam")]
    DuplicateSeat(TeacherId),

    /// A seat index past the end of the role array.
    #[error("Seat {index} is out of range for {role} (count {len})")]
    SeatOutOfRange { role: Role, index: usize, len: usize },

    /// A role array longer than the supported maximum.
    #[error("Too many {role} seats: {count} (max {max})")]
    TooManySeats { role: Role, count: usize, max: usize },

    /// The referenced teacher does not exist.
    #[error("Teacher not found: {0}")]
    TeacherNotFound(TeacherId),

    /// The referenced exam does not exist.
    #[error("Exam not found: {0}")]
    ExamNotFound(ExamId),

    /// An imported or stored snapshot has the wrong shape.
    #[error("Invalid snapshot format: {0}")]
    Format(String),

    /// Encoding a snapshot failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The storage backend failed.
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Coarse classification of [`InvigilError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected input; nothing was changed.
    Validation,
    /// A referenced record is missing.
    NotFound,
    /// Malformed snapshot text or bytes.
    Format,
    /// Storage failure.
    Persistence,
}

impl InvigilError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            InvigilError::MissingField(_)
            | InvigilError::InvalidValue { .. }
            | InvigilError::DateNotAllowed(_)
            | InvigilError::TimeNotAllowed(_)
            | InvigilError::SlotConflict { .. }
            | InvigilError::DuplicateSeat(_)
            | InvigilError::SeatOutOfRange { .. }
            | InvigilError::TooManySeats { .. } => ErrorKind::Validation,
            InvigilError::TeacherNotFound(_) | InvigilError::ExamNotFound(_) => {
                ErrorKind::NotFound
            }
            InvigilError::Format(_) | InvigilError::Serialization(_) => ErrorKind::Format,
            InvigilError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
