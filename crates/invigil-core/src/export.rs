//! # JSON Snapshot Export
//!
//! The `{ "exams", "teachers", "settings" }` document used for backups,
//! import/export and the file storage backend.
//!
//! ## Wire Format
//!
//! Keys are camelCase. Seats are teacher ids or `null`. Reading is lenient
//! where older documents were loose:
//! - seat entries that are strings are matched to a teacher by name; `""`
//!   and unknown names or ids become empty seats
//! - `studentCount` may be a number, a numeric string, or anything else
//!   (read as 0; a string is read up to its first non-digit)
//! - missing or malformed role arrays are empty, and entries that are not a
//!   number or string are empty seats; `examinerCount`/`proctorCount` resize
//!   the arrays when present
//! - ids may be numbers or numeric strings
//!
//! Every document is validated after conversion: unique ids, no teacher
//! seated twice in one exam, no teacher in two exams at the same slot.

use crate::editor::check_seats;
use crate::primitives::{DATE_FORMAT, MAX_ROLE_SEATS, MAX_SNAPSHOT_SIZE, TIME_FORMAT};
use crate::store::Roster;
use crate::{
    Exam, ExamId, Grade, InvigilError, Seat, Settings, SettingsPatch, Slot, Snapshot, Teacher,
    TeacherId, parse_date, parse_time,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Top-level snapshot document. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exams: Option<Vec<ExamRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teachers: Option<Vec<TeacherRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsRecord>,
}

/// A seat as written in a document: a teacher id, or a legacy teacher name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeatRef {
    Id(u64),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    #[serde(default, deserialize_with = "lenient_number")]
    pub id: Option<u64>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub student_count: u32,
    #[serde(default, deserialize_with = "lenient_number")]
    pub examiner_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub proctor_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_seats")]
    pub examiners: Vec<Option<SeatRef>>,
    #[serde(default, deserialize_with = "lenient_seats")]
    pub proctors: Vec<Option<SeatRef>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRecord {
    #[serde(default, deserialize_with = "lenient_number")]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_dates: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_times: Option<Vec<String>>,
}

// =============================================================================
// LENIENT FIELD READERS
// =============================================================================

/// Read a non-negative integer from a number or numeric string.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Read a student count. Anything unreadable is 0.
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n
            .as_u64()
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
            .or_else(|| n.as_f64().map(|f| f as u32))
            .unwrap_or(0),
        Value::String(s) => leading_count(&s),
        _ => 0,
    })
}

/// Read a role array. A value that is not an array is empty, and entries
/// that are neither a number nor a string are empty seats.
fn lenient_seats<'de, D>(deserializer: D) -> Result<Vec<Option<SeatRef>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::Number(n) => n.as_u64().map(SeatRef::Id),
            Value::String(s) => Some(SeatRef::Name(s)),
            _ => None,
        })
        .collect())
}

/// Parse the leading integer of `s`, like a form field read loosely.
/// Negative and missing values are 0.
fn leading_count(s: &str) -> u32 {
    let trimmed = s.trim_start();
    if trimmed.starts_with('-') {
        return 0;
    }
    let digits: String = trimmed
        .trim_start_matches('+')
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u32::MAX)
}

// =============================================================================
// CONVERSION
// =============================================================================

fn format_error(context: &str, err: impl std::fmt::Display) -> InvigilError {
    InvigilError::Format(format!("{}: {}", context, err))
}

impl SnapshotDocument {
    /// Build the full document for `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            exams: Some(snapshot.exams.iter().map(ExamRecord::from).collect()),
            teachers: Some(snapshot.teachers.iter().map(TeacherRecord::from).collect()),
            settings: Some(SettingsRecord::from(&snapshot.settings)),
        }
    }

    /// Whether all three top-level keys are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.exams.is_some() && self.teachers.is_some() && self.settings.is_some()
    }

    /// Convert to a snapshot, using `base` for what the document omits.
    ///
    /// Exams and teachers replace the base collections when present.
    /// Settings merge over the base settings key by key.
    pub fn into_snapshot(self, base: Snapshot) -> Result<Snapshot, InvigilError> {
        let teachers = match self.teachers {
            Some(records) => records
                .into_iter()
                .enumerate()
                .map(|(i, record)| record.into_teacher(i))
                .collect::<Result<Vec<_>, _>>()?,
            None => base.teachers,
        };

        let exams = match self.exams {
            Some(records) => records
                .into_iter()
                .enumerate()
                .map(|(i, record)| record.into_exam(i, &teachers))
                .collect::<Result<Vec<_>, _>>()?,
            None => base.exams,
        };

        let mut settings = base.settings;
        if let Some(record) = self.settings {
            record.into_patch()?.apply_to(&mut settings);
        }

        let snapshot = Snapshot {
            exams,
            teachers,
            settings,
        };
        validate(&snapshot)?;
        Ok(snapshot)
    }
}

impl From<&Exam> for ExamRecord {
    fn from(exam: &Exam) -> Self {
        let seats = |seats: &[Seat]| {
            seats
                .iter()
                .map(|seat| seat.map(|id| SeatRef::Id(id.0)))
                .collect()
        };
        Self {
            id: Some(exam.id.0),
            date: exam.slot.date.format(DATE_FORMAT).to_string(),
            time: exam.slot.time.format(TIME_FORMAT).to_string(),
            subject: exam.subject.clone(),
            grade: Some(exam.grade.0.clone()),
            student_count: exam.student_count,
            examiner_count: Some(exam.examiners.len() as u64),
            proctor_count: Some(exam.proctors.len() as u64),
            examiners: seats(&exam.examiners),
            proctors: seats(&exam.proctors),
        }
    }
}

impl ExamRecord {
    fn into_exam(self, index: usize, teachers: &[Teacher]) -> Result<Exam, InvigilError> {
        let context = format!("exams[{}]", index);
        let id = self
            .id
            .ok_or_else(|| format_error(&context, "missing id"))?;
        let date = parse_date(&self.date).map_err(|e| format_error(&context, e))?;
        let time = parse_time(&self.time).map_err(|e| format_error(&context, e))?;

        let examiners = resolve_seats(&context, self.examiners, self.examiner_count, teachers)?;
        let proctors = resolve_seats(&context, self.proctors, self.proctor_count, teachers)?;

        Ok(Exam {
            id: ExamId(id),
            slot: Slot::new(date, time),
            subject: self.subject,
            grade: self.grade.map(Grade).unwrap_or_default(),
            student_count: self.student_count,
            examiners,
            proctors,
        })
    }
}

fn resolve_seats(
    context: &str,
    refs: Vec<Option<SeatRef>>,
    count: Option<u64>,
    teachers: &[Teacher],
) -> Result<Vec<Seat>, InvigilError> {
    let mut seats: Vec<Seat> = refs
        .into_iter()
        .map(|seat| match seat {
            Some(SeatRef::Id(id)) => teachers
                .iter()
                .find(|t| t.id == TeacherId(id))
                .map(|t| t.id),
            Some(SeatRef::Name(name)) if !name.is_empty() => {
                teachers.iter().find(|t| t.name == name).map(|t| t.id)
            }
            _ => None,
        })
        .collect();

    if let Some(count) = count {
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        if count > MAX_ROLE_SEATS {
            return Err(format_error(context, format!("{} seats exceed the limit", count)));
        }
        seats.resize(count, None);
    }
    if seats.len() > MAX_ROLE_SEATS {
        return Err(format_error(
            context,
            format!("{} seats exceed the limit", seats.len()),
        ));
    }
    Ok(seats)
}

impl From<&Teacher> for TeacherRecord {
    fn from(teacher: &Teacher) -> Self {
        Self {
            id: Some(teacher.id.0),
            name: teacher.name.clone(),
            branch: teacher.branch.clone(),
        }
    }
}

impl TeacherRecord {
    fn into_teacher(self, index: usize) -> Result<Teacher, InvigilError> {
        let context = format!("teachers[{}]", index);
        let id = self
            .id
            .ok_or_else(|| format_error(&context, "missing id"))?;
        Ok(Teacher::new(TeacherId(id), self.name, self.branch))
    }
}

impl From<&Settings> for SettingsRecord {
    fn from(settings: &Settings) -> Self {
        Self {
            school_name: Some(settings.school_name.clone()),
            exam_period: Some(settings.exam_period.clone()),
            principal_name: Some(settings.principal_name.clone()),
            allowed_dates: Some(
                settings
                    .allowed_dates
                    .iter()
                    .map(|d| d.format(DATE_FORMAT).to_string())
                    .collect(),
            ),
            allowed_times: Some(
                settings
                    .allowed_times
                    .iter()
                    .map(|t| t.format(TIME_FORMAT).to_string())
                    .collect(),
            ),
        }
    }
}

impl SettingsRecord {
    fn into_patch(self) -> Result<SettingsPatch, InvigilError> {
        let allowed_dates = self
            .allowed_dates
            .map(|dates| {
                dates
                    .iter()
                    .map(|d| parse_date(d))
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()
            .map_err(|e| format_error("settings.allowedDates", e))?;
        let allowed_times = self
            .allowed_times
            .map(|times| {
                times
                    .iter()
                    .map(|t| parse_time(t))
                    .collect::<Result<BTreeSet<_>, _>>()
            })
            .transpose()
            .map_err(|e| format_error("settings.allowedTimes", e))?;

        Ok(SettingsPatch {
            school_name: self.school_name,
            exam_period: self.exam_period,
            principal_name: self.principal_name,
            allowed_dates,
            allowed_times,
        })
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Check the invariants every stored snapshot must hold.
pub fn validate(snapshot: &Snapshot) -> Result<(), InvigilError> {
    let mut teacher_ids = BTreeSet::new();
    for teacher in &snapshot.teachers {
        if !teacher_ids.insert(teacher.id) {
            return Err(format_error("teachers", format!("duplicate id {}", teacher.id)));
        }
    }
    let mut exam_ids = BTreeSet::new();
    for exam in &snapshot.exams {
        if !exam_ids.insert(exam.id) {
            return Err(format_error("exams", format!("duplicate id {}", exam.id)));
        }
    }

    let roster = Roster::from_snapshot(snapshot.clone());
    for exam in &snapshot.exams {
        check_seats(&roster, exam.slot, exam.assigned(), &[exam.id])
            .map_err(|e| format_error(&format!("exam {}", exam.id), e))?;
    }
    Ok(())
}

// =============================================================================
// ENTRY POINTS
// =============================================================================

/// Serialize a snapshot as pretty-printed JSON.
pub fn export_json(snapshot: &Snapshot) -> Result<String, InvigilError> {
    serde_json::to_string_pretty(&SnapshotDocument::from_snapshot(snapshot))
        .map_err(|e| InvigilError::Serialization(e.to_string()))
}

/// Parse document text without interpreting it.
///
/// The size limit is checked before parsing.
pub fn parse_document(text: &str) -> Result<SnapshotDocument, InvigilError> {
    if text.len() > MAX_SNAPSHOT_SIZE {
        return Err(InvigilError::Format(format!(
            "Document size {} bytes exceeds maximum allowed {} bytes",
            text.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }
    serde_json::from_str(text).map_err(|e| format_error("invalid JSON", e))
}

/// Parse an import. All three top-level keys are required.
pub fn import_json(text: &str) -> Result<Snapshot, InvigilError> {
    let document = parse_document(text)?;
    for (key, present) in [
        ("exams", document.exams.is_some()),
        ("teachers", document.teachers.is_some()),
        ("settings", document.settings.is_some()),
    ] {
        if !present {
            return Err(InvigilError::Format(format!("missing top-level key {:?}", key)));
        }
    }
    document.into_snapshot(Snapshot::default())
}

/// Parse a stored document over `base`. Absent keys keep the base values.
pub fn load_json(text: &str, base: Snapshot) -> Result<Snapshot, InvigilError> {
    parse_document(text)?.into_snapshot(base)
}

// =============================================================================
// TESTS
// =============================================================================
