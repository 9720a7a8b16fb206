//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Dates are `YYYY-MM-DD`, times `HH:MM`,
//! seats are teacher ids or `null`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use invigil_core::{
    Duty, EditBuffer, ErrorKind, Exam, ExamDraft, ExamId, Grade, InvigilError, MergeStep, Notice,
    ProgramRow, Role, Roster, RosterMetrics, Seat, Settings, SettingsPatch, Slot, Teacher,
    TeacherId, parse_date, parse_time,
    primitives::{DATE_FORMAT, TIME_FORMAT},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

fn format_slot(slot: Slot) -> (String, String) {
    (
        slot.date.format(DATE_FORMAT).to_string(),
        slot.time.format(TIME_FORMAT).to_string(),
    )
}

fn seat_ids(seats: &[Seat]) -> Vec<Option<u64>> {
    seats.iter().map(|s| s.map(|t| t.0)).collect()
}

fn to_seats(ids: Option<&[Option<u64>]>) -> Vec<Seat> {
    match ids {
        Some(ids) => ids.iter().map(|s| s.map(TeacherId)).collect(),
        None => vec![None],
    }
}

/// Empty or missing text means "not chosen yet".
fn optional_text(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Dataset summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub teacher_count: usize,
    pub exam_count: usize,
    pub seat_count: usize,
    pub filled_seat_count: usize,
    pub open_seat_count: usize,
    pub slot_count: usize,
    pub student_count: u64,
    pub revision: u64,
    pub editing: Option<u64>,
    pub pending_merge: Option<u64>,
}

impl StatusResponse {
    #[must_use]
    pub fn new(
        metrics: RosterMetrics,
        revision: u64,
        editing: Option<ExamId>,
        pending_merge: Option<ExamId>,
    ) -> Self {
        Self {
            teacher_count: metrics.teacher_count,
            exam_count: metrics.exam_count,
            seat_count: metrics.seat_count,
            filled_seat_count: metrics.filled_seat_count,
            open_seat_count: metrics.open_seat_count(),
            slot_count: metrics.slot_count,
            student_count: metrics.student_count,
            revision,
            editing: editing.map(|id| id.0),
            pending_merge: pending_merge.map(|id| id.0),
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Current settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub school_name: String,
    pub exam_period: String,
    pub principal_name: String,
    pub allowed_dates: Vec<String>,
    pub allowed_times: Vec<String>,
}

impl From<&Settings> for SettingsResponse {
    fn from(settings: &Settings) -> Self {
        Self {
            school_name: settings.school_name.clone(),
            exam_period: settings.exam_period.clone(),
            principal_name: settings.principal_name.clone(),
            allowed_dates: settings
                .allowed_dates
                .iter()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .collect(),
            allowed_times: settings
                .allowed_times
                .iter()
                .map(|t| t.format(TIME_FORMAT).to_string())
                .collect(),
        }
    }
}

/// Partial settings update; absent keys are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub school_name: Option<String>,
    pub exam_period: Option<String>,
    pub principal_name: Option<String>,
    pub allowed_dates: Option<Vec<String>>,
    pub allowed_times: Option<Vec<String>>,
}

impl SettingsRequest {
    /// Validate and convert to a patch.
    pub fn to_patch(&self) -> Result<SettingsPatch, InvigilError> {
        let allowed_dates = self
            .allowed_dates
            .as_ref()
            .map(|dates| dates.iter().map(|d| parse_date(d)).collect::<Result<BTreeSet<_>, _>>())
            .transpose()?;
        let allowed_times = self
            .allowed_times
            .as_ref()
            .map(|times| times.iter().map(|t| parse_time(t)).collect::<Result<BTreeSet<_>, _>>())
            .transpose()?;
        Ok(SettingsPatch {
            school_name: self.school_name.clone(),
            exam_period: self.exam_period.clone(),
            principal_name: self.principal_name.clone(),
            allowed_dates,
            allowed_times,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateRequest {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRequest {
    pub time: String,
}

/// Whether an add/remove changed the allowed set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangedResponse {
    pub changed: bool,
}

// =============================================================================
// TEACHERS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRequest {
    pub name: String,
    #[serde(default)]
    pub branch: String,
}

/// Newly created record id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: u64,
}

// =============================================================================
// EXAMS
// =============================================================================

/// Exam fields as sent by clients. Used for `POST /exams`, `PUT /exams/{id}`
/// and `PUT /draft`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(default)]
    pub subject: String,
    pub grade: Option<String>,
    #[serde(default)]
    pub student_count: u32,
    /// Missing arrays get one empty seat.
    pub examiners: Option<Vec<Option<u64>>>,
    pub proctors: Option<Vec<Option<u64>>>,
}

impl ExamRequest {
    /// Convert to a draft. Date and time may stay unset; committing such a
    /// draft fails validation.
    pub fn to_draft(&self) -> Result<ExamDraft, InvigilError> {
        Ok(ExamDraft {
            date: optional_text(self.date.as_deref())
                .map(parse_date)
                .transpose()?,
            time: optional_text(self.time.as_deref())
                .map(parse_time)
                .transpose()?,
            subject: self.subject.clone(),
            grade: optional_text(self.grade.as_deref()).map_or_else(Grade::default, Grade::new),
            student_count: self.student_count,
            examiners: to_seats(self.examiners.as_deref()),
            proctors: to_seats(self.proctors.as_deref()),
        })
    }
}

/// A filled seat, with the teacher's current name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatJson {
    pub id: u64,
    pub name: String,
}

/// A committed exam with names resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResponse {
    pub id: u64,
    pub date: String,
    pub time: String,
    pub subject: String,
    pub grade: String,
    pub student_count: u32,
    pub examiner_count: usize,
    pub proctor_count: usize,
    pub examiners: Vec<Option<SeatJson>>,
    pub proctors: Vec<Option<SeatJson>>,
}

impl ExamResponse {
    #[must_use]
    pub fn from_exam(exam: &Exam, roster: &Roster) -> Self {
        let seats = |role: Role| -> Vec<Option<SeatJson>> {
            exam.seats(role)
                .iter()
                .map(|seat| {
                    seat.and_then(|id| {
                        roster.name_of(id).map(|name| SeatJson {
                            id: id.0,
                            name: name.to_string(),
                        })
                    })
                })
                .collect()
        };
        let (date, time) = format_slot(exam.slot);
        Self {
            id: exam.id.0,
            date,
            time,
            subject: exam.subject.clone(),
            grade: exam.grade.as_str().to_string(),
            student_count: exam.student_count,
            examiner_count: exam.examiners.len(),
            proctor_count: exam.proctors.len(),
            examiners: seats(Role::Examiner),
            proctors: seats(Role::Proctor),
        }
    }
}

// =============================================================================
// DRAFT
// =============================================================================

/// The staged exam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftResponse {
    /// Exam the draft will replace on commit; `None` creates a new exam.
    pub editing: Option<u64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub subject: String,
    pub grade: String,
    pub student_count: u32,
    pub examiners: Vec<Option<u64>>,
    pub proctors: Vec<Option<u64>>,
}

impl From<&EditBuffer> for DraftResponse {
    fn from(buffer: &EditBuffer) -> Self {
        let draft = &buffer.draft;
        Self {
            editing: buffer.editing.map(|id| id.0),
            date: draft.date.map(|d| d.format(DATE_FORMAT).to_string()),
            time: draft.time.map(|t| t.format(TIME_FORMAT).to_string()),
            subject: draft.subject.clone(),
            grade: draft.grade.as_str().to_string(),
            student_count: draft.student_count,
            examiners: seat_ids(&draft.examiners),
            proctors: seat_ids(&draft.proctors),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub role: Role,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub role: Role,
    pub index: usize,
    pub teacher_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableRequest {
    pub role: Role,
    pub index: usize,
}

/// Teachers that may fill a seat, sorted by branch; ties keep roster order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableResponse {
    pub teachers: Vec<Teacher>,
}

// =============================================================================
// MERGE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeSelectRequest {
    pub exam_id: u64,
}

/// Outcome of a merge selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResponse {
    /// One of `selected`, `cancelled`, `merged`, `skipped`.
    pub outcome: String,
    pub pending: Option<u64>,
    pub source: Option<u64>,
    pub target: Option<u64>,
    pub merged: Option<ExamResponse>,
}

impl MergeResponse {
    #[must_use]
    pub fn from_step(step: &MergeStep, roster: &Roster) -> Self {
        match step {
            MergeStep::SourceSelected(id) => Self {
                outcome: "selected".to_string(),
                pending: Some(id.0),
                source: Some(id.0),
                target: None,
                merged: None,
            },
            MergeStep::Cancelled(id) => Self {
                outcome: "cancelled".to_string(),
                pending: None,
                source: Some(id.0),
                target: None,
                merged: None,
            },
            MergeStep::Merged { source, merged } => Self {
                outcome: "merged".to_string(),
                pending: None,
                source: Some(source.0),
                target: Some(merged.id.0),
                merged: Some(ExamResponse::from_exam(merged, roster)),
            },
            MergeStep::Skipped { source, target } => Self {
                outcome: "skipped".to_string(),
                pending: None,
                source: Some(source.0),
                target: Some(target.0),
                merged: None,
            },
        }
    }
}

// =============================================================================
// NOTICE / PROGRAM
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DutyJson {
    pub exam_id: u64,
    pub date: String,
    pub time: String,
    pub subject: String,
    pub grade: String,
    pub role: Role,
    pub title: String,
}

impl From<&Duty> for DutyJson {
    fn from(duty: &Duty) -> Self {
        let (date, time) = format_slot(duty.slot);
        Self {
            exam_id: duty.exam.0,
            date,
            time,
            subject: duty.subject.clone(),
            grade: duty.grade.as_str().to_string(),
            role: duty.role,
            title: duty.title.clone(),
        }
    }
}

/// A teacher's assignment notice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeResponse {
    pub school_name: String,
    pub exam_period: String,
    pub principal_name: String,
    pub teacher: Teacher,
    pub duties: Vec<DutyJson>,
}

impl From<&Notice> for NoticeResponse {
    fn from(notice: &Notice) -> Self {
        Self {
            school_name: notice.school_name.clone(),
            exam_period: notice.exam_period.clone(),
            principal_name: notice.principal_name.clone(),
            teacher: notice.teacher.clone(),
            duties: notice.duties.iter().map(DutyJson::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramRowJson {
    pub exam_id: u64,
    pub date: String,
    pub time: String,
    pub subject: String,
    pub grade: String,
    pub student_count: u32,
    pub examiners: Vec<Option<String>>,
    pub proctors: Vec<Option<String>>,
}

impl From<ProgramRow> for ProgramRowJson {
    fn from(row: ProgramRow) -> Self {
        let (date, time) = format_slot(row.slot);
        Self {
            exam_id: row.exam.0,
            date,
            time,
            subject: row.subject,
            grade: row.grade.0,
            student_count: row.student_count,
            examiners: row.examiners,
            proctors: row.proctors,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Engine error returned from a handler.
#[derive(Debug)]
pub struct ApiError(pub InvigilError);

impl From<InvigilError> for ApiError {
    fn from(err: InvigilError) -> Self {
        Self(err)
    }
}

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Format => StatusCode::BAD_REQUEST,
            ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = match self.0.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Format => "format",
            ErrorKind::Persistence => "persistence",
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, kind, "request rejected");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
