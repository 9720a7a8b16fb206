//! # API Endpoint Handlers
//!
//! Readers take the session read lock; mutations take the write lock and
//! schedule a save once they succeed.

use super::{
    AppState,
    types::{
        ApiError, AssignRequest, AvailableRequest, AvailableResponse, ChangedResponse,
        CreatedResponse, DateRequest, DraftResponse, ExamRequest, ExamResponse, HealthResponse,
        MergeResponse, MergeSelectRequest, NoticeResponse, ProgramRowJson, ResizeRequest,
        SettingsRequest, SettingsResponse, StatusResponse, TeacherRequest, TimeRequest,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use invigil_core::{
    ExamId, InvigilError, MergeStep, Teacher, TeacherId, TeacherLoad, parse_date, parse_time,
};

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Dataset summary.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(StatusResponse::new(
        session.metrics(),
        session.revision(),
        session.editing(),
        session.pending_merge(),
    ))
}

// =============================================================================
// SETTINGS
// =============================================================================

pub async fn get_settings_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(SettingsResponse::from(session.roster().settings()))
}

/// Merge the present keys over the current settings.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Json(request): Json<SettingsRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    let patch = request.to_patch()?;
    let mut session = state.session.write().await;
    session.update_settings(patch);
    state.schedule_save(&session);
    Ok(Json(SettingsResponse::from(session.roster().settings())))
}

pub async fn add_date_handler(
    State(state): State<AppState>,
    Json(request): Json<DateRequest>,
) -> ApiResult<Json<ChangedResponse>> {
    let date = parse_date(&request.date)?;
    let mut session = state.session.write().await;
    let changed = session.add_allowed_date(date);
    if changed {
        state.schedule_save(&session);
    }
    Ok(Json(ChangedResponse { changed }))
}

pub async fn remove_date_handler(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<ChangedResponse>> {
    let date = parse_date(&date)?;
    let mut session = state.session.write().await;
    let changed = session.remove_allowed_date(date);
    if changed {
        state.schedule_save(&session);
    }
    Ok(Json(ChangedResponse { changed }))
}

pub async fn add_time_handler(
    State(state): State<AppState>,
    Json(request): Json<TimeRequest>,
) -> ApiResult<Json<ChangedResponse>> {
    let time = parse_time(&request.time)?;
    let mut session = state.session.write().await;
    let changed = session.add_allowed_time(time);
    if changed {
        state.schedule_save(&session);
    }
    Ok(Json(ChangedResponse { changed }))
}

pub async fn remove_time_handler(
    State(state): State<AppState>,
    Path(time): Path<String>,
) -> ApiResult<Json<ChangedResponse>> {
    let time = parse_time(&time)?;
    let mut session = state.session.write().await;
    let changed = session.remove_allowed_time(time);
    if changed {
        state.schedule_save(&session);
    }
    Ok(Json(ChangedResponse { changed }))
}

// =============================================================================
// TEACHERS
// =============================================================================

/// Teachers sorted by branch; ties keep roster order.
pub async fn list_teachers_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let teachers: Vec<Teacher> = session.sorted_teachers().into_iter().cloned().collect();
    Json(teachers)
}

pub async fn add_teacher_handler(
    State(state): State<AppState>,
    Json(request): Json<TeacherRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let mut session = state.session.write().await;
    let id = session.add_teacher(&request.name, &request.branch)?;
    state.schedule_save(&session);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.0 })))
}

pub async fn update_teacher_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<TeacherRequest>,
) -> ApiResult<StatusCode> {
    let mut session = state.session.write().await;
    session.update_teacher(TeacherId(id), &request.name, &request.branch)?;
    state.schedule_save(&session);
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a teacher; their seats become empty.
pub async fn delete_teacher_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Teacher>> {
    let mut session = state.session.write().await;
    let removed = session.delete_teacher(TeacherId(id))?;
    state.schedule_save(&session);
    tracing::info!(teacher = %removed.id, "teacher deleted");
    Ok(Json(removed))
}

pub async fn notice_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<NoticeResponse>> {
    let session = state.session.read().await;
    let notice = session.notice(TeacherId(id))?;
    Ok(Json(NoticeResponse::from(&notice)))
}

// =============================================================================
// EXAMS
// =============================================================================

/// Exams sorted by date, then time.
pub async fn list_exams_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let exams: Vec<ExamResponse> = session
        .sorted_exams()
        .into_iter()
        .map(|exam| ExamResponse::from_exam(exam, session.roster()))
        .collect();
    Json(exams)
}

pub async fn create_exam_handler(
    State(state): State<AppState>,
    Json(request): Json<ExamRequest>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let draft = request.to_draft()?;
    let mut session = state.session.write().await;
    let id = session.create_exam(&draft)?;
    state.schedule_save(&session);
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.0 })))
}

pub async fn update_exam_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<ExamRequest>,
) -> ApiResult<Json<ExamResponse>> {
    let draft = request.to_draft()?;
    let mut session = state.session.write().await;
    let id = ExamId(id);
    session.update_exam(id, &draft)?;
    state.schedule_save(&session);
    let exam = session
        .roster()
        .exam(id)
        .ok_or(InvigilError::ExamNotFound(id))?;
    Ok(Json(ExamResponse::from_exam(exam, session.roster())))
}

pub async fn delete_exam_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    let mut session = state.session.write().await;
    session.delete_exam(ExamId(id))?;
    state.schedule_save(&session);
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// DRAFT
// =============================================================================

pub async fn get_draft_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    Json(DraftResponse::from(session.buffer()))
}

/// Replace the staged draft.
pub async fn put_draft_handler(
    State(state): State<AppState>,
    Json(request): Json<ExamRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let draft = request.to_draft()?;
    let mut session = state.session.write().await;
    session.stage_draft(draft)?;
    Ok(Json(DraftResponse::from(session.buffer())))
}

pub async fn clear_draft_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.clear_draft();
    Json(DraftResponse::from(session.buffer()))
}

/// Load a committed exam into the draft for editing.
pub async fn edit_exam_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<DraftResponse>> {
    let mut session = state.session.write().await;
    session.edit_exam(ExamId(id))?;
    Ok(Json(DraftResponse::from(session.buffer())))
}

pub async fn resize_draft_handler(
    State(state): State<AppState>,
    Json(request): Json<ResizeRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let mut session = state.session.write().await;
    session.resize_draft(request.role, request.count)?;
    Ok(Json(DraftResponse::from(session.buffer())))
}

pub async fn assign_seat_handler(
    State(state): State<AppState>,
    Json(request): Json<AssignRequest>,
) -> ApiResult<Json<DraftResponse>> {
    let mut session = state.session.write().await;
    session.assign_seat(request.role, request.index, request.teacher_id.map(TeacherId))?;
    Ok(Json(DraftResponse::from(session.buffer())))
}

/// Teachers that may fill one seat of the draft.
pub async fn available_handler(
    State(state): State<AppState>,
    Json(request): Json<AvailableRequest>,
) -> impl IntoResponse {
    let session = state.session.read().await;
    let teachers: Vec<Teacher> = session
        .available(request.role, request.index)
        .into_iter()
        .cloned()
        .collect();
    Json(AvailableResponse { teachers })
}

/// Save the draft as a new exam or over the exam being edited.
pub async fn commit_draft_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<CreatedResponse>> {
    let mut session = state.session.write().await;
    let id = session.commit_draft()?;
    state.schedule_save(&session);
    Ok(Json(CreatedResponse { id: id.0 }))
}

// =============================================================================
// MERGE
// =============================================================================

pub async fn merge_select_handler(
    State(state): State<AppState>,
    Json(request): Json<MergeSelectRequest>,
) -> ApiResult<Json<MergeResponse>> {
    let mut session = state.session.write().await;
    let step = session.select_for_merge(ExamId(request.exam_id))?;
    match &step {
        MergeStep::Merged { source, merged } => {
            tracing::info!(source = %source, target = %merged.id, "exams merged");
            state.schedule_save(&session);
        }
        MergeStep::Skipped { source, target } => {
            tracing::warn!(source = %source, target = %target, "merge skipped, exam missing");
        }
        MergeStep::SourceSelected(_) | MergeStep::Cancelled(_) => {}
    }
    Ok(Json(MergeResponse::from_step(&step, session.roster())))
}

// =============================================================================
// PROJECTIONS
// =============================================================================

/// Per-teacher workload, busiest first.
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let stats: Vec<TeacherLoad> = session.stats();
    Json(stats)
}

pub async fn program_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.read().await;
    let rows: Vec<ProgramRowJson> = session
        .program()
        .into_iter()
        .map(ProgramRowJson::from)
        .collect();
    Json(rows)
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Export the dataset as a JSON document.
pub async fn export_handler(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let session = state.session.read().await;
    let text = session.export_json()?;
    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        text,
    ))
}

/// Replace the dataset from a JSON document. Nothing changes on error.
pub async fn import_handler(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let mut session = state.session.write().await;
    if let Err(e) = session.import_json(&body) {
        tracing::warn!(error = %e, "import rejected");
        return Err(e.into());
    }
    state.schedule_save(&session);
    tracing::info!(
        exams = session.roster().exam_count(),
        teachers = session.roster().teacher_count(),
        "snapshot imported"
    );
    Ok(Json(StatusResponse::new(
        session.metrics(),
        session.revision(),
        session.editing(),
        session.pending_merge(),
    )))
}

/// Delete all exams and teachers, keeping settings.
pub async fn reset_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session.write().await;
    session.reset();
    state.schedule_save(&session);
    tracing::info!("dataset reset");
    StatusCode::NO_CONTENT
}
