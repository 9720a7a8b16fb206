//! Unit tests for API request/response types.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use invigil::api::{
    ApiError, ExamRequest, ExamResponse, HealthResponse, MergeResponse, SettingsRequest,
    StatusResponse,
};
use invigil_core::{
    Exam, ExamId, Grade, InvigilError, MergeStep, Roster, RosterMetrics, Slot, Snapshot, Teacher,
    TeacherId,
};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_status_response_serialization() {
    let metrics = RosterMetrics {
        teacher_count: 4,
        exam_count: 2,
        seat_count: 5,
        filled_seat_count: 3,
        slot_count: 2,
        student_count: 60,
    };
    let status = StatusResponse::new(metrics, 7, None, Some(ExamId(2)));

    let json = serde_json::to_string(&status).unwrap();
    assert!(json.contains("\"open_seat_count\":2"));
    assert!(json.contains("\"revision\":7"));
    assert!(json.contains("\"pending_merge\":2"));
    assert!(json.contains("\"editing\":null"));
}

// =============================================================================
// EXAM REQUEST
// =============================================================================

#[test]
fn test_exam_request_minimal_gets_defaults() {
    let request: ExamRequest = serde_json::from_str(r#"{"subject": "Math"}"#).unwrap();
    let draft = request.to_draft().unwrap();

    assert_eq!(draft.date, None);
    assert_eq!(draft.time, None);
    assert_eq!(draft.grade, Grade::default());
    assert_eq!(draft.examiners, vec![None]);
    assert_eq!(draft.proctors, vec![None]);
}

#[test]
fn test_exam_request_empty_date_is_unset() {
    let request: ExamRequest =
        serde_json::from_str(r#"{"date": "", "time": "09:00", "proctors": [3, null]}"#).unwrap();
    let draft = request.to_draft().unwrap();

    assert_eq!(draft.date, None);
    assert!(draft.time.is_some());
    assert_eq!(draft.proctors, vec![Some(TeacherId(3)), None]);
}

#[test]
fn test_exam_request_bad_time_rejected() {
    let request = ExamRequest {
        time: Some("9 o'clock".to_string()),
        ..ExamRequest::default()
    };
    let err = request.to_draft().unwrap_err();
    assert_eq!(ApiError(err).status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// =============================================================================
// SETTINGS REQUEST
// =============================================================================

#[test]
fn test_settings_request_dedupes_and_sorts() {
    let request: SettingsRequest =
        serde_json::from_str(r#"{"allowed_dates": ["2025-02-11", "2025-02-10", "2025-02-11"]}"#)
            .unwrap();
    let patch = request.to_patch().unwrap();

    let dates: Vec<String> = patch
        .allowed_dates
        .unwrap()
        .iter()
        .map(|d| d.to_string())
        .collect();
    assert_eq!(dates, vec!["2025-02-10", "2025-02-11"]);
    assert!(patch.school_name.is_none());
    assert!(patch.allowed_times.is_none());
}

// =============================================================================
// EXAM / MERGE RESPONSES
// =============================================================================

fn roster_with_exam() -> (Roster, Exam) {
    let exam = Exam {
        id: ExamId(5),
        slot: Slot::parse("2025-02-10", "09:00").unwrap(),
        subject: "Math".to_string(),
        grade: Grade::level(9),
        student_count: 30,
        examiners: vec![Some(TeacherId(1)), None],
        proctors: vec![Some(TeacherId(99))],
    };
    let roster = Roster::from_snapshot(Snapshot {
        exams: vec![exam.clone()],
        teachers: vec![Teacher::new(TeacherId(1), "Ali", "Fizik")],
        ..Snapshot::default()
    });
    (roster, exam)
}

#[test]
fn test_exam_response_resolves_names() {
    let (roster, exam) = roster_with_exam();
    let response = ExamResponse::from_exam(&exam, &roster);

    assert_eq!(response.date, "2025-02-10");
    assert_eq!(response.time, "09:00");
    assert_eq!(response.examiner_count, 2);
    assert_eq!(response.examiners[0].as_ref().unwrap().name, "Ali");
    assert!(response.examiners[1].is_none());
    // Unknown ids render as empty seats.
    assert!(response.proctors[0].is_none());
}

#[test]
fn test_merge_response_outcomes() {
    let (roster, exam) = roster_with_exam();

    let selected = MergeResponse::from_step(&MergeStep::SourceSelected(ExamId(3)), &roster);
    assert_eq!(selected.outcome, "selected");
    assert_eq!(selected.pending, Some(3));

    let merged = MergeResponse::from_step(
        &MergeStep::Merged {
            source: ExamId(3),
            merged: exam,
        },
        &roster,
    );
    assert_eq!(merged.outcome, "merged");
    assert_eq!(merged.target, Some(5));
    assert!(merged.merged.is_some());
}

// =============================================================================
// ERROR MAPPING
// =============================================================================

#[test]
fn test_error_status_codes() {
    let cases = [
        (InvigilError::MissingField("date"), StatusCode::UNPROCESSABLE_ENTITY),
        (InvigilError::ExamNotFound(ExamId(1)), StatusCode::NOT_FOUND),
        (InvigilError::Format("bad".to_string()), StatusCode::BAD_REQUEST),
        (
            InvigilError::Persistence("disk".to_string()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (err, status) in cases {
        assert_eq!(ApiError(err).status(), status);
    }
}
