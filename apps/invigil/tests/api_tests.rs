//! Integration tests for the Invigil HTTP API.
//!
//! Uses axum-test to exercise the handlers without starting a real server.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use invigil::api::{
    AppState, AvailableResponse, ChangedResponse, CreatedResponse, DraftResponse, ErrorResponse,
    ExamResponse, HealthResponse, MergeResponse, NoticeResponse, ProgramRowJson,
    SettingsResponse, StatusResponse, create_router,
};
use invigil::persist;
use invigil_core::{FileSnapshotStore, Session, Snapshot, SnapshotStore, Teacher, TeacherLoad};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Test server over an empty dataset (default settings, no teachers).
fn create_test_server() -> TestServer {
    let state = AppState::new(Session::from_snapshot(Snapshot::default()));
    TestServer::new(create_router(state)).unwrap()
}

async fn add_teacher(server: &TestServer, name: &str, branch: &str) -> u64 {
    let response = server
        .post("/teachers")
        .json(&json!({ "name": name, "branch": branch }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<CreatedResponse>().id
}

fn exam_body(time: &str, subject: &str, examiners: &[u64], proctors: &[u64]) -> Value {
    json!({
        "date": "2025-02-10",
        "time": time,
        "subject": subject,
        "grade": "9. Sınıf",
        "student_count": 2,
        "examiners": examiners,
        "proctors": proctors,
    })
}

async fn create_exam(server: &TestServer, body: &Value) -> u64 {
    let response = server.post("/exams").json(body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<CreatedResponse>().id
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_fresh_dataset_has_sample_teacher() {
    let server = TestServer::new(create_router(AppState::new(Session::new()))).unwrap();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.teacher_count, 1);
    assert_eq!(status.exam_count, 0);
    assert_eq!(status.pending_merge, None);
}

// =============================================================================
// TEACHERS
// =============================================================================

#[tokio::test]
async fn test_teachers_listed_by_branch() {
    let server = create_test_server();
    add_teacher(&server, "Ali", "Fizik").await;
    add_teacher(&server, "Zeynep", "Biyoloji").await;

    let teachers: Vec<Teacher> = server.get("/teachers").await.json();

    let branches: Vec<&str> = teachers.iter().map(|t| t.branch.as_str()).collect();
    assert_eq!(branches, vec!["Biyoloji", "Fizik"]);
}

#[tokio::test]
async fn test_teacher_without_name_rejected() {
    let server = create_test_server();

    let response = server
        .post("/teachers")
        .json(&json!({ "name": "  ", "branch": "Fizik" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let error: ErrorResponse = response.json();
    assert_eq!(error.kind, "validation");
}

#[tokio::test]
async fn test_rename_shows_in_exam_listing() {
    let server = create_test_server();
    let ayse = add_teacher(&server, "Ayşe Yıldız", "Edebiyat").await;
    create_exam(&server, &exam_body("09:00", "Edebiyat", &[ayse], &[])).await;

    server
        .put(&format!("/teachers/{ayse}"))
        .json(&json!({ "name": "Ayşe Demir", "branch": "Edebiyat" }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    let seat = exams[0].examiners[0].as_ref().unwrap();
    assert_eq!(seat.name, "Ayşe Demir");
}

#[tokio::test]
async fn test_delete_teacher_vacates_seats() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Fizik").await;
    create_exam(&server, &exam_body("09:00", "Fizik", &[ali], &[])).await;

    server.delete(&format!("/teachers/{ali}")).await.assert_status_ok();

    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    assert_eq!(exams[0].examiner_count, 1);
    assert!(exams[0].examiners[0].is_none());
}

// =============================================================================
// EXAMS
// =============================================================================

#[tokio::test]
async fn test_exam_without_date_rejected() {
    let server = create_test_server();

    let response = server
        .post("/exams")
        .json(&json!({ "time": "09:00", "subject": "Math" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.exam_count, 0);
}

#[tokio::test]
async fn test_same_slot_double_booking_rejected() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Fizik").await;
    create_exam(&server, &exam_body("09:00", "Fizik", &[ali], &[])).await;

    let response = server
        .post("/exams")
        .json(&exam_body("09:00", "Kimya", &[], &[ali]))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.exam_count, 1);
}

#[tokio::test]
async fn test_exams_listed_by_slot() {
    let server = create_test_server();
    create_exam(&server, &exam_body("13:00", "Late", &[], &[])).await;
    create_exam(&server, &exam_body("09:00", "Early", &[], &[])).await;

    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    let subjects: Vec<&str> = exams.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(subjects, vec!["Early", "Late"]);
    assert_eq!(exams[0].time, "09:00");
}

#[tokio::test]
async fn test_delete_unknown_exam_not_found() {
    let server = create_test_server();

    let response = server.delete("/exams/999").await;

    response.assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// DRAFT
// =============================================================================

#[tokio::test]
async fn test_draft_available_and_commit() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Fizik").await;
    let veli = add_teacher(&server, "Veli", "Kimya").await;
    create_exam(&server, &exam_body("09:00", "Fizik", &[ali], &[])).await;

    let draft: DraftResponse = server
        .put("/draft")
        .json(&exam_body("09:00", "Kimya", &[], &[]))
        .await
        .json();
    assert_eq!(draft.editing, None);
    assert!(draft.examiners.is_empty());

    server
        .post("/draft/resize")
        .json(&json!({ "role": "proctor", "count": 1 }))
        .await
        .assert_status_ok();

    let available: AvailableResponse = server
        .post("/draft/available")
        .json(&json!({ "role": "proctor", "index": 0 }))
        .await
        .json();
    let ids: Vec<u64> = available.teachers.iter().map(|t| t.id.0).collect();
    assert_eq!(ids, vec![veli]);

    server
        .post("/draft/assign")
        .json(&json!({ "role": "proctor", "index": 0, "teacher_id": veli }))
        .await
        .assert_status_ok();
    server.post("/draft/commit").await.assert_status_ok();

    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    assert_eq!(exams.len(), 2);
    let draft: DraftResponse = server.get("/draft").await.json();
    assert_eq!(draft.subject, "");
}

#[tokio::test]
async fn test_edit_draft_excludes_own_exam() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Fizik").await;
    let exam = create_exam(&server, &exam_body("09:00", "Fizik", &[ali], &[])).await;

    let draft: DraftResponse = server.post(&format!("/draft/edit/{exam}")).await.json();
    assert_eq!(draft.editing, Some(exam));

    // Seat 0 is Ali's own seat in the exam being edited.
    let available: AvailableResponse = server
        .post("/draft/available")
        .json(&json!({ "role": "examiner", "index": 0 }))
        .await
        .json();
    assert_eq!(available.teachers.len(), 1);

    server.post("/draft/commit").await.assert_status_ok();
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.exam_count, 1);
    assert_eq!(status.editing, None);
}

// =============================================================================
// MERGE
// =============================================================================

#[tokio::test]
async fn test_two_step_merge() {
    let server = create_test_server();
    let t1 = add_teacher(&server, "T1", "").await;
    let t2 = add_teacher(&server, "T2", "").await;
    let math = create_exam(&server, &exam_body("09:00", "Math", &[t1], &[t2])).await;
    let mut physics_body = exam_body("10:00", "Physics", &[], &[]);
    physics_body["grade"] = json!("10. Sınıf");
    physics_body["student_count"] = json!(1);
    let physics = create_exam(&server, &physics_body).await;

    let first: MergeResponse = server
        .post("/merge/select")
        .json(&json!({ "exam_id": math }))
        .await
        .json();
    assert_eq!(first.outcome, "selected");
    assert_eq!(first.pending, Some(math));

    let second: MergeResponse = server
        .post("/merge/select")
        .json(&json!({ "exam_id": physics }))
        .await
        .json();
    assert_eq!(second.outcome, "merged");
    let merged = second.merged.unwrap();
    assert_eq!(merged.id, physics);
    assert_eq!(merged.subject, "Math / Physics");
    assert_eq!(merged.grade, "9. Sınıf / 10. Sınıf");
    assert_eq!(merged.student_count, 3);
    assert_eq!(merged.time, "10:00");

    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    assert_eq!(exams.len(), 1);
}

#[tokio::test]
async fn test_merge_select_twice_cancels() {
    let server = create_test_server();
    let exam = create_exam(&server, &exam_body("09:00", "Math", &[], &[])).await;

    server
        .post("/merge/select")
        .json(&json!({ "exam_id": exam }))
        .await
        .assert_status_ok();
    let again: MergeResponse = server
        .post("/merge/select")
        .json(&json!({ "exam_id": exam }))
        .await
        .json();

    assert_eq!(again.outcome, "cancelled");
    assert_eq!(again.pending, None);
}

// =============================================================================
// PROJECTIONS
// =============================================================================

#[tokio::test]
async fn test_stats_and_notice() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Matematik").await;
    create_exam(&server, &exam_body("13:00", "B", &[], &[ali])).await;
    create_exam(&server, &exam_body("09:00", "A", &[ali], &[])).await;

    let stats: Vec<TeacherLoad> = server.get("/stats").await.json();
    assert_eq!(
        (stats[0].examiner_count, stats[0].proctor_count, stats[0].total),
        (1, 1, 2)
    );

    let notice: NoticeResponse = server.get(&format!("/teachers/{ali}/notice")).await.json();
    let titles: Vec<&str> = notice.duties.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["KOMİSYON ÜYESİ", "GÖZETMEN"]);
    assert_eq!(notice.teacher.name, "Ali");

    let program: Vec<ProgramRowJson> = server.get("/program").await.json();
    assert_eq!(program[0].subject, "A");
    assert_eq!(program[0].examiners, vec![Some("Ali".to_string())]);
}

#[tokio::test]
async fn test_notice_unknown_teacher_not_found() {
    let server = create_test_server();

    server
        .get("/teachers/42/notice")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// SETTINGS
// =============================================================================

#[tokio::test]
async fn test_allowed_dates_restrict_exams() {
    let server = create_test_server();

    let added: ChangedResponse = server
        .post("/settings/dates")
        .json(&json!({ "date": "2025-02-11" }))
        .await
        .json();
    assert!(added.changed);

    server
        .post("/exams")
        .json(&exam_body("09:00", "Math", &[], &[]))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let removed: ChangedResponse = server.delete("/settings/dates/2025-02-11").await.json();
    assert!(removed.changed);
    create_exam(&server, &exam_body("09:00", "Math", &[], &[])).await;
}

#[tokio::test]
async fn test_settings_patch_keeps_other_keys() {
    let server = create_test_server();
    let before: SettingsResponse = server.get("/settings").await.json();

    let after: SettingsResponse = server
        .put("/settings")
        .json(&json!({ "school_name": "Test Lisesi", "allowed_times": ["10:30", "09:00"] }))
        .await
        .json();

    assert_eq!(after.school_name, "Test Lisesi");
    assert_eq!(after.principal_name, before.principal_name);
    assert_eq!(after.allowed_times, vec!["09:00", "10:30"]);
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[tokio::test]
async fn test_import_missing_settings_rejected() {
    let server = create_test_server();
    add_teacher(&server, "Ali", "Fizik").await;

    let response = server
        .put("/snapshot")
        .text(r#"{"exams": [], "teachers": []}"#)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.teacher_count, 1);
}

#[tokio::test]
async fn test_export_import_round_trip() {
    let server = create_test_server();
    let ali = add_teacher(&server, "Ali", "Fizik").await;
    create_exam(&server, &exam_body("09:00", "Fizik", &[ali], &[])).await;
    let exported = server.get("/snapshot").await.text();

    server.post("/reset").await.assert_status(StatusCode::NO_CONTENT);
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!((status.teacher_count, status.exam_count), (0, 0));

    server.put("/snapshot").text(exported).await.assert_status_ok();
    let exams: Vec<ExamResponse> = server.get("/exams").await.json();
    assert_eq!(exams[0].examiners[0].as_ref().unwrap().name, "Ali");
}

// =============================================================================
// PERSISTENCE
// =============================================================================

#[tokio::test]
async fn test_mutations_reach_the_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FileSnapshotStore::open(dir.path()).unwrap());
    let dyn_store: Arc<dyn SnapshotStore> = store.clone();
    let (writer, task) = persist::spawn(dyn_store, "default", Duration::from_millis(10));

    let state = AppState::with_writer(Session::from_snapshot(Snapshot::default()), writer);
    let server = TestServer::new(create_router(state)).unwrap();
    add_teacher(&server, "Ali", "Fizik").await;
    drop(server);
    task.finish().await;

    let saved = store.load("default").unwrap().unwrap();
    assert_eq!(saved.teachers.len(), 1);
    assert_eq!(saved.teachers[0].name, "Ali");
}
