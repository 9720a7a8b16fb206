//! # Invigil HTTP API Module
//!
//! REST API over a shared [`Session`] using axum.
//!
//! ## Endpoints
//!
//! - `GET /health`, `GET /status`
//! - `GET|PUT /settings`, `POST /settings/dates`, `DELETE /settings/dates/{date}`,
//!   `POST /settings/times`, `DELETE /settings/times/{time}`
//! - `GET|POST /teachers`, `PUT|DELETE /teachers/{id}`, `GET /teachers/{id}/notice`
//! - `GET|POST /exams`, `PUT|DELETE /exams/{id}`
//! - `GET|PUT|DELETE /draft`, `POST /draft/edit/{id}`, `POST /draft/resize`,
//!   `POST /draft/assign`, `POST /draft/available`, `POST /draft/commit`
//! - `POST /merge/select`
//! - `GET /stats`, `GET /program`
//! - `GET|PUT /snapshot` (export/import), `POST /reset`
//!
//! Every successful mutation schedules a debounced snapshot save.
//!
//! ## Configuration (Environment Variables)
//!
//! - `INVIGIL_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)

mod handlers;
mod types;

// Re-export handlers and types for integration tests (via `invigil::api::*`)
#[allow(unused_imports)]
pub use handlers::{
    add_date_handler, add_teacher_handler, add_time_handler, assign_seat_handler, available_handler,
    clear_draft_handler, commit_draft_handler, create_exam_handler, delete_exam_handler,
    delete_teacher_handler, edit_exam_handler, export_handler, get_draft_handler,
    get_settings_handler, health_handler, import_handler, list_exams_handler, list_teachers_handler,
    merge_select_handler, notice_handler, program_handler, put_draft_handler, remove_date_handler,
    remove_time_handler, reset_handler, resize_draft_handler, stats_handler, status_handler,
    update_exam_handler, update_settings_handler, update_teacher_handler,
};
#[allow(unused_imports)]
pub use types::{
    ApiError, AssignRequest, AvailableRequest, AvailableResponse, ChangedResponse,
    CreatedResponse, DateRequest, DraftResponse, DutyJson, ErrorResponse, ExamRequest,
    ExamResponse, HealthResponse, MergeResponse, MergeSelectRequest, NoticeResponse,
    ProgramRowJson, ResizeRequest, SeatJson, SettingsRequest, SettingsResponse, StatusResponse,
    TeacherRequest, TimeRequest,
};

use crate::persist::{SnapshotWriter, WriterTask};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{delete, get, post},
};
use invigil_core::{InvigilError, Session, primitives::MAX_SNAPSHOT_SIZE};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the session and the snapshot writer.
#[derive(Clone)]
pub struct AppState {
    /// The session holding the dataset and the edit buffer.
    pub session: Arc<RwLock<Session>>,
    /// Debounced writer; `None` runs without persistence.
    pub writer: Option<SnapshotWriter>,
}

impl AppState {
    /// State without persistence.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            writer: None,
        }
    }

    /// State that schedules a save after each mutation.
    #[must_use]
    pub fn with_writer(session: Session, writer: SnapshotWriter) -> Self {
        Self {
            writer: Some(writer),
            ..Self::new(session)
        }
    }

    /// Hand the current dataset to the writer.
    pub fn schedule_save(&self, session: &Session) {
        if let Some(writer) = &self.writer {
            writer.schedule(session.snapshot());
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build CORS layer from `INVIGIL_CORS_ORIGINS`.
///
/// - "*": allows all origins
/// - not set: localhost only
/// - otherwise: comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("INVIGIL_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (INVIGIL_CORS_ORIGINS=*)");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in INVIGIL_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => {
            tracing::info!("CORS: No INVIGIL_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit.
pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .layer(DefaultBodyLimit::max(MAX_SNAPSHOT_SIZE));

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route(
            "/settings",
            get(handlers::get_settings_handler).put(handlers::update_settings_handler),
        )
        .route("/settings/dates", post(handlers::add_date_handler))
        .route("/settings/dates/{date}", delete(handlers::remove_date_handler))
        .route("/settings/times", post(handlers::add_time_handler))
        .route("/settings/times/{time}", delete(handlers::remove_time_handler))
        .route(
            "/teachers",
            get(handlers::list_teachers_handler).post(handlers::add_teacher_handler),
        )
        .route(
            "/teachers/{id}",
            axum::routing::put(handlers::update_teacher_handler)
                .delete(handlers::delete_teacher_handler),
        )
        .route("/teachers/{id}/notice", get(handlers::notice_handler))
        .route(
            "/exams",
            get(handlers::list_exams_handler).post(handlers::create_exam_handler),
        )
        .route(
            "/exams/{id}",
            axum::routing::put(handlers::update_exam_handler).delete(handlers::delete_exam_handler),
        )
        .route(
            "/draft",
            get(handlers::get_draft_handler)
                .put(handlers::put_draft_handler)
                .delete(handlers::clear_draft_handler),
        )
        .route("/draft/edit/{id}", post(handlers::edit_exam_handler))
        .route("/draft/resize", post(handlers::resize_draft_handler))
        .route("/draft/assign", post(handlers::assign_seat_handler))
        .route("/draft/available", post(handlers::available_handler))
        .route("/draft/commit", post(handlers::commit_draft_handler))
        .route("/merge/select", post(handlers::merge_select_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/program", get(handlers::program_handler))
        .route(
            "/snapshot",
            get(handlers::export_handler).put(handlers::import_handler),
        )
        .route("/reset", post(handlers::reset_handler))
        .layer(middleware)
        .with_state(state)
}

// =============================================================================
// SERVER
// =============================================================================

/// Run the HTTP server until Ctrl+C, then flush the pending snapshot.
pub async fn run_server(
    addr: std::net::SocketAddr,
    session: Session,
    writer: Option<(SnapshotWriter, WriterTask)>,
) -> Result<(), InvigilError> {
    let (state, task) = match writer {
        Some((writer, task)) => (AppState::with_writer(session, writer), Some(task)),
        None => (AppState::new(session), None),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| InvigilError::Persistence(format!("Cannot bind {addr}: {e}")))?;
    tracing::info!("Invigil server listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| InvigilError::Persistence(format!("Server error: {e}")));

    if let Some(task) = task {
        tracing::info!("Flushing pending snapshot");
        task.finish().await;
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
