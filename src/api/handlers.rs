//! HTTP handlers for the JSON API.
//!
//! The JSON surface needs no login. Its mutations go through the same
//! [`MutationCoordinator`] as the browser, with a throwaway marker set, so
//! every change still lands in the audit trail.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};

use super::dto::{
    CreateTaskRequest, HistoryEntryResponse, MutationResponse, TaskResponse, UpdateTaskRequest,
    validate_title,
};
use super::error::ApiErrorResponse;
use crate::application::{Gatekeeper, MutationCoordinator, MutationOutcome, SkipReason};
use crate::config::SessionConfig;
use crate::domain::{TaskId, TransientMarkers};
use crate::infrastructure::{Clock, Ledger, SessionStore, repository};

// =============================================================================
// Application State
// =============================================================================

/// Shared application dependencies.
///
/// Uses trait objects so the storage backend and the clock can be picked
/// at runtime.
#[derive(Clone)]
pub struct AppState {
    /// Task store and history log, read directly by listing pages.
    pub ledger: Arc<dyn Ledger>,
    /// All task mutations go through here.
    pub coordinator: Arc<MutationCoordinator>,
    pub gatekeeper: Arc<Gatekeeper>,
    pub sessions: Arc<SessionStore>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the services around an opened ledger.
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, clock: Arc<dyn Clock>, session: &SessionConfig) -> Self {
        Self {
            coordinator: Arc::new(MutationCoordinator::new(
                Arc::clone(&ledger),
                session.delete_marker_policy,
            )),
            gatekeeper: Arc::new(Gatekeeper::new(
                session.allowed_identity.clone(),
                session.idle_timeout,
            )),
            sessions: Arc::new(SessionStore::new(session.slot_retention())),
            ledger,
            clock,
        }
    }
}

// =============================================================================
// GET /health Handler
// =============================================================================

/// Health check response body.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Health check endpoint.
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Task Handlers
// =============================================================================

/// Non-numeric ids cannot name a task.
fn task_id(path: Result<Path<i64>, PathRejection>) -> Result<TaskId, ApiErrorResponse> {
    path.map(|Path(id)| TaskId::new(id))
        .map_err(|_| ApiErrorResponse::task_not_found())
}

/// `GET /api/tasks`
///
/// # Errors
///
/// Returns 500 when storage fails.
pub async fn list_tasks(
    State(state): State<AppState>,
) -> Result<Json<Vec<TaskResponse>>, ApiErrorResponse> {
    let tasks = repository::list_tasks(state.ledger.as_ref()).await?;
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// `GET /api/tasks/{id}`
///
/// # Errors
///
/// Returns 404 for an unknown id, 500 when storage fails.
pub async fn get_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<TaskResponse>, ApiErrorResponse> {
    let id = task_id(path)?;
    repository::find_task(state.ledger.as_ref(), id)
        .await?
        .map(|task| Json(TaskResponse::from(task)))
        .ok_or_else(ApiErrorResponse::task_not_found)
}

/// `POST /api/tasks`
///
/// # Response
///
/// - **201 Created**: `{"message": "Task created successfully", "task": {...}}`
/// - **400 Bad Request**: missing or blank `title`, or a malformed body
///
/// # Errors
///
/// Returns [`ApiErrorResponse`] for validation and storage failures.
pub async fn create_task(
    State(state): State<AppState>,
    body: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), ApiErrorResponse> {
    let Json(request) = body?;
    let title = validate_title(request.title.as_deref())?;

    let mut markers = TransientMarkers::default();
    match state.coordinator.add_task(&mut markers, &title).await? {
        MutationOutcome::Added { task, .. } => Ok((
            StatusCode::CREATED,
            Json(MutationResponse::with_task(
                "Task created successfully",
                task.into(),
            )),
        )),
        outcome => Err(unexpected(&outcome)),
    }
}

/// `PUT /api/tasks/{id}`
///
/// # Errors
///
/// Returns 400 for a missing or blank `title`, 404 for an unknown id.
pub async fn update_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiErrorResponse> {
    let id = task_id(path)?;
    let Json(request) = body?;
    let title = validate_title(request.title.as_deref())?;

    let mut markers = TransientMarkers::default();
    match state.coordinator.update_task(&mut markers, id, &title).await? {
        MutationOutcome::Updated { task, .. } => Ok(Json(MutationResponse::with_task(
            "Task updated successfully",
            task.into(),
        ))),
        MutationOutcome::Skipped(SkipReason::NotFound) => Err(ApiErrorResponse::task_not_found()),
        outcome => Err(unexpected(&outcome)),
    }
}

/// `DELETE /api/tasks/{id}`
///
/// # Errors
///
/// Returns 404 for an unknown id.
pub async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MutationResponse>, ApiErrorResponse> {
    let id = task_id(path)?;

    let mut markers = TransientMarkers::default();
    match state.coordinator.delete_task(&mut markers, id).await? {
        MutationOutcome::Deleted { .. } => {
            Ok(Json(MutationResponse::message("Task deleted successfully")))
        }
        MutationOutcome::Skipped(SkipReason::NotFound) => Err(ApiErrorResponse::task_not_found()),
        outcome => Err(unexpected(&outcome)),
    }
}

/// `GET /api/history`, newest first.
///
/// # Errors
///
/// Returns 500 when storage fails.
pub async fn list_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiErrorResponse> {
    let records = repository::history_newest_first(state.ledger.as_ref()).await?;
    Ok(Json(
        records.into_iter().map(HistoryEntryResponse::from).collect(),
    ))
}

/// Titles are validated before reaching the coordinator, so any other
/// outcome means the two disagree about what a blank title is.
fn unexpected(outcome: &MutationOutcome) -> ApiErrorResponse {
    tracing::error!(?outcome, "Unexpected mutation outcome");
    ApiErrorResponse::internal_error("An internal error occurred")
}
