//! HTTP handlers for the browser pages.
//!
//! Pages that need a login redirect anonymous visitors to `/login`. Form
//! mutations always answer with a redirect back to `/`, whether or not
//! anything changed.

use axum::{
    Extension, Form,
    extract::{Path, State, rejection::PathRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use super::render::{self, IndexView};
use super::session::SessionHandle;
use crate::api::AppState;
use crate::application::LoginOutcome;
use crate::domain::TaskId;
use crate::infrastructure::{RepositoryError, repository};

// =============================================================================
// Forms
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddTaskForm {
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskForm {
    #[serde(default)]
    pub updated_task: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: Option<String>,
}

// =============================================================================
// Page Error
// =============================================================================

/// A storage failure while serving a page.
#[derive(Debug)]
pub struct PageError(RepositoryError);

impl From<RepositoryError> for PageError {
    fn from(error: RepositoryError) -> Self {
        Self(error)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "Storage failure while serving page");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong</h1><p><a href=\"/\">Back to tasks</a></p>"),
        )
            .into_response()
    }
}

fn to_login() -> Response {
    Redirect::to("/login").into_response()
}

fn to_index() -> Response {
    Redirect::to("/").into_response()
}

/// Non-numeric ids do not name a route, so they get the 404 page.
fn task_id(path: Result<Path<i64>, PathRejection>) -> Result<TaskId, Response> {
    path.map(|Path(id)| TaskId::new(id)).map_err(|_| {
        (StatusCode::NOT_FOUND, Html(render::not_found_page())).into_response()
    })
}

// =============================================================================
// Task Pages
// =============================================================================

/// `GET /`
///
/// # Errors
///
/// Returns [`PageError`] when the task list cannot be read.
pub async fn index(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, PageError> {
    let mut session = handle.slot.lock().await;
    let Some(session_state) = session.state() else {
        return Ok(to_login());
    };
    let identity = session_state.identity.clone();
    let markers = session_state.markers.clone();
    let flashes = session.take_flashes();

    let tasks = repository::list_tasks(state.ledger.as_ref()).await?;

    Ok(Html(render::index_page(IndexView {
        identity: &identity,
        tasks: &tasks,
        markers: &markers,
        flashes: &flashes,
    }))
    .into_response())
}

/// `POST /` with form field `task`.
///
/// # Errors
///
/// Returns [`PageError`] when storage fails.
pub async fn add_task(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Form(form): Form<AddTaskForm>,
) -> Result<Response, PageError> {
    let mut session = handle.slot.lock().await;
    let Some(session_state) = session.state_mut() else {
        return Ok(to_login());
    };

    let title = form.task.unwrap_or_default();
    state
        .coordinator
        .add_task(&mut session_state.markers, &title)
        .await?;

    Ok(to_index())
}

/// `POST /update/{id}` with form field `updated_task`.
///
/// # Errors
///
/// Returns [`PageError`] when storage fails.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    path: Result<Path<i64>, PathRejection>,
    Form(form): Form<UpdateTaskForm>,
) -> Result<Response, PageError> {
    let id = match task_id(path) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let mut session = handle.slot.lock().await;
    let Some(session_state) = session.state_mut() else {
        return Ok(to_login());
    };

    let new_title = form.updated_task.unwrap_or_default();
    state
        .coordinator
        .update_task(&mut session_state.markers, id, &new_title)
        .await?;

    Ok(to_index())
}

/// `GET /delete/{id}`
///
/// # Errors
///
/// Returns [`PageError`] when storage fails.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Response, PageError> {
    let id = match task_id(path) {
        Ok(id) => id,
        Err(response) => return Ok(response),
    };
    let mut session = handle.slot.lock().await;
    let Some(session_state) = session.state_mut() else {
        return Ok(to_login());
    };

    state
        .coordinator
        .delete_task(&mut session_state.markers, id)
        .await?;

    Ok(to_index())
}

/// `GET /history`, newest first.
///
/// # Errors
///
/// Returns [`PageError`] when the log cannot be read.
pub async fn history(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Result<Response, PageError> {
    if !handle.slot.lock().await.is_authenticated() {
        return Ok(to_login());
    }

    let records = repository::history_newest_first(state.ledger.as_ref()).await?;
    Ok(Html(render::history_page(&records)).into_response())
}

// =============================================================================
// Session Pages
// =============================================================================

/// `GET /login`
pub async fn login_form(Extension(handle): Extension<SessionHandle>) -> Html<String> {
    let flashes = handle.slot.lock().await.take_flashes();
    Html(render::login_page(&flashes))
}

/// `POST /login` with form field `username`.
///
/// A rejected identity re-renders the form with status 401.
pub async fn login(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut session = handle.slot.lock().await;
    let identity = form.username.unwrap_or_default();

    match state
        .gatekeeper
        .login(&mut session, &identity, state.clock.now())
    {
        LoginOutcome::Accepted => to_index(),
        LoginOutcome::Rejected => {
            let flashes = session.take_flashes();
            (
                StatusCode::UNAUTHORIZED,
                Html(render::login_page(&flashes)),
            )
                .into_response()
        }
    }
}

/// `GET /logout`
pub async fn logout(
    State(state): State<AppState>,
    Extension(handle): Extension<SessionHandle>,
) -> Response {
    let mut session = handle.slot.lock().await;
    state.gatekeeper.logout(&mut session);
    to_login()
}

/// `GET /session-timeout`
pub async fn session_timeout(Extension(handle): Extension<SessionHandle>) -> Html<String> {
    let flashes = handle.slot.lock().await.take_flashes();
    Html(render::session_timeout_page(&flashes))
}

/// `GET /static/style.css`
pub async fn stylesheet() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        render::STYLESHEET,
    )
}
