//! Common test helpers for integration tests.
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate, and not every file uses every
//! helper.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use tasklist_server::api::AppState;
use tasklist_server::config::SessionConfig;
use tasklist_server::create_router;
use tasklist_server::domain::DeleteMarkerPolicy;
use tasklist_server::infrastructure::{InMemoryLedger, Ledger, ManualClock, SessionStore};
use tasklist_server::web::SESSION_COOKIE;

pub const ALLOWED_USER: &str = "Marushka";
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const SESSION_RETENTION: Duration = Duration::from_secs(300);

/// A router over an in-memory ledger with a clock the test controls.
pub struct TestApp {
    pub router: Router,
    pub clock: Arc<ManualClock>,
    pub ledger: Arc<dyn Ledger>,
    pub sessions: Arc<SessionStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(DeleteMarkerPolicy::Keep)
    }

    pub fn with_policy(delete_marker_policy: DeleteMarkerPolicy) -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .expect("valid start instant");
        let clock = Arc::new(ManualClock::starting_at(start));
        let ledger: Arc<dyn Ledger> = Arc::new(InMemoryLedger::with_clock(clock.clone()));
        let session = SessionConfig {
            allowed_identity: ALLOWED_USER.to_string(),
            idle_timeout: IDLE_TIMEOUT,
            delete_marker_policy,
            retention: SESSION_RETENTION,
        };
        let state = AppState::new(Arc::clone(&ledger), clock.clone(), &session);
        let sessions = Arc::clone(&state.sessions);

        Self {
            router: create_router(state),
            clock,
            ledger,
            sessions,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

// =============================================================================
// Request Builders
// =============================================================================

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

pub fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

// =============================================================================
// Response Helpers
// =============================================================================

/// The `name=value` pair of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

pub fn assert_redirect(response: &Response<Body>, target: &str) {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(response), Some(target));
}

/// Logs in as the allowed user from a fresh browser and returns the
/// session cookie.
pub async fn login(app: &TestApp) -> String {
    let response = app
        .send(post_form("/login", &format!("username={ALLOWED_USER}"), None))
        .await;
    assert_redirect(&response, "/");
    session_cookie(&response).expect("login binds a session")
}
