//! The session cookie.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::infrastructure::SessionId;

pub const SESSION_COOKIE: &str = "todo_session";

/// Reads the session id from the `Cookie` headers.
///
/// Malformed values are treated as absent.
#[must_use]
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.trim().parse().ok())
}

/// `Set-Cookie` value binding the browser to `id`.
#[must_use]
pub fn session_cookie(id: SessionId) -> HeaderValue {
    // A UUID renders as ASCII hex and dashes only
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("todo_session=; Path=/"))
}
