//! Session binding and the idle-timeout gate.
//!
//! The gate is a route layer on the browser pages only, so it runs for
//! matched page routes and nothing else: the JSON API, the stylesheet, the
//! health check and unrouted paths never touch a session. Each page request
//! is bound to a session slot through the cookie and gets a
//! [`SessionHandle`] request extension. Pages outside the allow-list then
//! pass through [`Gatekeeper::admit`]; an expired session short-circuits to
//! the timeout page. Once the response is built the slot is settled back
//! into the store.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::cookie::{session_cookie, session_id_from_headers};
use crate::api::AppState;
use crate::application::{GateDecision, Gatekeeper};
use crate::infrastructure::{SessionId, SessionSlot};

/// The session slot bound to the current request.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: SessionId,
    pub slot: SessionSlot,
}

/// Binds the request to its session and enforces the idle timeout.
pub async fn session_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resolved = state
        .sessions
        .resolve(session_id_from_headers(request.headers()))
        .await;

    let path = request.uri().path();
    let expired = if Gatekeeper::is_exempt(path) {
        false
    } else {
        let mut session = resolved.slot.lock().await;
        let decision = state.gatekeeper.admit(&mut session, state.clock.now());
        tracing::debug!(session_id = %resolved.id, %path, ?decision, "Gate decision");
        decision == GateDecision::Expired
    };

    let mut response = if expired {
        Redirect::to("/session-timeout").into_response()
    } else {
        request.extensions_mut().insert(SessionHandle {
            id: resolved.id,
            slot: Arc::clone(&resolved.slot),
        });
        next.run(request).await
    };

    let kept = state
        .sessions
        .settle(resolved.id, &resolved.slot, state.clock.now())
        .await;
    if resolved.created && kept {
        response
            .headers_mut()
            .append(header::SET_COOKIE, session_cookie(resolved.id));
    }
    response
}
