//! Route configuration.
//!
//! # Routes
//!
//! | Method | Path | Handler | Session |
//! |--------|------|---------|---------|
//! | GET | / | `web::index` | gated |
//! | POST | / | `web::add_task` | gated |
//! | POST | /update/{id} | `web::update_task` | gated |
//! | GET | /delete/{id} | `web::delete_task` | gated |
//! | GET | /history | `web::history` | gated |
//! | GET/POST | /login | `web::login_form` / `web::login` | bound |
//! | GET | /logout | `web::logout` | bound |
//! | GET | /session-timeout | `web::session_timeout` | bound |
//! | GET | /static/style.css | `web::stylesheet` | none |
//! | GET | /health | `api::health_check` | none |
//! | GET/POST | /api/tasks | `api::list_tasks` / `api::create_task` | none |
//! | GET/PUT/DELETE | /api/tasks/{id} | `api::get_task` / `api::update_task` / `api::delete_task` | none |
//! | GET | /api/history | `api::list_history` | none |
//!
//! "Gated" routes run the idle check; "bound" routes only get their
//! session slot. The session layer is a route layer on the pages, so
//! unrouted paths (a browser's `/favicon.ico`, say) 404 without touching
//! any session.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::api::{self, AppState};
use crate::web;

/// Builds the full application router.
pub fn create_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(web::index).post(web::add_task))
        .route("/update/{id}", post(web::update_task))
        .route("/delete/{id}", get(web::delete_task))
        .route("/history", get(web::history))
        .route("/login", get(web::login_form).post(web::login))
        .route("/logout", get(web::logout))
        .route("/session-timeout", get(web::session_timeout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            web::session_gate,
        ));

    let json = Router::new()
        .route("/api/tasks", get(api::list_tasks).post(api::create_task))
        .route(
            "/api/tasks/{id}",
            get(api::get_task)
                .put(api::update_task)
                .delete(api::delete_task),
        )
        .route("/api/history", get(api::list_history));

    Router::new()
        .route("/health", get(api::health_check))
        .route("/static/style.css", get(web::stylesheet))
        .merge(pages)
        .merge(json)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
