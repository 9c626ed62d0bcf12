//! Session-gated task list server.
//!
//! A single-user task list with a browser interface and a JSON API. Every
//! change to the list is written to an append-only audit trail, and browser
//! sessions expire after a short idle period.

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod routes;
pub mod web;

pub use routes::create_router;
