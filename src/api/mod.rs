//! API module for the JSON endpoints.
//!
//! This module also owns [`AppState`], which the browser handlers share.

pub mod dto;
pub mod error;
pub mod handlers;

pub use dto::{
    CreateTaskRequest, HistoryEntryResponse, MutationResponse, TaskResponse, UpdateTaskRequest,
};
pub use error::{ApiError, ApiErrorResponse, ErrorCode, FieldError, ValidationError};
pub use handlers::{
    AppState, HealthResponse, create_task, delete_task, get_task, health_check, list_history,
    list_tasks, update_task,
};
