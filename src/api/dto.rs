//! Request and response shapes of the JSON API.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use crate::domain::{HistoryRecord, Task, is_blank_title};

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /api/tasks`.
///
/// `title` is optional here so a missing field reports as a validation
/// error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of `PUT /api/tasks/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
}

/// Accepts a present, non-blank title and returns it unchanged.
///
/// # Errors
///
/// Returns a `ValidationError` on the `title` field otherwise.
pub fn validate_title(title: Option<&str>) -> Result<String, ValidationError> {
    match title {
        Some(title) if !is_blank_title(title) => Ok(title.to_string()),
        _ => Err(ValidationError::single("title", "Title is required")),
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.value(),
            title: task.title.clone(),
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id.value(),
            title: task.title,
        }
    }
}

/// Acknowledgement of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskResponse>,
}

impl MutationResponse {
    #[must_use]
    pub fn with_task(message: impl Into<String>, task: TaskResponse) -> Self {
        Self {
            message: message.into(),
            task: Some(task),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            task: None,
        }
    }
}

/// One audit record as the API shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntryResponse {
    pub task_title: String,
    /// `ADDED`, `UPDATED_OLD`, `UPDATED_NEW` or `DELETED`.
    pub action: String,
    /// `YYYY-MM-DD HH:MM:SS`, UTC.
    pub timestamp: String,
}

impl From<HistoryRecord> for HistoryEntryResponse {
    fn from(record: HistoryRecord) -> Self {
        Self {
            task_title: record.task_title,
            action: record.action.as_str().to_string(),
            timestamp: record.timestamp.to_string(),
        }
    }
}
