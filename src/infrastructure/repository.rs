//! Storage traits for tasks and the audit trail.
//!
//! A [`Ledger`] owns one task store and one history log. All access goes
//! through a [`LedgerTransaction`], an exclusive unit of work that sees
//! both. Committing makes every change visible at once; dropping the
//! transaction without committing discards all of them.
//!
//! Methods return boxed futures so the traits stay object-safe and the
//! backend can be picked at runtime.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::domain::{HistoryAction, HistoryRecord, Task, TaskId};

// =============================================================================
// Repository Error
// =============================================================================

/// Errors that can occur during storage operations.
///
/// A missing task is not an error: lookups report it as `None`.
#[derive(Debug, Error, Clone)]
pub enum RepositoryError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        Self::DatabaseError(error.to_string())
    }
}

/// Future returned by every storage operation.
pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, RepositoryError>>;

// =============================================================================
// Task Store
// =============================================================================

/// Mapping from task id to title.
pub trait TaskStore: Send {
    /// Inserts a task and returns its new id.
    ///
    /// Blank titles are ignored and yield `Ok(None)`.
    fn add(&mut self, title: String) -> StoreFuture<'_, Option<TaskId>>;

    /// Looks a task up by id.
    fn get(&mut self, id: TaskId) -> StoreFuture<'_, Option<Task>>;

    /// Changes the title of a task in place, returning the previous title,
    /// or `Ok(None)` when the id does not exist.
    fn rename(&mut self, id: TaskId, new_title: String) -> StoreFuture<'_, Option<String>>;

    /// Removes a task, returning its title, or `Ok(None)` when the id does
    /// not exist.
    fn remove(&mut self, id: TaskId) -> StoreFuture<'_, Option<String>>;

    /// Lists all tasks in id order.
    fn list(&mut self) -> StoreFuture<'_, Vec<Task>>;
}

// =============================================================================
// History Log
// =============================================================================

/// Append-only audit trail.
pub trait HistoryLog: Send {
    /// Appends a record stamped with the current time.
    ///
    /// The title is stored verbatim.
    fn append(
        &mut self,
        task_title: String,
        action: HistoryAction,
    ) -> StoreFuture<'_, HistoryRecord>;

    /// Returns all records, newest first.
    fn list_newest_first(&mut self) -> StoreFuture<'_, Vec<HistoryRecord>>;
}

// =============================================================================
// Ledger
// =============================================================================

/// Exclusive unit of work over a task store and its history log.
pub trait LedgerTransaction: TaskStore + HistoryLog {
    /// Makes every change of this unit of work durable and visible.
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()>;
}

/// Storage backend holding the task store and history log.
pub trait Ledger: Send + Sync {
    /// Opens a unit of work. Waits while another one is open when the
    /// backend cannot run them side by side.
    fn begin(&self) -> StoreFuture<'_, Box<dyn LedgerTransaction>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

// =============================================================================
// Read Helpers
// =============================================================================

/// Lists all tasks in a read-only unit of work.
///
/// # Errors
///
/// Returns the backend error if the store cannot be read.
pub async fn list_tasks(ledger: &dyn Ledger) -> Result<Vec<Task>, RepositoryError> {
    let mut transaction = ledger.begin().await?;
    let tasks = transaction.list().await?;
    Ok(tasks)
}

/// Looks up one task in a read-only unit of work.
///
/// # Errors
///
/// Returns the backend error if the store cannot be read.
pub async fn find_task(ledger: &dyn Ledger, id: TaskId) -> Result<Option<Task>, RepositoryError> {
    let mut transaction = ledger.begin().await?;
    let task = transaction.get(id).await?;
    Ok(task)
}

/// Reads the whole audit trail, newest first.
///
/// # Errors
///
/// Returns the backend error if the log cannot be read.
pub async fn history_newest_first(
    ledger: &dyn Ledger,
) -> Result<Vec<HistoryRecord>, RepositoryError> {
    let mut transaction = ledger.begin().await?;
    let records = transaction.list_newest_first().await?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_repository_error_display() {
        let error = RepositoryError::DatabaseError("connection refused".to_string());
        assert_eq!(format!("{error}"), "Database error: connection refused");

        let error = RepositoryError::CorruptRecord("bad action".to_string());
        assert_eq!(format!("{error}"), "Corrupt record: bad action");
    }

    #[rstest]
    fn test_sqlx_error_maps_to_database_error() {
        let error: RepositoryError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, RepositoryError::DatabaseError(_)));
    }
}
