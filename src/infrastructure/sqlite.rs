//! `SQLite` ledger.
//!
//! Durable backend built on `sqlx`. A unit of work is one database
//! transaction; dropping it without `commit` rolls it back.
//!
//! # Table Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS tasks (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     title TEXT NOT NULL
//! );
//!
//! CREATE TABLE IF NOT EXISTS task_history (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     task_title TEXT NOT NULL,
//!     action TEXT NOT NULL,
//!     timestamp TEXT NOT NULL
//! );
//! ```
//!
//! `AUTOINCREMENT` keeps SQLite from handing out the id of a deleted row
//! again.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::domain::{HistoryAction, HistoryRecord, Task, TaskId, Timestamp, is_blank_title};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::repository::{
    HistoryLog, Ledger, LedgerTransaction, RepositoryError, StoreFuture, TaskStore,
};

const CREATE_TASKS_TABLE: &str = "CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL
)";

const CREATE_HISTORY_TABLE: &str = "CREATE TABLE IF NOT EXISTS task_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_title TEXT NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL
)";

// =============================================================================
// SQLite Ledger
// =============================================================================

/// `SQLite` implementation of [`Ledger`].
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteLedger {
    /// Opens (creating if needed) the database at `database_url` and makes
    /// sure both tables exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DatabaseError` if the URL is malformed, the
    /// file cannot be opened, or the schema cannot be created.
    pub async fn connect(database_url: &str) -> Result<Self, RepositoryError> {
        Self::connect_with_clock(database_url, Arc::new(SystemClock)).await
    }

    /// Same as [`SqliteLedger::connect`] with an explicit clock for history
    /// timestamps.
    ///
    /// # Errors
    ///
    /// See [`SqliteLedger::connect`].
    pub async fn connect_with_clock(
        database_url: &str,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RepositoryError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let ledger = Self { pool, clock };
        ledger.migrate().await?;
        Ok(ledger)
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::query(CREATE_TASKS_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_HISTORY_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl Ledger for SqliteLedger {
    fn begin(&self) -> StoreFuture<'_, Box<dyn LedgerTransaction>> {
        let pool = self.pool.clone();
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            let transaction = pool.begin().await?;
            let transaction: Box<dyn LedgerTransaction> =
                Box::new(SqliteTransaction { transaction, clock });
            Ok(transaction)
        })
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

// =============================================================================
// Transaction
// =============================================================================

struct SqliteTransaction {
    transaction: Transaction<'static, Sqlite>,
    clock: Arc<dyn Clock>,
}

fn history_record_from_row(
    (id, task_title, action, timestamp): (i64, String, String, String),
) -> Result<HistoryRecord, RepositoryError> {
    let action = HistoryAction::from_str(&action)
        .map_err(|error| RepositoryError::CorruptRecord(error.to_string()))?;
    let timestamp = Timestamp::parse(&timestamp).map_err(|error| {
        RepositoryError::CorruptRecord(format!("history row {id}: bad timestamp ({error})"))
    })?;
    let sequence = u64::try_from(id)
        .map_err(|_| RepositoryError::CorruptRecord(format!("negative history id {id}")))?;
    Ok(HistoryRecord::new(sequence, task_title, action, timestamp))
}

impl TaskStore for SqliteTransaction {
    fn add(&mut self, title: String) -> StoreFuture<'_, Option<TaskId>> {
        Box::pin(async move {
            if is_blank_title(&title) {
                return Ok(None);
            }
            let result = sqlx::query("INSERT INTO tasks (title) VALUES (?)")
                .bind(&title)
                .execute(&mut *self.transaction)
                .await?;
            Ok(Some(TaskId::new(result.last_insert_rowid())))
        })
    }

    fn get(&mut self, id: TaskId) -> StoreFuture<'_, Option<Task>> {
        Box::pin(async move {
            let row: Option<(i64, String)> =
                sqlx::query_as("SELECT id, title FROM tasks WHERE id = ?")
                    .bind(id.value())
                    .fetch_optional(&mut *self.transaction)
                    .await?;
            Ok(row.map(|(id, title)| Task::new(TaskId::new(id), title)))
        })
    }

    fn rename(&mut self, id: TaskId, new_title: String) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let old: Option<(String,)> = sqlx::query_as("SELECT title FROM tasks WHERE id = ?")
                .bind(id.value())
                .fetch_optional(&mut *self.transaction)
                .await?;
            let Some((old_title,)) = old else {
                return Ok(None);
            };
            sqlx::query("UPDATE tasks SET title = ? WHERE id = ?")
                .bind(&new_title)
                .bind(id.value())
                .execute(&mut *self.transaction)
                .await?;
            Ok(Some(old_title))
        })
    }

    fn remove(&mut self, id: TaskId) -> StoreFuture<'_, Option<String>> {
        Box::pin(async move {
            let old: Option<(String,)> = sqlx::query_as("SELECT title FROM tasks WHERE id = ?")
                .bind(id.value())
                .fetch_optional(&mut *self.transaction)
                .await?;
            let Some((title,)) = old else {
                return Ok(None);
            };
            sqlx::query("DELETE FROM tasks WHERE id = ?")
                .bind(id.value())
                .execute(&mut *self.transaction)
                .await?;
            Ok(Some(title))
        })
    }

    fn list(&mut self) -> StoreFuture<'_, Vec<Task>> {
        Box::pin(async move {
            let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, title FROM tasks ORDER BY id")
                .fetch_all(&mut *self.transaction)
                .await?;
            Ok(rows
                .into_iter()
                .map(|(id, title)| Task::new(TaskId::new(id), title))
                .collect())
        })
    }
}

impl HistoryLog for SqliteTransaction {
    fn append(
        &mut self,
        task_title: String,
        action: HistoryAction,
    ) -> StoreFuture<'_, HistoryRecord> {
        let timestamp = Timestamp::from_datetime(self.clock.now());
        Box::pin(async move {
            let result = sqlx::query(
                "INSERT INTO task_history (task_title, action, timestamp) VALUES (?, ?, ?)",
            )
            .bind(&task_title)
            .bind(action.as_str())
            .bind(timestamp.to_string())
            .execute(&mut *self.transaction)
            .await?;
            let sequence = u64::try_from(result.last_insert_rowid()).map_err(|_| {
                RepositoryError::CorruptRecord("negative history row id".to_string())
            })?;
            Ok(HistoryRecord::new(sequence, task_title, action, timestamp))
        })
    }

    fn list_newest_first(&mut self) -> StoreFuture<'_, Vec<HistoryRecord>> {
        Box::pin(async move {
            let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
                "SELECT id, task_title, action, timestamp FROM task_history ORDER BY id DESC",
            )
            .fetch_all(&mut *self.transaction)
            .await?;
            rows.into_iter()
                .map(history_record_from_row)
                .collect::<Result<Vec<_>, _>>()
        })
    }
}

impl LedgerTransaction for SqliteTransaction {
    fn commit(self: Box<Self>) -> StoreFuture<'static, ()> {
        let Self { transaction, .. } = *self;
        Box::pin(async move {
            transaction.commit().await?;
            Ok(())
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    async fn open_ledger(directory: &TempDir) -> SqliteLedger {
        let path = directory.path().join("tasks.db");
        SqliteLedger::connect(&format!("sqlite://{}", path.display()))
            .await
            .unwrap()
    }

    #[rstest]
    #[tokio::test]
    async fn test_committed_changes_survive_reopen() {
        let directory = tempfile::tempdir().unwrap();
        let id = {
            let ledger = open_ledger(&directory).await;
            let mut transaction = ledger.begin().await.unwrap();
            let id = transaction
                .add("buy milk".to_string())
                .await
                .unwrap()
                .unwrap();
            transaction
                .append("buy milk".to_string(), HistoryAction::Added)
                .await
                .unwrap();
            transaction.commit().await.unwrap();
            ledger.pool().close().await;
            id
        };

        let ledger = open_ledger(&directory).await;
        let mut transaction = ledger.begin().await.unwrap();

        assert_eq!(
            transaction.list().await.unwrap(),
            vec![Task::new(id, "buy milk")]
        );
        let records = transaction.list_newest_first().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, HistoryAction::Added);
    }

    #[rstest]
    #[tokio::test]
    async fn test_uncommitted_transaction_is_rolled_back() {
        let directory = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&directory).await;

        {
            let mut transaction = ledger.begin().await.unwrap();
            transaction.add("ghost".to_string()).await.unwrap();
            transaction
                .append("ghost".to_string(), HistoryAction::Added)
                .await
                .unwrap();
        }

        let mut transaction = ledger.begin().await.unwrap();
        assert!(transaction.list().await.unwrap().is_empty());
        assert!(transaction.list_newest_first().await.unwrap().is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_rename_existing_task_returns_old_title() {
        let directory = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&directory).await;
        let mut transaction = ledger.begin().await.unwrap();
        let id = transaction
            .add("buy milk".to_string())
            .await
            .unwrap()
            .unwrap();

        let old_title = transaction
            .rename(id, "buy oat milk".to_string())
            .await
            .unwrap();
        transaction.commit().await.unwrap();

        assert_eq!(old_title.as_deref(), Some("buy milk"));
        let mut transaction = ledger.begin().await.unwrap();
        assert_eq!(
            transaction.get(id).await.unwrap(),
            Some(Task::new(id, "buy oat milk"))
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_rename_and_remove_report_missing_ids() {
        let directory = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&directory).await;
        let mut transaction = ledger.begin().await.unwrap();
        let missing = TaskId::new(7);

        assert_eq!(
            transaction.rename(missing, "x".to_string()).await.unwrap(),
            None
        );
        assert_eq!(transaction.remove(missing).await.unwrap(), None);
        assert_eq!(transaction.add("  ".to_string()).await.unwrap(), None);
    }

    #[rstest]
    #[tokio::test]
    async fn test_ids_are_never_reused_after_delete() {
        let directory = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&directory).await;

        let mut transaction = ledger.begin().await.unwrap();
        let first = transaction.add("a".to_string()).await.unwrap().unwrap();
        transaction.remove(first).await.unwrap();
        transaction.commit().await.unwrap();

        let mut transaction = ledger.begin().await.unwrap();
        let second = transaction.add("b".to_string()).await.unwrap().unwrap();
        transaction.commit().await.unwrap();

        assert!(second > first);
    }

    #[rstest]
    fn test_history_row_with_unknown_action_is_corrupt() {
        let row = (
            1,
            "t".to_string(),
            "RENAMED".to_string(),
            "2024-01-01 00:00:00".to_string(),
        );
        assert!(matches!(
            history_record_from_row(row),
            Err(RepositoryError::CorruptRecord(_))
        ));
    }
}
