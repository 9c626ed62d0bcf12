//! Task mutations.
//!
//! Every add, update and delete changes the task store and appends the
//! matching audit records in one ledger unit of work. A process-wide write
//! gate serializes mutations so a lookup followed by a rename or removal
//! cannot interleave with another mutation. The caller's transient markers
//! are only touched once the unit of work has committed.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::{
    DeleteMarkerPolicy, HistoryAction, HistoryRecord, Task, TaskId, TransientMarkers,
    is_blank_title,
};
use crate::infrastructure::{Ledger, RepositoryError};

/// Why a mutation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BlankTitle,
    NotFound,
}

/// What a mutation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Added {
        task: Task,
        records: Vec<HistoryRecord>,
    },
    Updated {
        /// The task as it reads after the rename.
        task: Task,
        old_title: String,
        records: Vec<HistoryRecord>,
    },
    Deleted {
        task: Task,
        records: Vec<HistoryRecord>,
    },
    Skipped(SkipReason),
}

impl MutationOutcome {
    /// Audit records appended by this mutation.
    #[must_use]
    pub fn records(&self) -> &[HistoryRecord] {
        match self {
            Self::Added { records, .. }
            | Self::Updated { records, .. }
            | Self::Deleted { records, .. } => records,
            Self::Skipped(_) => &[],
        }
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Runs task mutations against a [`Ledger`].
pub struct MutationCoordinator {
    ledger: Arc<dyn Ledger>,
    write_gate: Mutex<()>,
    delete_policy: DeleteMarkerPolicy,
}

impl std::fmt::Debug for MutationCoordinator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MutationCoordinator")
            .field("backend", &self.ledger.backend_name())
            .field("delete_policy", &self.delete_policy)
            .finish_non_exhaustive()
    }
}

impl MutationCoordinator {
    #[must_use]
    pub fn new(ledger: Arc<dyn Ledger>, delete_policy: DeleteMarkerPolicy) -> Self {
        Self {
            ledger,
            write_gate: Mutex::new(()),
            delete_policy,
        }
    }

    /// Adds a task titled `title` and records `ADDED`.
    ///
    /// Blank titles are skipped without touching anything.
    ///
    /// # Errors
    ///
    /// Returns the backend error; nothing is stored or recorded in that case.
    pub async fn add_task(
        &self,
        markers: &mut TransientMarkers,
        title: &str,
    ) -> Result<MutationOutcome, RepositoryError> {
        if is_blank_title(title) {
            tracing::debug!("Skipping add of blank title");
            return Ok(MutationOutcome::Skipped(SkipReason::BlankTitle));
        }

        let _gate = self.write_gate.lock().await;
        let mut transaction = self.ledger.begin().await?;

        let Some(id) = transaction.add(title.to_string()).await? else {
            return Ok(MutationOutcome::Skipped(SkipReason::BlankTitle));
        };
        let record = transaction
            .append(title.to_string(), HistoryAction::Added)
            .await?;
        transaction.commit().await?;

        markers.record_added(title);
        tracing::info!(task_id = %id, %title, "Task added");

        Ok(MutationOutcome::Added {
            task: Task::new(id, title),
            records: vec![record],
        })
    }

    /// Renames task `id` to `new_title` and records `UPDATED_OLD` then
    /// `UPDATED_NEW`.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the rename and both records are discarded.
    pub async fn update_task(
        &self,
        markers: &mut TransientMarkers,
        id: TaskId,
        new_title: &str,
    ) -> Result<MutationOutcome, RepositoryError> {
        if is_blank_title(new_title) {
            tracing::debug!(task_id = %id, "Skipping update to blank title");
            return Ok(MutationOutcome::Skipped(SkipReason::BlankTitle));
        }

        let _gate = self.write_gate.lock().await;
        let mut transaction = self.ledger.begin().await?;

        let Some(old_title) = transaction.rename(id, new_title.to_string()).await? else {
            tracing::debug!(task_id = %id, "Skipping update of missing task");
            return Ok(MutationOutcome::Skipped(SkipReason::NotFound));
        };
        let old_record = transaction
            .append(old_title.clone(), HistoryAction::UpdatedOld)
            .await?;
        let new_record = transaction
            .append(new_title.to_string(), HistoryAction::UpdatedNew)
            .await?;
        transaction.commit().await?;

        markers.record_renamed(&old_title, new_title);
        tracing::info!(task_id = %id, %old_title, %new_title, "Task updated");

        Ok(MutationOutcome::Updated {
            task: Task::new(id, new_title),
            old_title,
            records: vec![old_record, new_record],
        })
    }

    /// Removes task `id` and records `DELETED`.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the task stays and nothing is recorded.
    pub async fn delete_task(
        &self,
        markers: &mut TransientMarkers,
        id: TaskId,
    ) -> Result<MutationOutcome, RepositoryError> {
        let _gate = self.write_gate.lock().await;
        let mut transaction = self.ledger.begin().await?;

        let Some(title) = transaction.remove(id).await? else {
            tracing::debug!(task_id = %id, "Skipping delete of missing task");
            return Ok(MutationOutcome::Skipped(SkipReason::NotFound));
        };
        let record = transaction
            .append(title.clone(), HistoryAction::Deleted)
            .await?;
        transaction.commit().await?;

        markers.record_deleted(&title, self.delete_policy);
        tracing::info!(task_id = %id, %title, "Task deleted");

        Ok(MutationOutcome::Deleted {
            task: Task::new(id, title),
            records: vec![record],
        })
    }
}
