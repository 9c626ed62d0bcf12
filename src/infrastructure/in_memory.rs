//! In-memory ledger.
//!
//! Tasks and history live behind one `tokio` mutex. A transaction owns the
//! lock for its whole lifetime, so units of work never overlap. Every
//! change is written straight into the shared state and recorded in an
//! undo journal; a transaction dropped without `commit` replays the
//! journal backwards.
//!
//! Nothing survives a restart. Suitable for development and tests.

use std::collections::BTreeMap;
use std::future;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{HistoryAction, HistoryRecord, Task, TaskId, Timestamp, is_blank_title};
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::repository::{
    HistoryLog, Ledger, LedgerTransaction, StoreFuture, TaskStore,
};

// =============================================================================
// Shared State
// =============================================================================

#[derive(Debug)]
struct LedgerState {
    /// Keyed by id; ids grow monotonically so this is also insertion order.
    tasks: BTreeMap<TaskId, String>,
    /// Highest id ever handed out. Not rewound on delete or rollback.
    last_task_id: TaskId,
    history: Vec<HistoryRecord>,
    last_sequence: u64,
}

impl LedgerState {
    const fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            last_task_id: TaskId::new(0),
            history: Vec::new(),
            last_sequence: 0,
        }
    }
}

/// Inverse of one change made inside a transaction.
#[derive(Debug)]
enum Undo {
    Inserted(TaskId),
    Renamed { id: TaskId, old_title: String },
    Removed { id: TaskId, title: String },
    Appended,
}

// =============================================================================
// In-Memory Ledger
// =============================================================================

/// In-memory implementation of [`Ledger`].
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLedger {
    /// Creates an empty ledger stamped by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty ledger stamped by `clock`.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::new())),
            clock,
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger for InMemoryLedger {
    fn begin(&self) -> StoreFuture<'_, Box<dyn LedgerTransaction>> {
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        Box::pin(async move {
            let guard = state.lock_owned().await;
            let transaction: Box<dyn LedgerTransaction> = Box::new(InMemoryTransaction {
                guard,
                clock,
                journal: Vec::new(),
            });
            Ok(transaction)
        })
    }

    fn backend_name(&self) -> &'static str {
        "in_memory"
    }
}

// =============================================================================
// Transaction
// =============================================================================

struct InMemoryTransaction {
    guard: OwnedMutexGuard<LedgerState>,
    clock: Arc<dyn Clock>,
    journal: Vec<Undo>,
}

impl InMemoryTransaction {
    fn insert(&mut self, title: String) -> Option<TaskId> {
        if is_blank_title(&title) {
            return None;
        }
        let id = self.guard.last_task_id.next();
        self.guard.last_task_id = id;
        self.guard.tasks.insert(id, title);
        self.journal.push(Undo::Inserted(id));
        Some(id)
    }

    fn replace_title(&mut self, id: TaskId, new_title: String) -> Option<String> {
        let slot = self.guard.tasks.get_mut(&id)?;
        let old_title = std::mem::replace(slot, new_title);
        self.journal.push(Undo::Renamed {
            id,
            old_title: old_title.clone(),
        });
        Some(old_title)
    }

    fn delete(&mut self, id: TaskId) -> Option<String> {
        let title = self.guard.tasks.remove(&id)?;
        self.journal.push(Undo::Removed {
            id,
            title: title.clone(),
        });
        Some(title)
    }

    fn push_record(&mut self, task_title: String, action: HistoryAction) -> HistoryRecord {
        self.guard.last_sequence += 1;
        let record = HistoryRecord::new(
            self.guard.last_sequence,
            task_title,
            action,
            Timestamp::from_datetime(self.clock.now()),
        );
        self.guard.history.push(record.clone());
        self.journal.push(Undo::Appended);
        record
    }

    fn roll_back(&mut self) {
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::Inserted(id) => {
                    self.guard.tasks.remove(&id);
                }
                Undo::Renamed { id, old_title } => {
                    self.guard.tasks.insert(id, old_title);
                }
                Undo::Removed { id, title } => {
                    self.guard.tasks.insert(id, title);
                }
                Undo::Appended => {
                    self.guard.history.pop();
                }
            }
        }
    }
}

impl TaskStore for InMemoryTransaction {
    fn add(&mut self, title: String) -> StoreFuture<'_, Option<TaskId>> {
        Box::pin(future::ready(Ok(self.insert(title))))
    }

    fn get(&mut self, id: TaskId) -> StoreFuture<'_, Option<Task>> {
        let task = self
            .guard
            .tasks
            .get(&id)
            .map(|title| Task::new(id, title.clone()));
        Box::pin(future::ready(Ok(task)))
    }

    fn rename(&mut self, id: TaskId, new_title: String) -> StoreFuture<'_, Option<String>> {
        Box::pin(future::ready(Ok(self.replace_title(id, new_title))))
    }

    fn remove(&mut self, id: TaskId) -> StoreFuture<'_, Option<String>> {
        Box::pin(future::ready(Ok(self.delete(id))))
    }

    fn list(&mut self) -> StoreFuture<'_, Vec<Task>> {
        let tasks = self
            .guard
            .tasks
            .iter()
            .map(|(id, title)| Task::new(*id, title.clone()))
            .collect();
        Box::pin(future::ready(Ok(tasks)))
    }
}

impl HistoryLog for InMemoryTransaction {
    fn append(
        &mut self,
        task_title: String,
        action: HistoryAction,
    ) -> StoreFuture<'_, HistoryRecord> {
        Box::pin(future::ready(Ok(self.push_record(task_title, action))))
    }

    fn list_newest_first(&mut self) -> StoreFuture<'_, Vec<HistoryRecord>> {
        let records = self.guard.history.iter().rev().cloned().collect();
        Box::pin(future::ready(Ok(records)))
    }
}

impl LedgerTransaction for InMemoryTransaction {
    fn commit(mut self: Box<Self>) -> StoreFuture<'static, ()> {
        self.journal.clear();
        drop(self);
        Box::pin(future::ready(Ok(())))
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.journal.is_empty() {
            tracing::debug!(
                changes = self.journal.len(),
                "Rolling back uncommitted in-memory changes"
            );
            self.roll_back();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
