//! Infrastructure module for storage, sessions and time.
//!
//! This module contains the ledger backends, the server-side session
//! store and the clock abstraction.

pub mod clock;
pub mod factory;
pub mod in_memory;
pub mod repository;
pub mod session_store;
pub mod sqlite;

pub use clock::{Clock, ManualClock, SystemClock};
pub use factory::{
    ConfigurationError, FactoryError, LedgerFactory, RepositoryConfig, StorageMode,
};
pub use in_memory::InMemoryLedger;
pub use repository::{
    HistoryLog, Ledger, LedgerTransaction, RepositoryError, StoreFuture, TaskStore,
    find_task, history_newest_first, list_tasks,
};
pub use session_store::{
    DEFAULT_SESSION_RETENTION, ResolvedSession, SessionId, SessionSlot, SessionStore,
};
pub use sqlite::SqliteLedger;
