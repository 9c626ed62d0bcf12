//! Domain module for the task list.
//!
//! Tasks, audit records and browser sessions. Nothing in here performs I/O.

pub mod history;
pub mod session;
pub mod task;

pub use history::{HistoryAction, HistoryRecord, UnknownHistoryAction};
pub use session::{
    BrowserSession, DeleteMarkerPolicy, InvalidDeleteMarkerPolicy, SessionPhase, SessionState,
    TransientMarkers,
};
pub use task::{Task, TaskId, Timestamp, is_blank_title};
