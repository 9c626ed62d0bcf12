//! Task domain model.
//!
//! A task is nothing more than an integer id and a short title. Ids are
//! handed out by the store in increasing order and never reused.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Value Objects - Newtypes
// =============================================================================

/// Identifier of a task.
///
/// Assigned monotonically by the task store. A deleted id is never handed
/// out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(i64);

impl TaskId {
    /// Wraps a raw id, e.g. one taken from a URL path or a database row.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Wall-clock instant with whole-second resolution.
///
/// History records only keep seconds, so every `Timestamp` is truncated on
/// construction. Session activity tracking uses the raw `DateTime<Utc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Format used when a timestamp is displayed or written to storage.
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Creates a `Timestamp` from a `DateTime<Utc>`, dropping sub-second precision.
    #[must_use]
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        Self(datetime.trunc_subsecs(0))
    }

    /// Returns the inner `DateTime<Utc>`.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parses the storage representation produced by [`Timestamp::FORMAT`].
    ///
    /// # Errors
    ///
    /// Returns the chrono parse error when `value` does not match the format.
    pub fn parse(value: &str) -> Result<Self, chrono::ParseError> {
        NaiveDateTime::parse_from_str(value, Self::FORMAT).map(|naive| Self(naive.and_utc()))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0.format(Self::FORMAT))
    }
}

// =============================================================================
// Task Entity
// =============================================================================

/// A task on the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned identifier.
    pub id: TaskId,
    /// Free-form title, stored exactly as entered.
    pub title: String,
}

impl Task {
    #[must_use]
    pub fn new(id: TaskId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Returns `true` when a title carries no visible characters.
///
/// Blank titles are never stored; every mutation path checks this first.
#[must_use]
pub fn is_blank_title(title: &str) -> bool {
    title.trim().is_empty()
}
