//! Audit trail domain model.
//!
//! Every change to the task store leaves one or two [`HistoryRecord`]s
//! behind. Records only carry the task title, never the id, so the trail
//! stays readable after the task itself is gone.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::task::Timestamp;

// =============================================================================
// History Action
// =============================================================================

/// What happened to a task.
///
/// An update is recorded as a pair: the old title as `UpdatedOld` followed
/// by the new title as `UpdatedNew`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Added,
    UpdatedOld,
    UpdatedNew,
    Deleted,
}

impl HistoryAction {
    /// Storage and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Added => "ADDED",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::UpdatedNew => "UPDATED_NEW",
            Self::Deleted => "DELETED",
        }
    }
}

impl std::fmt::Display for HistoryAction {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Raised when a stored action string is not one of the known actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown history action: {0}")]
pub struct UnknownHistoryAction(pub String);

impl FromStr for HistoryAction {
    type Err = UnknownHistoryAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ADDED" => Ok(Self::Added),
            "UPDATED_OLD" => Ok(Self::UpdatedOld),
            "UPDATED_NEW" => Ok(Self::UpdatedNew),
            "DELETED" => Ok(Self::Deleted),
            other => Err(UnknownHistoryAction(other.to_string())),
        }
    }
}

// =============================================================================
// History Record
// =============================================================================

/// One immutable entry of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Position in the log; strictly increasing in append order.
    pub sequence: u64,
    /// Title of the task at the time of the change.
    pub task_title: String,
    pub action: HistoryAction,
    pub timestamp: Timestamp,
}

impl HistoryRecord {
    #[must_use]
    pub fn new(
        sequence: u64,
        task_title: impl Into<String>,
        action: HistoryAction,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            sequence,
            task_title: task_title.into(),
            action,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(HistoryAction::Added, "ADDED")]
    #[case(HistoryAction::UpdatedOld, "UPDATED_OLD")]
    #[case(HistoryAction::UpdatedNew, "UPDATED_NEW")]
    #[case(HistoryAction::Deleted, "DELETED")]
    fn test_history_action_storage_names(#[case] action: HistoryAction, #[case] name: &str) {
        assert_eq!(action.as_str(), name);
        assert_eq!(name.parse::<HistoryAction>().unwrap(), action);
        assert_eq!(
            serde_json::to_value(action).unwrap(),
            serde_json::Value::String(name.to_string())
        );
    }

    #[rstest]
    fn test_history_action_rejects_unknown() {
        let error = "RENAMED".parse::<HistoryAction>().unwrap_err();
        assert_eq!(error.to_string(), "Unknown history action: RENAMED");
    }
}
