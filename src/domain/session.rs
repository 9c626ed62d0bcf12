//! Session domain model.
//!
//! A browser context owns one [`BrowserSession`]. While the user is logged
//! in it holds a [`SessionState`]; after logout or an idle timeout the
//! state is gone but pending flash notices are kept so the next page can
//! show them.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;

// =============================================================================
// Transient Markers
// =============================================================================

/// "Recently added" / "recently deleted" hints shown above the task list.
///
/// Each field holds the title of the last task touched by the matching
/// operation. They are overwritten, never accumulated, and have no bearing
/// on what the store or the audit trail contain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransientMarkers {
    pub recently_added: Option<String>,
    pub recently_deleted: Option<String>,
}

impl TransientMarkers {
    /// Marks `title` as the most recently added task.
    pub fn record_added(&mut self, title: &str) {
        self.recently_added = Some(title.to_string());
    }

    /// Marks `title` as the most recently deleted task, applying `policy`
    /// to the "recently added" marker.
    pub fn record_deleted(&mut self, title: &str, policy: DeleteMarkerPolicy) {
        if policy == DeleteMarkerPolicy::ClearMatching
            && self.recently_added.as_deref() == Some(title)
        {
            self.recently_added = None;
        }
        self.recently_deleted = Some(title.to_string());
    }

    /// An update reads as "the old title went away, the new one arrived".
    pub fn record_renamed(&mut self, old_title: &str, new_title: &str) {
        self.recently_deleted = Some(old_title.to_string());
        self.recently_added = Some(new_title.to_string());
    }

    pub fn clear(&mut self) {
        self.recently_added = None;
        self.recently_deleted = None;
    }
}

/// What a delete does to a "recently added" marker naming the same title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMarkerPolicy {
    /// Leave "recently added" untouched.
    #[default]
    Keep,
    /// Clear "recently added" when it names the deleted title.
    ClearMatching,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid delete marker policy: {0} (expected keep | clear-matching)")]
pub struct InvalidDeleteMarkerPolicy(pub String);

impl FromStr for DeleteMarkerPolicy {
    type Err = InvalidDeleteMarkerPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "clear-matching" | "clear_matching" | "clear" => Ok(Self::ClearMatching),
            _ => Err(InvalidDeleteMarkerPolicy(value.to_string())),
        }
    }
}

// =============================================================================
// Session State
// =============================================================================

/// State of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub identity: String,
    /// Instant of the last request that passed the idle check.
    pub last_activity: Option<DateTime<Utc>>,
    pub markers: TransientMarkers,
}

impl SessionState {
    /// A fresh session for `identity`, active as of `now`, with empty markers.
    #[must_use]
    pub fn started(identity: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.into(),
            last_activity: Some(now),
            markers: TransientMarkers::default(),
        }
    }
}

/// Lifecycle phase of a browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Anonymous,
    Authenticated(SessionState),
    /// Cleared by the idle timeout; behaves like `Anonymous` until the next
    /// login or logout.
    Expired,
}

/// Everything the server remembers about one browser context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserSession {
    phase: SessionPhase,
    flashes: Vec<String>,
}

impl BrowserSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    #[must_use]
    pub const fn state(&self) -> Option<&SessionState> {
        match &self.phase {
            SessionPhase::Authenticated(state) => Some(state),
            SessionPhase::Anonymous | SessionPhase::Expired => None,
        }
    }

    pub const fn state_mut(&mut self) -> Option<&mut SessionState> {
        match &mut self.phase {
            SessionPhase::Authenticated(state) => Some(state),
            SessionPhase::Anonymous | SessionPhase::Expired => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }

    /// Not logged in and nothing left to show.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        !self.is_authenticated() && self.flashes.is_empty()
    }

    /// Replaces whatever was there with a freshly authenticated state.
    pub fn authenticate(&mut self, state: SessionState) {
        self.phase = SessionPhase::Authenticated(state);
    }

    /// Drops the session state after an idle timeout.
    pub fn expire(&mut self) {
        self.phase = SessionPhase::Expired;
    }

    /// Drops the session state and any pending notices.
    pub fn reset(&mut self) {
        self.phase = SessionPhase::Anonymous;
        self.flashes.clear();
    }

    /// Queues a one-time notice for the next rendered page.
    pub fn flash(&mut self, message: impl Into<String>) {
        self.flashes.push(message.into());
    }

    /// Returns and forgets all pending notices.
    pub fn take_flashes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.flashes)
    }
}
