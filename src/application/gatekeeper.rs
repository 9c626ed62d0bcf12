//! Login, logout and the idle-timeout check.
//!
//! The gatekeeper is a pure state machine over [`BrowserSession`]. The web
//! layer runs [`Gatekeeper::admit`] once per guarded request while holding
//! the session slot lock.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{BrowserSession, SessionState};

/// Flash shown after a login attempt with the wrong identity.
pub const ACCESS_DENIED_NOTICE: &str = "Unauthorized user. Access denied.";

/// Flash shown on the page the browser lands on after an idle timeout.
pub const SESSION_TIMEOUT_NOTICE: &str = "Session timed out due to inactivity. Please login again.";

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted,
    Rejected,
}

/// Result of the idle check on a guarded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// No live session; the handler decides what an anonymous visitor gets.
    Anonymous,
    /// Within the idle limit; activity refreshed to now.
    Refreshed,
    /// Idle limit exceeded; the session state was discarded.
    Expired,
}

#[derive(Debug, Clone)]
pub struct Gatekeeper {
    allowed_identity: String,
    idle_limit: Duration,
}

impl Gatekeeper {
    #[must_use]
    pub fn new(allowed_identity: impl Into<String>, idle_limit: Duration) -> Self {
        Self {
            allowed_identity: allowed_identity.into(),
            idle_limit,
        }
    }

    /// Pages that are bound to a session but skip the idle check.
    #[must_use]
    pub fn is_exempt(path: &str) -> bool {
        matches!(path, "/login" | "/logout" | "/session-timeout")
    }

    /// Starts a fresh session when `identity` is the allowed one.
    ///
    /// A rejected attempt leaves the session as it was and queues the
    /// access-denied notice.
    pub fn login(
        &self,
        session: &mut BrowserSession,
        identity: &str,
        now: DateTime<Utc>,
    ) -> LoginOutcome {
        if identity != self.allowed_identity {
            tracing::warn!(identity, "Rejected login");
            session.flash(ACCESS_DENIED_NOTICE);
            return LoginOutcome::Rejected;
        }

        session.authenticate(SessionState::started(identity, now));
        tracing::info!(identity, "Logged in");
        LoginOutcome::Accepted
    }

    pub fn logout(&self, session: &mut BrowserSession) {
        if let Some(state) = session.state() {
            tracing::info!(identity = %state.identity, "Logged out");
        }
        session.reset();
    }

    /// Applies the sliding idle timeout to a guarded request.
    pub fn admit(&self, session: &mut BrowserSession, now: DateTime<Utc>) -> GateDecision {
        let Some(state) = session.state_mut() else {
            return GateDecision::Anonymous;
        };

        let Some(last_activity) = state.last_activity else {
            state.last_activity = Some(now);
            return GateDecision::Refreshed;
        };

        // A clock that stepped backwards counts as no idle time
        let idle = now
            .signed_duration_since(last_activity)
            .to_std()
            .unwrap_or_default();

        if idle > self.idle_limit {
            tracing::info!(
                identity = %state.identity,
                idle_ms = u64::try_from(idle.as_millis()).unwrap_or(u64::MAX),
                "Session expired"
            );
            session.expire();
            session.flash(SESSION_TIMEOUT_NOTICE);
            return GateDecision::Expired;
        }

        state.last_activity = Some(now);
        tracing::debug!(identity = %state.identity, "Session activity refreshed");
        GateDecision::Refreshed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionPhase;
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn gatekeeper() -> Gatekeeper {
        Gatekeeper::new("Marushka", Duration::from_secs(10))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().unwrap()
    }

    fn logged_in(gatekeeper: &Gatekeeper) -> BrowserSession {
        let mut session = BrowserSession::new();
        assert_eq!(
            gatekeeper.login(&mut session, "Marushka", start()),
            LoginOutcome::Accepted
        );
        session
    }

    #[rstest]
    fn test_login_with_allowed_identity_starts_fresh_session(gatekeeper: Gatekeeper) {
        let session = logged_in(&gatekeeper);

        let state = session.state().unwrap();
        assert_eq!(state.identity, "Marushka");
        assert_eq!(state.last_activity, Some(start()));
        assert_eq!(state.markers.recently_added, None);
        assert_eq!(state.markers.recently_deleted, None);
    }

    #[rstest]
    #[case("marushka")]
    #[case("Marushka ")]
    #[case("mallory")]
    #[case("")]
    fn test_login_with_wrong_identity_is_rejected(gatekeeper: Gatekeeper, #[case] identity: &str) {
        let mut session = BrowserSession::new();

        let outcome = gatekeeper.login(&mut session, identity, start());

        assert_eq!(outcome, LoginOutcome::Rejected);
        assert_eq!(session.phase(), &SessionPhase::Anonymous);
        assert_eq!(session.take_flashes(), vec![ACCESS_DENIED_NOTICE]);
    }

    #[rstest]
    fn test_rejected_login_keeps_existing_session(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);
        let before = session.state().cloned();

        gatekeeper.login(&mut session, "mallory", start() + TimeDelta::seconds(1));

        assert_eq!(session.state().cloned(), before);
    }

    #[rstest]
    fn test_login_again_resets_markers(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);
        if let Some(state) = session.state_mut() {
            state.markers.record_added("buy milk");
            state.markers.record_deleted("wash car", Default::default());
        }

        gatekeeper.login(&mut session, "Marushka", start() + TimeDelta::seconds(3));

        let state = session.state().unwrap();
        assert_eq!(state.markers.recently_added, None);
        assert_eq!(state.markers.recently_deleted, None);
        assert_eq!(state.last_activity, Some(start() + TimeDelta::seconds(3)));
    }

    #[rstest]
    #[case(TimeDelta::zero())]
    #[case(TimeDelta::seconds(5))]
    #[case(TimeDelta::seconds(10) - TimeDelta::milliseconds(1))]
    #[case(TimeDelta::seconds(10))]
    fn test_admit_within_limit_refreshes_activity(gatekeeper: Gatekeeper, #[case] idle: TimeDelta) {
        let mut session = logged_in(&gatekeeper);
        let now = start() + idle;

        let decision = gatekeeper.admit(&mut session, now);

        assert_eq!(decision, GateDecision::Refreshed);
        assert_eq!(session.state().unwrap().last_activity, Some(now));
        assert!(session.take_flashes().is_empty());
    }

    #[rstest]
    #[case(TimeDelta::seconds(10) + TimeDelta::milliseconds(1))]
    #[case(TimeDelta::seconds(11))]
    #[case(TimeDelta::hours(1))]
    fn test_admit_past_limit_expires_session(gatekeeper: Gatekeeper, #[case] idle: TimeDelta) {
        let mut session = logged_in(&gatekeeper);

        let decision = gatekeeper.admit(&mut session, start() + idle);

        assert_eq!(decision, GateDecision::Expired);
        assert_eq!(session.phase(), &SessionPhase::Expired);
        assert_eq!(session.take_flashes(), vec![SESSION_TIMEOUT_NOTICE]);
    }

    #[rstest]
    fn test_activity_slides_with_each_request(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);

        for step in 1..=5 {
            let now = start() + TimeDelta::seconds(8 * step);
            assert_eq!(gatekeeper.admit(&mut session, now), GateDecision::Refreshed);
        }
    }

    #[rstest]
    fn test_admit_after_expiry_is_anonymous(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);
        gatekeeper.admit(&mut session, start() + TimeDelta::seconds(30));

        let decision = gatekeeper.admit(&mut session, start() + TimeDelta::seconds(31));

        assert_eq!(decision, GateDecision::Anonymous);
    }

    #[rstest]
    fn test_admit_sets_missing_activity(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);
        if let Some(state) = session.state_mut() {
            state.last_activity = None;
        }
        let now = start() + TimeDelta::hours(2);

        assert_eq!(gatekeeper.admit(&mut session, now), GateDecision::Refreshed);
        assert_eq!(session.state().unwrap().last_activity, Some(now));
    }

    #[rstest]
    fn test_admit_tolerates_clock_stepping_back(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);

        let decision = gatekeeper.admit(&mut session, start() - TimeDelta::seconds(60));

        assert_eq!(decision, GateDecision::Refreshed);
    }

    #[rstest]
    fn test_logout_is_idempotent(gatekeeper: Gatekeeper) {
        let mut session = logged_in(&gatekeeper);

        gatekeeper.logout(&mut session);
        gatekeeper.logout(&mut session);

        assert_eq!(session.phase(), &SessionPhase::Anonymous);
    }

    #[rstest]
    #[case("/login", true)]
    #[case("/logout", true)]
    #[case("/session-timeout", true)]
    #[case("/", false)]
    #[case("/history", false)]
    #[case("/update/1", false)]
    #[case("/delete/1", false)]
    #[case("/login/extra", false)]
    fn test_is_exempt(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(Gatekeeper::is_exempt(path), expected);
    }
}
