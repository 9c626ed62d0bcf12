//! Server-side session slots.
//!
//! The browser only holds an opaque [`SessionId`] in a cookie. The store
//! maps it to a slot containing the [`BrowserSession`]. Each slot has its
//! own lock, so the idle check and a task mutation for the same browser
//! never interleave while different browsers proceed independently.
//!
//! A slot is only kept while it carries something: a logged-in state or a
//! pending notice. Requests that leave their slot blank (anonymous pages,
//! rejected logins, logout) are settled by dropping it, and slots nobody
//! has touched for longer than the retention window are evicted whenever a
//! new one is stored.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::BrowserSession;

/// How long an untouched slot is retained by default.
pub const DEFAULT_SESSION_RETENTION: Duration = Duration::from_secs(30 * 60);

/// Opaque identifier carried in the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

/// Shared handle to one browser's session.
pub type SessionSlot = Arc<Mutex<BrowserSession>>;

/// Result of looking up a cookie value.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    pub id: SessionId,
    pub slot: SessionSlot,
    /// `true` when no stored slot matched and a provisional one was handed
    /// out. It is only stored, and the id only sent to the browser, if
    /// [`SessionStore::settle`] keeps it.
    pub created: bool,
}

#[derive(Debug)]
struct StoredSlot {
    slot: SessionSlot,
    last_seen: DateTime<Utc>,
}

/// All live session slots.
#[derive(Debug)]
pub struct SessionStore {
    slots: RwLock<HashMap<SessionId, StoredSlot>>,
    retention: Duration,
}

impl SessionStore {
    /// Creates an empty store evicting slots untouched for `retention`.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Returns the stored slot for `id`, or a fresh anonymous one under a
    /// new id when `id` is absent or unknown.
    pub async fn resolve(&self, id: Option<SessionId>) -> ResolvedSession {
        if let Some(id) = id
            && let Some(stored) = self.slots.read().await.get(&id)
        {
            return ResolvedSession {
                id,
                slot: Arc::clone(&stored.slot),
                created: false,
            };
        }

        ResolvedSession {
            id: SessionId::generate(),
            slot: Arc::new(Mutex::new(BrowserSession::new())),
            created: true,
        }
    }

    /// Stores or drops `slot` once a request is done with it.
    ///
    /// Blank sessions are removed; anything else is stored under `id` and
    /// marked as seen at `now`. Returns whether the slot is kept.
    pub async fn settle(&self, id: SessionId, slot: &SessionSlot, now: DateTime<Utc>) -> bool {
        // Lock order: slot, then map. Nothing holds the map while waiting on a slot.
        let session = slot.lock().await;
        let mut slots = self.slots.write().await;

        if session.is_blank() {
            if slots.remove(&id).is_some() {
                tracing::debug!(session_id = %id, "Dropped blank session slot");
            }
            return false;
        }

        if let Some(stored) = slots.get_mut(&id) {
            stored.last_seen = now;
            return true;
        }

        self.evict_stale(&mut slots, now);
        slots.insert(
            id,
            StoredSlot {
                slot: Arc::clone(slot),
                last_seen: now,
            },
        );
        tracing::debug!(session_id = %id, "Stored session slot");
        true
    }

    fn evict_stale(&self, slots: &mut HashMap<SessionId, StoredSlot>, now: DateTime<Utc>) {
        let before = slots.len();
        slots.retain(|_, stored| {
            !now
                .signed_duration_since(stored.last_seen)
                .to_std()
                .is_ok_and(|untouched| untouched > self.retention)
        });
        let evicted = before - slots.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted stale session slots");
        }
    }

    /// Number of slots currently held.
    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionState;
    use chrono::{TimeDelta, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60))
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).single().unwrap()
    }

    async fn logged_in(store: &SessionStore, now: DateTime<Utc>) -> SessionId {
        let resolved = store.resolve(None).await;
        resolved
            .slot
            .lock()
            .await
            .authenticate(SessionState::started("Marushka", now));
        assert!(store.settle(resolved.id, &resolved.slot, now).await);
        resolved.id
    }

    #[rstest]
    #[tokio::test]
    async fn test_unknown_id_gets_provisional_slot_under_new_id(store: SessionStore) {
        let unknown = SessionId::generate();

        let resolved = store.resolve(Some(unknown)).await;

        assert!(resolved.created);
        assert_ne!(resolved.id, unknown);
        assert!(store.is_empty().await);
    }

    #[rstest]
    #[tokio::test]
    async fn test_blank_slots_are_never_stored(store: SessionStore) {
        for _ in 0..100 {
            let resolved = store.resolve(Some(SessionId::generate())).await;
            assert!(!store.settle(resolved.id, &resolved.slot, start()).await);
        }

        assert_eq!(store.len().await, 0);
    }

    #[rstest]
    #[tokio::test]
    async fn test_resolve_returns_same_slot_for_kept_id(store: SessionStore) {
        let first = store.resolve(None).await;
        first.slot.lock().await.flash("hello");
        assert!(store.settle(first.id, &first.slot, start()).await);

        let second = store.resolve(Some(first.id)).await;

        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.slot.lock().await.take_flashes(), vec!["hello"]);
    }

    #[rstest]
    #[tokio::test]
    async fn test_settling_a_reset_session_drops_it(store: SessionStore) {
        let id = logged_in(&store, start()).await;
        let resolved = store.resolve(Some(id)).await;
        resolved.slot.lock().await.reset();

        assert!(!store.settle(id, &resolved.slot, start()).await);

        assert_eq!(store.len().await, 0);
        assert!(store.resolve(Some(id)).await.created);
    }

    #[rstest]
    #[tokio::test]
    async fn test_untouched_slots_are_evicted_on_insert(store: SessionStore) {
        let stale = logged_in(&store, start()).await;
        let fresh = logged_in(&store, start() + TimeDelta::seconds(50)).await;

        let newest = logged_in(&store, start() + TimeDelta::seconds(61)).await;

        assert_eq!(store.len().await, 2);
        assert!(store.resolve(Some(stale)).await.created);
        assert!(!store.resolve(Some(fresh)).await.created);
        assert!(!store.resolve(Some(newest)).await.created);
    }

    #[rstest]
    fn test_session_id_round_trips_through_cookie_text() {
        let id = SessionId::generate();
        assert_eq!(id.to_string().parse::<SessionId>().unwrap(), id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
