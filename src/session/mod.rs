//! Registry of connected clients.
//!
//! Every connection registers an outbound channel; the socket task drains it.
//! Mutations take one lock so message counters never lose updates.

use crate::events::ServerEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

pub type EventSender = mpsc::UnboundedSender<ServerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ServerEvent>;

struct SessionEntry {
    created_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    message_count: u64,
    sender: EventSender,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub message_count: u64,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a session. Returns `false` and leaves the existing record alone
    /// if the id is already registered.
    pub fn register(&self, session_id: &str, sender: EventSender) -> bool {
        let mut sessions = self.lock();
        if sessions.contains_key(session_id) {
            debug!("Session {} already registered", session_id);
            return false;
        }

        let now = Utc::now();
        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                created_at: now,
                last_seen: now,
                message_count: 0,
                sender,
            },
        );
        true
    }

    /// Bumps activity for a session; unknown ids are ignored.
    pub fn touch(&self, session_id: &str) -> Option<u64> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(session_id)?;
        entry.last_seen = Utc::now();
        entry.message_count += 1;
        Some(entry.message_count)
    }

    /// Removes a session and returns its final message count.
    pub fn unregister(&self, session_id: &str) -> Option<u64> {
        self.lock()
            .remove(session_id)
            .map(|entry| entry.message_count)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    pub fn get(&self, session_id: &str) -> Option<SessionInfo> {
        self.lock().get(session_id).map(|entry| SessionInfo {
            id: session_id.to_string(),
            created_at: entry.created_at,
            last_seen: entry.last_seen,
            message_count: entry.message_count,
        })
    }

    pub fn sender(&self, session_id: &str) -> Option<EventSender> {
        self.lock()
            .get(session_id)
            .map(|entry| entry.sender.clone())
    }

    /// Snapshot of every session's channel, taken under the lock so that
    /// delivery itself happens without holding it.
    pub fn broadcast_targets(&self) -> Vec<(String, EventSender)> {
        self.lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.sender.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn channel() -> (EventSender, EventReceiver) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_starts_with_zero_messages() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = channel();

        assert!(registry.register("s1", tx));
        let info = registry.get("s1").unwrap();
        assert_eq!(info.message_count, 0);
        assert_eq!(info.created_at, info.last_seen);
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = channel();
        registry.register("s1", tx.clone());
        registry.touch("s1");

        assert!(!registry.register("s1", tx));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.get("s1").unwrap().message_count, 1);
    }

    #[test]
    fn test_touch_increments_and_updates_last_seen() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = channel();
        registry.register("s1", tx);
        let before = registry.get("s1").unwrap();

        assert_eq!(registry.touch("s1"), Some(1));
        assert_eq!(registry.touch("s1"), Some(2));

        let after = registry.get("s1").unwrap();
        assert_eq!(after.message_count, 2);
        assert!(after.last_seen >= before.last_seen);
    }

    #[test]
    fn test_touch_unknown_session_is_noop() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.touch("ghost"), None);
        assert_eq!(registry.count(), 0);
    }

    #[test]
    fn test_unregister_returns_count_and_is_idempotent() {
        let registry = SessionRegistry::new();
        let (tx, _rx) = channel();
        registry.register("s1", tx);
        registry.touch("s1");
        registry.touch("s1");

        assert_eq!(registry.unregister("s1"), Some(2));
        assert_eq!(registry.unregister("s1"), None);
        assert_eq!(registry.count(), 0);
        assert!(!registry.contains("s1"));
    }

    #[test]
    fn test_broadcast_targets_lists_every_session() {
        let registry = SessionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        registry.register("a", tx1);
        registry.register("b", tx2);

        let mut ids: Vec<String> = registry
            .broadcast_targets()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_concurrent_touches_are_not_lost() {
        let registry = Arc::new(SessionRegistry::new());
        let (tx, _rx) = channel();
        registry.register("shared", tx);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        registry.touch("shared");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.get("shared").unwrap().message_count, 2000);
    }
}
