//! In-memory session store.
//!
//! The store is bounded: a capacity cap plus a time-to-live. Expired sessions
//! are swept on every insert and never returned from lookups, so memory use
//! stays bounded under sustained traffic.

use crate::session::{InterviewParams, InterviewSession};
use chrono::{Duration, Utc};
use uuid::Uuid;

pub struct SessionStore {
    sessions: std::collections::HashMap<String, InterviewSession>,
    capacity: usize,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: std::collections::HashMap::new(),
            capacity,
            ttl,
        }
    }

    /// Creates a session and returns a handle to it. Sweeps expired sessions
    /// first; when still at capacity, the stalest session is evicted.
    pub fn create(&mut self, params: InterviewParams) -> &mut InterviewSession {
        self.sweep_expired();
        while self.sessions.len() >= self.capacity {
            let oldest = self
                .sessions
                .values()
                .min_by_key(|s| s.started_at)
                .map(|s| s.id.clone());
            match oldest {
                Some(id) => {
                    tracing::warn!(session_id = %id, "session store at capacity, evicting oldest");
                    self.sessions.remove(&id);
                }
                None => break,
            }
        }

        let id = Uuid::new_v4().to_string();
        let session = InterviewSession::new(id.clone(), params);
        self.sessions.entry(id).or_insert(session)
    }

    pub fn get(&self, id: &str) -> Option<&InterviewSession> {
        self.sessions.get(id).filter(|s| !self.expired(s))
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut InterviewSession> {
        if self.sessions.get(id).is_some_and(|s| self.expired(s)) {
            self.sessions.remove(id);
            return None;
        }
        self.sessions.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn expired(&self, session: &InterviewSession) -> bool {
        Utc::now() - session.started_at > self.ttl
    }

    fn sweep_expired(&mut self) {
        let ttl = self.ttl;
        self.sessions
            .retain(|_, s| Utc::now() - s.started_at <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InterviewParams;

    #[test]
    fn create_returns_distinct_ids_with_independent_histories() {
        let mut store = SessionStore::new(16, Duration::minutes(60));
        let a = store.create(InterviewParams::default()).id.clone();
        let b = store.create(InterviewParams::default()).id.clone();
        assert_ne!(a, b);

        store
            .get_mut(&a)
            .unwrap()
            .push_turn(crate::session::Role::Assistant, "hello a")
            .unwrap();

        assert_eq!(store.get(&a).unwrap().turns().len(), 2);
        assert_eq!(store.get(&b).unwrap().turns().len(), 1);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let store = SessionStore::new(16, Duration::minutes(60));
        assert!(store.get("nope").is_none());
    }

    #[test]
    fn capacity_evicts_the_stalest_session() {
        let mut store = SessionStore::new(2, Duration::minutes(60));
        let first = store.create(InterviewParams::default()).id.clone();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create(InterviewParams::default()).id.clone();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let third = store.create(InterviewParams::default()).id.clone();

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none(), "oldest session should be gone");
        assert!(store.get(&second).is_some());
        assert!(store.get(&third).is_some());
    }

    #[test]
    fn expired_sessions_are_not_returned() {
        let mut store = SessionStore::new(16, Duration::zero());
        let id = store.create(InterviewParams::default()).id.clone();
        // TTL of zero: expired immediately.
        assert!(store.get(&id).is_none());
        assert!(store.get_mut(&id).is_none());
    }
}
