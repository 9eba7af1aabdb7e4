//! Session state store
//!
//! In-process map from session id to [`SessionState`]. The store itself
//! does no authorization or locking: it is owned by the hub task, which is
//! the only writer.

use std::collections::HashMap;
use std::fmt;

use jamsync_common::events::SessionSnapshot;

/// Identifies one socket connection for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Live state of one rehearsal session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current_line_index: i64,
    pub semitones: i32,
    pub bpm: i64,
    /// Distinct user ids in first-join order
    members: Vec<String>,
    /// User id behind each joined connection
    connections: HashMap<ConnectionId, String>,
}

impl SessionState {
    pub fn new(default_bpm: i64) -> Self {
        Self {
            current_line_index: 0,
            semitones: 0,
            bpm: default_bpm,
            members: Vec::new(),
            connections: HashMap::new(),
        }
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn has_connection(&self, conn: ConnectionId) -> bool {
        self.connections.contains_key(&conn)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            current_line_index: self.current_line_index,
            semitones: self.semitones,
            bpm: self.bpm,
            members: self.members.clone(),
        }
    }
}

/// All sessions, keyed by session id
#[derive(Debug)]
pub struct SessionStore {
    sessions: HashMap<String, SessionState>,
    default_bpm: i64,
}

impl SessionStore {
    pub fn new(default_bpm: i64) -> Self {
        Self {
            sessions: HashMap::new(),
            default_bpm,
        }
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionState> {
        self.sessions.get(session_id)
    }

    /// Session state, created with defaults on first access
    pub fn get_or_create(&mut self, session_id: &str) -> &mut SessionState {
        let default_bpm = self.default_bpm;
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState::new(default_bpm))
    }

    /// Register a connection as `user_id`; repeat joins are no-ops
    ///
    /// Re-joining under a different user id replaces the connection's
    /// previous identity.
    pub fn add_member(&mut self, session_id: &str, conn: ConnectionId, user_id: &str) -> &SessionState {
        let state = self.get_or_create(session_id);
        if let Some(previous) = state.connections.insert(conn, user_id.to_string()) {
            if previous != user_id && !state.connections.values().any(|u| *u == previous) {
                state.members.retain(|m| *m != previous);
            }
        }
        if !state.members.iter().any(|m| m == user_id) {
            state.members.push(user_id.to_string());
        }
        state
    }

    pub fn set_line(&mut self, session_id: &str, line_index: i64) -> &SessionState {
        let state = self.get_or_create(session_id);
        state.current_line_index = line_index;
        state
    }

    pub fn set_transpose(&mut self, session_id: &str, semitones: i32) -> &SessionState {
        let state = self.get_or_create(session_id);
        state.semitones = semitones;
        state
    }

    pub fn set_bpm(&mut self, session_id: &str, bpm: i64) -> &SessionState {
        let state = self.get_or_create(session_id);
        state.bpm = bpm;
        state
    }

    /// Drop a connection from every session it joined
    ///
    /// Returns `(session_id, user_id)` for each membership removed. A user
    /// id leaves `members` only once no other connection carries it.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Vec<(String, String)> {
        let mut removed = Vec::new();
        for (session_id, state) in self.sessions.iter_mut() {
            let Some(user_id) = state.connections.remove(&conn) else {
                continue;
            };
            if !state.connections.values().any(|u| *u == user_id) {
                state.members.retain(|m| *m != user_id);
            }
            removed.push((session_id.clone(), user_id));
        }
        removed.sort();
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_defaults() {
        let mut store = SessionStore::new(80);
        assert!(store.get("s1").is_none());

        let state = store.get_or_create("s1");
        assert_eq!(state.snapshot(), SessionSnapshot {
            current_line_index: 0,
            semitones: 0,
            bpm: 80,
            members: vec![],
        });

        store.set_line("s1", 3);
        assert_eq!(store.get_or_create("s1").current_line_index, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_members_are_distinct_in_join_order() {
        let mut store = SessionStore::new(80);
        store.add_member("s1", ConnectionId(1), "A");
        store.add_member("s1", ConnectionId(2), "B");
        store.add_member("s1", ConnectionId(1), "A");
        let state = store.add_member("s1", ConnectionId(3), "A");
        assert_eq!(state.members(), ["A", "B"]);
    }

    #[test]
    fn test_rejoin_under_new_user_replaces_identity() {
        let mut store = SessionStore::new(80);
        store.add_member("s1", ConnectionId(1), "A");
        store.add_member("s1", ConnectionId(2), "C");
        let state = store.add_member("s1", ConnectionId(1), "B");
        assert_eq!(state.members(), ["C", "B"]);

        let removed = store.remove_connection(ConnectionId(1));
        assert_eq!(removed, [("s1".to_string(), "B".to_string())]);
        assert_eq!(store.get("s1").unwrap().members(), ["C"]);
    }

    #[test]
    fn test_rejoin_keeps_user_held_by_another_connection() {
        let mut store = SessionStore::new(80);
        store.add_member("s1", ConnectionId(1), "A");
        store.add_member("s1", ConnectionId(2), "A");
        let state = store.add_member("s1", ConnectionId(1), "B");
        assert_eq!(state.members(), ["A", "B"]);

        store.remove_connection(ConnectionId(1));
        store.remove_connection(ConnectionId(2));
        assert!(store.get("s1").unwrap().members().is_empty());
    }

    #[test]
    fn test_setters_overwrite() {
        let mut store = SessionStore::new(80);
        store.set_transpose("s", -3);
        store.set_bpm("s", 132);
        let state = store.set_line("s", 999);
        assert_eq!((state.semitones, state.bpm, state.current_line_index), (-3, 132, 999));
    }

    #[test]
    fn test_remove_connection() {
        let mut store = SessionStore::new(80);
        store.add_member("s1", ConnectionId(1), "A");
        store.add_member("s1", ConnectionId(2), "B");
        store.add_member("s1", ConnectionId(3), "A");
        store.add_member("s2", ConnectionId(1), "A");

        let removed = store.remove_connection(ConnectionId(1));
        assert_eq!(removed, [
            ("s1".to_string(), "A".to_string()),
            ("s2".to_string(), "A".to_string()),
        ]);
        // A is still present in s1 through connection 3
        assert_eq!(store.get("s1").unwrap().members(), ["A", "B"]);
        assert!(store.get("s2").unwrap().members().is_empty());

        store.remove_connection(ConnectionId(3));
        assert_eq!(store.get("s1").unwrap().members(), ["B"]);
        assert!(store.remove_connection(ConnectionId(42)).is_empty());
    }
}
