//! Session table: `DashMap<SessionId, Arc<Session>>` (spec.md §3 "Session",
//! §4.3 "Session lifecycle").
//!
//! One process-wide table regardless of transport. STDIO only ever has one
//! entry; Streamable HTTP has as many as there are concurrent clients.

use std::sync::Arc;

use dashmap::DashMap;
use turbomcp_core::session::{Session, SessionId};

/// Owns every live [`Session`]. Cheap to clone (an `Arc` around the map).
#[derive(Debug, Clone, Default)]
pub struct SessionManager {
    sessions: Arc<DashMap<SessionId, Arc<Session>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Look up an existing session, or create and insert a fresh
    /// `Uninitialized` one under `id` if none exists yet. The dispatcher
    /// calls this on every inbound frame so a Streamable HTTP request whose
    /// `Mcp-Session-Id` header was just minted by the transport gets a
    /// matching `Session` the first time it's seen.
    pub fn get_or_create(&self, id: &SessionId) -> Arc<Session> {
        if let Some(session) = self.sessions.get(id) {
            return Arc::clone(&session);
        }
        let session = Arc::new(Session::new(id.clone()));
        self.sessions.insert(id.clone(), Arc::clone(&session));
        session
    }

    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| Arc::clone(&entry))
    }

    /// Every currently-live session, for callers (the heartbeat loop) that
    /// need to iterate the whole table rather than look one up by id.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// Drop a session's state entirely (e.g. on transport disconnect).
    /// Registries holding only `Weak<Session>` references notice on their
    /// own next access; this just stops the table itself from growing
    /// without bound.
    pub fn remove(&self, id: &SessionId) {
        self.sessions.remove(id);
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
    fn get_or_create_is_idempotent() {
        let manager = SessionManager::new();
        let id = SessionId::generate();
        let first = manager.get_or_create(&id);
        let second = manager.get_or_create(&id);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn snapshot_lists_every_live_session() {
        let manager = SessionManager::new();
        manager.get_or_create(&SessionId::generate());
        manager.get_or_create(&SessionId::generate());
        assert_eq!(manager.snapshot().len(), 2);
    }

    #[test]
    fn remove_drops_the_entry() {
        let manager = SessionManager::new();
        let id = SessionId::generate();
        manager.get_or_create(&id);
        manager.remove(&id);
        assert!(manager.get(&id).is_none());
        assert!(manager.is_empty());
    }
}
