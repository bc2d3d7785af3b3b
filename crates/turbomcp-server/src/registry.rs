//! Observer and Subscription registries (spec.md §4.13).
//!
//! Both hold only `Weak<Session>` references so a dropped/closed session is
//! cleaned up the next time it's touched rather than requiring an explicit
//! unregister call on every transport disconnect path. Both are guarded by
//! a single mutex each and never perform transport I/O while holding it —
//! callers snapshot the subscriber set, drop the lock, then send.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::JsonRpcMessage;
use turbomcp_core::session::{Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::types::Uri;

/// Sessions interested in `*/list_changed` fan-out for one capability. A
/// session is (re-)added every time it performs a `*/list` call on a
/// capability that advertises `listChanged` (spec.md §4.13 "Observer
/// registry").
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<HashMap<SessionId, Weak<Session>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, session: &Arc<Session>) {
        self.observers.lock().insert(session.id.clone(), Arc::downgrade(session));
    }

    /// Upgrade every live weak ref, dropping (and returning) dead entries in
    /// the same pass so the table doesn't grow without bound.
    fn snapshot(&self) -> Vec<Arc<Session>> {
        let mut observers = self.observers.lock();
        let mut live = Vec::with_capacity(observers.len());
        observers.retain(|_, weak| match weak.upgrade() {
            Some(session) => {
                live.push(session);
                true
            }
            None => false,
        });
        live
    }

    pub fn remove(&self, session_id: &SessionId) {
        self.observers.lock().remove(session_id);
    }

    /// Broadcast `notification` to every live observer. Yields between
    /// deliveries (a cooperative checkpoint, spec.md §4.13) so a large
    /// observer set can't starve the scheduler; a session whose delivery
    /// fails is dropped from the registry rather than retried.
    pub async fn broadcast(&self, sink: &dyn TransportSink, notification: JsonRpcMessage) {
        let observers = self.snapshot();
        for session in observers {
            if sink.send(&session.id, notification.clone()).await.is_err() {
                self.remove(&session.id);
            }
            tokio::task::yield_now().await;
        }
    }
}

#[derive(Default)]
struct SubscriptionState {
    by_uri: HashMap<Uri, HashMap<SessionId, Weak<Session>>>,
    by_session: HashMap<SessionId, HashSet<Uri>>,
}

/// Dual index of resource URI ↔ subscribed sessions (spec.md §4.13
/// "Subscription registry"). `subscribe`/`unsubscribe`/`prune_session` are
/// O(1) and update both indices atomically under one lock.
#[derive(Default)]
pub struct SubscriptionRegistry {
    state: Mutex<SubscriptionState>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, session: &Arc<Session>, uri: Uri) {
        let mut state = self.state.lock();
        state
            .by_uri
            .entry(uri.clone())
            .or_default()
            .insert(session.id.clone(), Arc::downgrade(session));
        state.by_session.entry(session.id.clone()).or_default().insert(uri);
    }

    pub fn unsubscribe(&self, session_id: &SessionId, uri: &Uri) {
        let mut state = self.state.lock();
        if let Some(subscribers) = state.by_uri.get_mut(uri) {
            subscribers.remove(session_id);
            if subscribers.is_empty() {
                state.by_uri.remove(uri);
            }
        }
        if let Some(uris) = state.by_session.get_mut(session_id) {
            uris.remove(uri);
            if uris.is_empty() {
                state.by_session.remove(session_id);
            }
        }
    }

    /// Remove a session from every URI it subscribed to, in one critical
    /// section (spec.md §4.13 "prune_session").
    pub fn prune_session(&self, session_id: &SessionId) {
        let mut state = self.state.lock();
        if let Some(uris) = state.by_session.remove(session_id) {
            for uri in uris {
                if let Some(subscribers) = state.by_uri.get_mut(&uri) {
                    subscribers.remove(session_id);
                    if subscribers.is_empty() {
                        state.by_uri.remove(&uri);
                    }
                }
            }
        }
    }

    fn snapshot_subscribers(&self, uri: &Uri) -> Vec<Arc<Session>> {
        let state = self.state.lock();
        state
            .by_uri
            .get(uri)
            .map(|subscribers| subscribers.values().filter_map(Weak::upgrade).collect())
            .unwrap_or_default()
    }

    /// Snapshot the subscriber set for `uri`, release the lock, then send
    /// `notification` to each. Sessions whose delivery fails are pruned
    /// afterward (spec.md §4.13 "notify_updated").
    pub async fn notify_updated(&self, sink: &dyn TransportSink, uri: &Uri, notification: JsonRpcMessage) {
        let subscribers = self.snapshot_subscribers(uri);
        let mut failed = Vec::new();
        for session in subscribers {
            if sink.send(&session.id, notification.clone()).await.is_err() {
                failed.push(session.id.clone());
            }
        }
        for session_id in failed {
            self.unsubscribe(&session_id, uri);
        }
    }
}
