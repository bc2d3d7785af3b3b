//! Per-session protocol state (spec.md §3 "Session").

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::jsonrpc::{JsonRpcResponsePayload, RequestId};

/// Opaque session identifier. Required by Streamable HTTP (`Mcp-Session-Id`
/// header); implicit (one process = one session) for STDIO.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Session lifecycle state (spec.md §3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Uninitialized = 0,
    Initialized = 1,
    Closed = 2,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Initialized,
            2 => Self::Closed,
            _ => Self::Uninitialized,
        }
    }
}

/// Logging severities per RFC 5424, used by `logging/setLevel` (spec.md §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Notice = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
    Alert = 6,
    Emergency = 7,
}

impl LogLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Debug,
            1 => Self::Info,
            2 => Self::Notice,
            3 => Self::Warning,
            4 => Self::Error,
            5 => Self::Critical,
            6 => Self::Alert,
            _ => Self::Emergency,
        }
    }
}

/// A progress token supplied by the requester in `_meta.progressToken`
/// (spec.md §3 "Progress token").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProgressToken {
    String(String),
    Number(i64),
}

/// Bookkeeping for one in-flight request, inbound or outbound (spec.md §3
/// "Request record").
pub struct RequestRecord {
    pub id: RequestId,
    pub method: String,
    pub progress_token: Option<ProgressToken>,
    pub cancellation: CancellationToken,
    pub started_at: Instant,
}

impl RequestRecord {
    pub fn new(id: RequestId, method: impl Into<String>, progress_token: Option<ProgressToken>) -> Self {
        Self {
            id,
            method: method.into(),
            progress_token,
            cancellation: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }
}

/// Snapshot of the peer's advertised capabilities, captured from the
/// `initialize` handshake (spec.md §3 "Session"). Kept as plain booleans
/// here rather than the richer `turbomcp_protocol::ClientCapabilities` type
/// so that `turbomcp-core` does not need to depend on `turbomcp-protocol`;
/// the server and client crates translate between the two at the handshake
/// boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientCapabilitySnapshot {
    pub sampling: bool,
    pub elicitation: bool,
    pub roots: bool,
    pub roots_list_changed: bool,
}

/// One live bidirectional JSON-RPC association over one transport.
///
/// A `Session` is the exclusive owner of its own request-ID space,
/// cancellation scopes, and logging threshold (spec.md §3 "Ownership").
/// Registries that fan out notifications (observer, subscription) hold only
/// `Weak<Session>` references so that a dropped session is cleaned up for
/// free; see `turbomcp_server::registry`.
pub struct Session {
    pub id: SessionId,
    state: AtomicU8,
    logging_threshold: AtomicU8,
    next_outbound_id: AtomicI64,
    /// Requests this side is currently handling (for the receiving side of
    /// `notifications/cancelled`, spec.md §4.18).
    inbound: Mutex<std::collections::HashMap<RequestId, Arc<RequestRecord>>>,
    /// Requests this side sent to the peer and is still awaiting a response
    /// for (sampling/elicitation/roots/ping, spec.md §4.11/§4.12/§4.14/§4.17).
    /// The sender side of each entry is consumed exactly once, by whichever
    /// of "a matching response arrived" or "the request was abandoned" comes
    /// first.
    outbound: Mutex<std::collections::HashMap<RequestId, oneshot::Sender<JsonRpcResponsePayload>>>,
    protocol_version: Mutex<Option<String>>,
    client_capabilities: Mutex<ClientCapabilitySnapshot>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: AtomicU8::new(SessionState::Uninitialized as u8),
            logging_threshold: AtomicU8::new(LogLevel::Error.as_u8()),
            next_outbound_id: AtomicI64::new(1),
            inbound: Mutex::new(std::collections::HashMap::new()),
            outbound: Mutex::new(std::collections::HashMap::new()),
            protocol_version: Mutex::new(None),
            client_capabilities: Mutex::new(ClientCapabilitySnapshot::default()),
        }
    }

    pub fn client_capabilities(&self) -> ClientCapabilitySnapshot {
        *self.client_capabilities.lock()
    }

    pub fn set_client_capabilities(&self, caps: ClientCapabilitySnapshot) {
        *self.client_capabilities.lock() = caps;
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn mark_initialized(&self, protocol_version: impl Into<String>) {
        *self.protocol_version.lock() = Some(protocol_version.into());
        self.state.store(SessionState::Initialized as u8, Ordering::SeqCst);
    }

    pub fn mark_closed(&self) {
        self.state.store(SessionState::Closed as u8, Ordering::SeqCst);
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    pub fn protocol_version(&self) -> Option<String> {
        self.protocol_version.lock().clone()
    }

    pub fn logging_threshold(&self) -> LogLevel {
        LogLevel::from_u8(self.logging_threshold.load(Ordering::Relaxed))
    }

    pub fn set_logging_threshold(&self, level: LogLevel) {
        self.logging_threshold.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Mint the next request ID this session will use for an outbound,
    /// server(or client)-initiated request.
    pub fn next_outbound_id(&self) -> RequestId {
        RequestId::Number(self.next_outbound_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register an inbound request as in-flight so a later
    /// `notifications/cancelled` can find its cancellation scope.
    pub fn begin_inbound(&self, record: RequestRecord) -> Arc<RequestRecord> {
        let record = Arc::new(record);
        self.inbound.lock().insert(record.id.clone(), Arc::clone(&record));
        record
    }

    /// Drop the bookkeeping for a completed inbound request. A request that
    /// was never registered (or already completed) is a tolerated no-op.
    pub fn end_inbound(&self, id: &RequestId) {
        self.inbound.lock().remove(id);
    }

    /// Cancel the named inbound request's scope, if it is still running.
    /// Returns `true` if a live request was found and cancelled.
    pub fn cancel_inbound(&self, id: &RequestId) -> bool {
        if let Some(record) = self.inbound.lock().get(id) {
            record.cancellation.cancel();
            true
        } else {
            false
        }
    }

    /// Mint a fresh outbound request id and register a slot to receive its
    /// eventual response. The caller sends a `JsonRpcRequest` with this id
    /// over the transport, then awaits the returned receiver.
    pub fn begin_outbound(&self) -> (RequestId, oneshot::Receiver<JsonRpcResponsePayload>) {
        let id = self.next_outbound_id();
        let (tx, rx) = oneshot::channel();
        self.outbound.lock().insert(id.clone(), tx);
        (id, rx)
    }

    /// Deliver a response frame to whoever is awaiting this outbound request.
    /// Returns `true` if a waiter was found (an unmatched response, e.g. a
    /// stray frame from an aborted request, is a tolerated no-op).
    pub fn complete_outbound(&self, id: &RequestId, payload: JsonRpcResponsePayload) -> bool {
        if let Some(tx) = self.outbound.lock().remove(id) {
            let _ = tx.send(payload);
            true
        } else {
            false
        }
    }

    /// Abandon an outbound request (e.g. the caller's own timeout fired
    /// first). Dropping the sender completes the receiver with `RecvError`.
    pub fn abandon_outbound(&self, id: &RequestId) {
        self.outbound.lock().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let session = Session::new(SessionId::generate());
        assert_eq!(session.state(), SessionState::Uninitialized);
        assert!(!session.is_initialized());
    }

    #[test]
    fn initialize_then_close() {
        let session = Session::new(SessionId::generate());
        session.mark_initialized("2025-06-18");
        assert!(session.is_initialized());
        assert_eq!(session.protocol_version().as_deref(), Some("2025-06-18"));
        session.mark_closed();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn cancel_inbound_request() {
        let session = Session::new(SessionId::generate());
        let id = RequestId::Number(1);
        let record = RequestRecord::new(id.clone(), "tools/call", None);
        let record = session.begin_inbound(record);
        assert!(!record.cancellation.is_cancelled());
        assert!(session.cancel_inbound(&id));
        assert!(record.cancellation.is_cancelled());
        // Cancelling an already-completed/unknown id is a tolerated no-op.
        session.end_inbound(&id);
        assert!(!session.cancel_inbound(&id));
    }

    #[test]
    fn logging_threshold_defaults_conservative() {
        let session = Session::new(SessionId::generate());
        assert_eq!(session.logging_threshold(), LogLevel::Error);
        session.set_logging_threshold(LogLevel::Debug);
        assert_eq!(session.logging_threshold(), LogLevel::Debug);
    }

    #[tokio::test]
    async fn outbound_request_round_trips_to_its_waiter() {
        let session = Session::new(SessionId::generate());
        let (id, rx) = session.begin_outbound();
        assert!(session.complete_outbound(&id, JsonRpcResponsePayload::Success { result: serde_json::json!(42) }));
        let payload = rx.await.unwrap();
        assert!(matches!(payload, JsonRpcResponsePayload::Success { result } if result == serde_json::json!(42)));
    }

    #[tokio::test]
    async fn abandoned_outbound_request_drops_its_receiver() {
        let session = Session::new(SessionId::generate());
        let (id, rx) = session.begin_outbound();
        session.abandon_outbound(&id);
        assert!(rx.await.is_err());
        // The slot is gone, so a late response finds no waiter.
        assert!(!session.complete_outbound(&id, JsonRpcResponsePayload::Success { result: serde_json::json!(null) }));
    }

    #[test]
    fn client_capabilities_default_to_unsupported() {
        let session = Session::new(SessionId::generate());
        assert_eq!(session.client_capabilities(), ClientCapabilitySnapshot::default());
        session.set_client_capabilities(ClientCapabilitySnapshot { sampling: true, ..Default::default() });
        assert!(session.client_capabilities().sampling);
        assert!(!session.client_capabilities().roots);
    }
}
