//! The minimal contract a transport must satisfy (spec.md §4.2 "Custom transports").
//!
//! Anything able to deliver a JSON-RPC frame to a named session, and to hand
//! received frames to a dispatcher, qualifies. STDIO and Streamable HTTP
//! (in `turbomcp-transport`) are the two transports the core ships; this
//! trait lets an implementer substitute any other one without touching the
//! capability services.

use async_trait::async_trait;
use thiserror::Error;

use crate::jsonrpc::JsonRpcMessage;
use crate::session::SessionId;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("session closed: {0}")]
    SessionClosed(SessionId),
    #[error("io error: {0}")]
    Io(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// The write-side of a transport: push one frame to a named session.
///
/// Capability services (observer/subscription registries, the ping
/// heartbeat, progress tracker) depend only on this trait, never on a
/// concrete transport, so they can broadcast without knowing whether the
/// peer is reachable over STDIO or an HTTP SSE stream.
#[async_trait]
pub trait TransportSink: Send + Sync {
    async fn send(&self, session_id: &SessionId, message: JsonRpcMessage) -> TransportResult<()>;
}
