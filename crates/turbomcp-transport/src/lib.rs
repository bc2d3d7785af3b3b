//! # turbomcp-transport
//!
//! The two transports the core ships: STDIO (newline-delimited JSON over
//! stdin/stdout, diagnostics to stderr only) and Streamable HTTP (POST+SSE
//! over axum, behind the `http` feature). Both implement
//! `turbomcp_core::TransportSink` so capability services never need to know
//! which one a session is using.
//!
//! `security` holds the DNS-rebinding guard shared by the HTTP transport.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod security;

#[cfg(feature = "stdio")]
pub mod stdio;

#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use turbomcp_core::jsonrpc::JsonRpcMessage;
use turbomcp_core::session::SessionId;

/// Something that turns an inbound frame into an outbound one (or nothing,
/// for a notification). The dispatcher in `turbomcp-server` is the only
/// production implementer; transports depend on this trait, never on the
/// dispatcher's concrete type.
///
/// `session_id` identifies which session the frame belongs to. STDIO has
/// exactly one for the lifetime of the process; Streamable HTTP multiplexes
/// many sessions through one handler instance and must resolve the id (from
/// the `Mcp-Session-Id` header, minting one on the first `initialize`)
/// before calling in.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, session_id: &SessionId, message: JsonRpcMessage) -> Option<JsonRpcMessage>;

    /// Called when a transport observes its peer going away (STDIO EOF, an
    /// HTTP SSE stream closing). A handler that keeps per-session state
    /// (the dispatcher's session table, observer/subscription registries,
    /// the roots cache, heartbeat detectors) overrides this to release it
    /// instead of waiting for the next `Weak` to fail to upgrade. The
    /// default is a no-op, which is correct for handlers with no
    /// per-session bookkeeping of their own.
    async fn on_disconnect(&self, _session_id: &SessionId) {}
}

#[cfg(feature = "stdio")]
pub use stdio::StdioTransport;

#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportConfig};
