//! # turbomcp-protocol
//!
//! MCP 2025-06-18 message types: one module per capability (tools, resources,
//! prompts, completion, logging, sampling, elicitation, roots, ping), the
//! `initialize` handshake, capability negotiation structs, and the cursor
//! codec shared by every paginated list.
//!
//! Wire framing (the JSON-RPC envelope) and the scalar/content types these
//! messages are built from live in `turbomcp-core`; this crate re-exports the
//! ones callers need so `use turbomcp_protocol::types::*` is sufficient for
//! most handlers.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod cursor;
pub mod types;
pub mod version;

pub use cursor::{OffsetCursor, VersionedCursor};
pub use version::{methods, PROTOCOL_VERSION};

pub use turbomcp_core::{
    error, jsonrpc, session, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, McpError, McpResult, RequestId, SessionId,
};
