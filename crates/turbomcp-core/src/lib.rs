//! # turbomcp-core
//!
//! Foundation layer for the TurboMCP framework: the JSON-RPC 2.0 wire
//! envelope, the error taxonomy that maps onto JSON-RPC error codes, the
//! scalar/content types shared by every MCP message, and the per-session
//! state primitives (`Session`, `RequestRecord`, `ProgressToken`).
//!
//! Method-specific message types (tools, resources, prompts, ...) live one
//! layer up in `turbomcp-protocol`, which depends on this crate.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod error;
pub mod jsonrpc;
pub mod session;
pub mod transport;
pub mod types;

pub use error::{McpError, McpResult};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, RequestId, ResponseId, JSONRPC_VERSION,
};
pub use session::{LogLevel, ProgressToken, RequestRecord, Session, SessionId, SessionState};
pub use transport::{TransportError, TransportResult, TransportSink};
