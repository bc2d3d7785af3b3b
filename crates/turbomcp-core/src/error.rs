//! Error taxonomy (spec.md §7) mapped onto JSON-RPC 2.0 error codes.

use serde_json::Value;

/// Parse error: the frame was not valid JSON.
pub const RPC_PARSE_ERROR: i32 = -32700;
/// Invalid request: the frame was valid JSON but not a valid JSON-RPC envelope.
pub const RPC_INVALID_REQUEST: i32 = -32600;
/// Method not found, or the capability implied by the method was not advertised.
pub const RPC_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid params: missing/invalid arguments, malformed cursors, stale roots cursor.
pub const RPC_INVALID_PARAMS: i32 = -32602;
/// Internal error: handler crash or result-normalization failure.
pub const RPC_INTERNAL_ERROR: i32 = -32603;
/// MCP-specific: resource not found.
pub const RPC_RESOURCE_NOT_FOUND: i32 = -32002;
/// MCP-specific: a request arrived before the session finished initializing.
pub const RPC_NOT_INITIALIZED: i32 = -32002;
/// MCP-specific: a downstream service is temporarily unavailable (e.g. an open circuit breaker).
pub const RPC_SERVICE_UNAVAILABLE: i32 = -32000;

/// The single error type that crosses every core/protocol/server boundary.
///
/// Every variant knows its JSON-RPC error code so turning an `McpError` into
/// a wire [`crate::jsonrpc::JsonRpcError`] never requires guessing.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    InvalidParamsWithData(String, Value),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("session not initialized")]
    NotInitialized,

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl McpError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => RPC_PARSE_ERROR,
            Self::InvalidRequest(_) => RPC_INVALID_REQUEST,
            Self::MethodNotFound(_) => RPC_METHOD_NOT_FOUND,
            Self::InvalidParams(_) | Self::InvalidParamsWithData(..) => RPC_INVALID_PARAMS,
            Self::Internal(_) => RPC_INTERNAL_ERROR,
            Self::ResourceNotFound(_) => RPC_RESOURCE_NOT_FOUND,
            Self::NotInitialized => RPC_NOT_INITIALIZED,
            Self::ServiceUnavailable(_) => RPC_SERVICE_UNAVAILABLE,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Self::InvalidParamsWithData(_, data) => Some(data),
            _ => None,
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    pub fn invalid_params_for(property: &str, constraint: impl Into<String>) -> Self {
        Self::InvalidParamsWithData(
            format!("invalid params: {} ({})", property, constraint.into()),
            serde_json::json!({ "property": property }),
        )
    }
}

pub type McpResult<T> = Result<T, McpError>;
