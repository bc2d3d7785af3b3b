//! JSON-RPC 2.0 envelope types.
//!
//! The wire codec is transport-agnostic: it knows how to parse and render one
//! frame at a time and enforces the envelope rules in the JSON-RPC 2.0 spec
//! (exactly one of `method`/`result`/`error`, `id` present on requests and
//! responses, absent on notifications).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{McpError, RPC_INVALID_REQUEST, RPC_PARSE_ERROR};

/// JSON-RPC version string required on every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// Marker type that serializes as `"2.0"` and rejects anything else on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(serde::de::Error::custom(format!(
                "invalid jsonrpc version: expected \"2.0\", got \"{version}\""
            )))
        }
    }
}

/// A request identifier: either a string or an integer, unique per sender per session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<u64> for RequestId {
    fn from(n: u64) -> Self {
        Self::Number(n as i64)
    }
}

/// A JSON-RPC request (expects exactly one response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    pub id: RequestId,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Option<Value>, id: impl Into<RequestId>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
            id: id.into(),
        }
    }
}

/// A JSON-RPC notification (no `id`, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self { code, message: message.into(), data: Some(data) }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(err: McpError) -> Self {
        match err.data() {
            Some(data) => Self::with_data(err.code(), err.to_string(), data.clone()),
            None => Self::new(err.code(), err.to_string()),
        }
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// A response `id`: `None` only for frames that could not be correlated
/// (parse errors / malformed envelopes per the JSON-RPC spec).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseId(pub Option<RequestId>);

impl ResponseId {
    pub fn from_request(id: RequestId) -> Self {
        Self(Some(id))
    }

    pub fn null() -> Self {
        Self(None)
    }

    pub fn as_request_id(&self) -> Option<&RequestId> {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponsePayload {
    Success { result: Value },
    Error { error: JsonRpcError },
}

/// A JSON-RPC response, matching exactly one pending request by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: JsonRpcVersion,
    #[serde(flatten)]
    pub payload: JsonRpcResponsePayload,
    pub id: ResponseId,
}

impl JsonRpcResponse {
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Success { result },
            id: ResponseId::from_request(id),
        }
    }

    pub fn error(error: JsonRpcError, id: RequestId) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error { error },
            id: ResponseId::from_request(id),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            payload: JsonRpcResponsePayload::Error {
                error: JsonRpcError::new(RPC_PARSE_ERROR, message),
            },
            id: ResponseId::null(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.payload, JsonRpcResponsePayload::Success { .. })
    }
}

/// One frame received or about to be sent over a transport.
#[derive(Debug, Clone)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Parse a single raw JSON frame, applying the JSON-RPC 2.0 envelope rules.
    ///
    /// Distinguishing a request from a response from a notification requires
    /// looking at which of `method`/`result`/`error` keys are present since
    /// they're otherwise structurally identical once `id` is optional.
    pub fn parse(raw: &str) -> Result<Self, JsonRpcResponse> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| JsonRpcResponse::parse_error(format!("parse error: {e}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, JsonRpcResponse> {
        let obj = value
            .as_object()
            .ok_or_else(|| invalid_request("frame must be a JSON object"))?;

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(invalid_request("missing or invalid \"jsonrpc\" field"));
        }

        let has_method = obj.contains_key("method");
        let has_result_or_error = obj.contains_key("result") || obj.contains_key("error");
        let has_id = obj.contains_key("id");

        if has_method && has_id {
            serde_json::from_value::<JsonRpcRequest>(value)
                .map(JsonRpcMessage::Request)
                .map_err(|e| invalid_request(format!("malformed request: {e}")))
        } else if has_method {
            serde_json::from_value::<JsonRpcNotification>(value)
                .map(JsonRpcMessage::Notification)
                .map_err(|e| invalid_request(format!("malformed notification: {e}")))
        } else if has_result_or_error && has_id {
            serde_json::from_value::<JsonRpcResponse>(value)
                .map(JsonRpcMessage::Response)
                .map_err(|e| invalid_request(format!("malformed response: {e}")))
        } else {
            Err(invalid_request(
                "frame is neither a request, notification, nor response",
            ))
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Request(r) => serde_json::to_value(r),
            Self::Notification(n) => serde_json::to_value(n),
            Self::Response(r) => serde_json::to_value(r),
        }
        .expect("jsonrpc frame is always serializable")
    }
}

fn invalid_request(message: impl Into<String>) -> JsonRpcResponse {
    JsonRpcResponse::error(
        JsonRpcError::new(RPC_INVALID_REQUEST, message.into()),
        RequestId::Number(0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_request() {
        let req = JsonRpcRequest::new("tools/list", None, 1);
        let json = serde_json::to_string(&req).unwrap();
        let parsed = JsonRpcMessage::parse(&json).unwrap();
        assert!(matches!(parsed, JsonRpcMessage::Request(r) if r.method == "tools/list"));
    }

    #[test]
    fn notification_has_no_id() {
        let note = JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_value(&note).unwrap();
        assert!(!json.as_object().unwrap().contains_key("id"));
        let parsed = JsonRpcMessage::from_value(json).unwrap();
        assert!(matches!(parsed, JsonRpcMessage::Notification(_)));
    }

    #[test]
    fn rejects_wrong_jsonrpc_version() {
        let value = serde_json::json!({"jsonrpc": "1.0", "method": "ping", "id": 1});
        let err = JsonRpcMessage::from_value(value).unwrap_err();
        assert_eq!(err.id, ResponseId::null());
    }

    #[test]
    fn rejects_non_object_frame() {
        let err = JsonRpcMessage::parse("[1,2,3]").unwrap_err();
        if let JsonRpcResponsePayload::Error { error } = err.payload {
            assert_eq!(error.code, RPC_INVALID_REQUEST);
        } else {
            panic!("expected error payload");
        }
    }

    #[test]
    fn rejects_malformed_json() {
        let err = JsonRpcMessage::parse("{not json}").unwrap_err();
        if let JsonRpcResponsePayload::Error { error } = err.payload {
            assert_eq!(error.code, RPC_PARSE_ERROR);
        } else {
            panic!("expected error payload");
        }
    }
}
