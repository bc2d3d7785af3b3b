//! Result normalization (spec.md §4.15).
//!
//! Handlers are typed Rust, so there's no need to runtime-sniff "is this a
//! tuple or a mapping or bytes" the way a dynamically-typed host would; the
//! flexibility spec.md asks for becomes an enum applications can build from
//! whichever shape is most convenient, normalized once into the wire result.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;
use turbomcp_core::types::{BlobResourceContents, ContentBlock, ResourceContents, TextResourceContents};
use turbomcp_protocol::types::{CallToolResult, ReadResourceResult};

/// What a [`crate::handlers::ToolHandler`] may hand back instead of building
/// a [`CallToolResult`] itself (spec.md §4.15 "Tool result").
pub enum ToolOutput {
    /// Already a complete result; passed through unchanged.
    Result(CallToolResult),
    /// A single content block.
    Content(ContentBlock),
    /// Several outputs, flattened into one result's content list. The first
    /// member carrying `structuredContent` wins.
    Many(Vec<ToolOutput>),
    /// Raw bytes, rendered as a base64 text block.
    Bytes(Vec<u8>),
    /// Any JSON-serializable value. A mapping becomes both a text block
    /// (its JSON form) and `structuredContent` verbatim; anything else is
    /// wrapped as `structuredContent: {"result": value}`.
    Json(Value),
    /// Pairs a normalized payload with an explicit `structuredContent`,
    /// overriding whatever `payload` would have produced on its own.
    WithStructured(Box<ToolOutput>, Value),
    /// No content at all.
    Empty,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Content(ContentBlock::text(text))
    }

    pub fn json(value: impl Serialize) -> Self {
        Self::Json(serde_json::to_value(value).unwrap_or(Value::Null))
    }

    pub fn into_result(self) -> CallToolResult {
        match self {
            Self::Result(result) => result,
            Self::Content(block) => CallToolResult::success(vec![block]),
            Self::Many(items) => {
                let mut content = Vec::new();
                let mut structured = None;
                for item in items {
                    let mut result = item.into_result();
                    content.append(&mut result.content);
                    if structured.is_none() {
                        structured = result.structured_content;
                    }
                }
                CallToolResult {
                    content,
                    is_error: None,
                    structured_content: structured,
                }
            }
            Self::Bytes(bytes) => CallToolResult::success(vec![ContentBlock::text(STANDARD.encode(bytes))]),
            Self::Json(value) => {
                let text = serde_json::to_string(&value).unwrap_or_default();
                let structured = if value.is_object() {
                    value
                } else {
                    serde_json::json!({ "result": value })
                };
                CallToolResult {
                    content: vec![ContentBlock::text(text)],
                    is_error: None,
                    structured_content: Some(structured),
                }
            }
            Self::WithStructured(inner, structured) => {
                let mut result = inner.into_result();
                result.structured_content = Some(structured);
                result
            }
            Self::Empty => CallToolResult::success(vec![]),
        }
    }
}

impl From<String> for ToolOutput {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<&str> for ToolOutput {
    fn from(s: &str) -> Self {
        Self::text(s.to_string())
    }
}

impl From<Value> for ToolOutput {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<Vec<u8>> for ToolOutput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<CallToolResult> for ToolOutput {
    fn from(result: CallToolResult) -> Self {
        Self::Result(result)
    }
}

/// What a [`crate::handlers::ResourceHandler`]/`ResourceTemplateHandler` may
/// hand back instead of a [`ReadResourceResult`] (spec.md §4.15 "Resource
/// payload"). `mime_override` (if given) wins over the type's own default.
pub enum ResourcePayload {
    Result(ReadResourceResult),
    Contents(Vec<ResourceContents>),
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl ResourcePayload {
    pub fn into_result(self, uri: &str, mime_override: Option<&str>) -> ReadResourceResult {
        match self {
            Self::Result(result) => result,
            Self::Contents(contents) => ReadResourceResult { contents },
            Self::Text(text) => ReadResourceResult {
                contents: vec![ResourceContents::Text(TextResourceContents {
                    uri: uri.to_string(),
                    mime_type: Some(mime_override.unwrap_or("text/plain").to_string()),
                    text,
                    meta: None,
                })],
            },
            Self::Bytes(bytes) => ReadResourceResult {
                contents: vec![ResourceContents::Blob(BlobResourceContents {
                    uri: uri.to_string(),
                    mime_type: Some(mime_override.unwrap_or("application/octet-stream").to_string()),
                    blob: STANDARD.encode(bytes),
                    meta: None,
                })],
            },
            Self::Json(value) => {
                let text = serde_json::to_string(&value).unwrap_or_default();
                ReadResourceResult {
                    contents: vec![ResourceContents::Text(TextResourceContents {
                        uri: uri.to_string(),
                        mime_type: Some(mime_override.unwrap_or("application/json").to_string()),
                        text,
                        meta: None,
                    })],
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mapping_becomes_structured_content_verbatim() {
        let output = ToolOutput::json(serde_json::json!({ "count": 3 }));
        let result = output.into_result();
        assert_eq!(result.structured_content, Some(serde_json::json!({ "count": 3 })));
        assert_eq!(result.content.len(), 1);
    }

    #[test]
    fn json_scalar_gets_wrapped_under_result() {
        let output = ToolOutput::json(42);
        let result = output.into_result();
        assert_eq!(result.structured_content, Some(serde_json::json!({ "result": 42 })));
    }

    #[test]
    fn many_flattens_content_and_keeps_first_structured() {
        let output = ToolOutput::Many(vec![
            ToolOutput::text("a"),
            ToolOutput::json(serde_json::json!({ "b": 1 })),
        ]);
        let result = output.into_result();
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.structured_content, Some(serde_json::json!({ "b": 1 })));
    }

    #[test]
    fn bytes_resource_payload_defaults_octet_stream() {
        let payload = ResourcePayload::Bytes(vec![1, 2, 3]);
        let result = payload.into_result("file:///bin", None);
        match &result.contents[0] {
            ResourceContents::Blob(blob) => assert_eq!(blob.mime_type.as_deref(), Some("application/octet-stream")),
            _ => panic!("expected blob contents"),
        }
    }

    #[test]
    fn text_resource_payload_respects_mime_override() {
        let payload = ResourcePayload::Text("hello".to_string());
        let result = payload.into_result("file:///a.txt", Some("text/markdown"));
        match &result.contents[0] {
            ResourceContents::Text(text) => assert_eq!(text.mime_type.as_deref(), Some("text/markdown")),
            _ => panic!("expected text contents"),
        }
    }
}
