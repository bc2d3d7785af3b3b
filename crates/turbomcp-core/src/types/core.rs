//! Scalar types shared by every MCP message: URIs, MIME types, cursors, roles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A resource or root URI. Kept as a plain `String` — the wire format makes
/// no distinction between well-formed and malformed URIs; validation (e.g.
/// the `RootGuard` path checks) happens at the point of use.
pub type Uri = String;

/// A MIME type string, e.g. `"text/plain"`.
pub type MimeType = String;

/// An opaque, server-minted pagination continuation token. Clients MUST NOT
/// introspect the contents; see `turbomcp_server::pagination`.
pub type Cursor = String;

/// Base64-encoded binary payload (images, audio, binary resource blobs).
pub type Base64String = String;

/// A message role in a sampling/prompt conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Client-facing annotations describing how to prioritize/route a content block.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Annotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(rename = "lastModified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Free-form extension metadata carried by most MCP message types (`_meta`).
pub type Meta = HashMap<String, serde_json::Value>;
