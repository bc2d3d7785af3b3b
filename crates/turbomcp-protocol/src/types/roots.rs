//! Client-advertised filesystem boundaries: `roots/list` (spec.md §4.14).
//!
//! Upstream MCP 2025-06-18 does not paginate `roots/list`; this framework's
//! roots cache is version-stamped (see `turbomcp_server::registry::roots`), so
//! `ListRootsRequest`/`ListRootsResult` carry a cursor here even though the
//! wire type in the published schema does not.

use serde::{Deserialize, Serialize};
use turbomcp_core::types::Cursor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Root {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListRootsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRootsResult {
    pub roots: Vec<Root>,
    #[serde(rename = "nextCursor", skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RootsListChangedNotification;
