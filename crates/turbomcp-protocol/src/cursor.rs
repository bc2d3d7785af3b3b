//! Opaque pagination cursors (spec.md §4.2 "Cursor").
//!
//! A cursor is base64-encoded JSON the server mints and the client must treat
//! as opaque. Plain lists encode an offset; the roots list additionally
//! embeds the cache version it was minted against, so a cursor issued before
//! a `roots/list_changed` refresh is detectably stale.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use turbomcp_core::McpError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OffsetCursor {
    pub offset: usize,
}

impl OffsetCursor {
    pub fn encode(offset: usize) -> String {
        let json = serde_json::to_vec(&OffsetCursor { offset }).expect("OffsetCursor always serializes");
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(cursor: &str) -> Result<Self, McpError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| McpError::invalid_params("malformed cursor"))?;
        serde_json::from_slice(&bytes).map_err(|_| McpError::invalid_params("malformed cursor"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VersionedCursor {
    #[serde(rename = "v")]
    pub version: u64,
    #[serde(rename = "o")]
    pub offset: usize,
}

impl VersionedCursor {
    pub fn encode(version: u64, offset: usize) -> String {
        let json =
            serde_json::to_vec(&VersionedCursor { version, offset }).expect("VersionedCursor always serializes");
        URL_SAFE_NO_PAD.encode(json)
    }

    pub fn decode(cursor: &str) -> Result<Self, McpError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| McpError::invalid_params("malformed cursor"))?;
        serde_json::from_slice(&bytes).map_err(|_| McpError::invalid_params("malformed cursor"))
    }

    /// Reject a cursor minted against a now-stale roots cache generation
    /// (spec.md §4.14 "stale version ⇒ INVALID_PARAMS").
    pub fn check_version(&self, current: u64) -> Result<(), McpError> {
        if self.version != current {
            Err(McpError::invalid_params("stale roots cursor"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_roundtrip() {
        let cursor = OffsetCursor::encode(50);
        let decoded = OffsetCursor::decode(&cursor).unwrap();
        assert_eq!(decoded.offset, 50);
    }

    #[test]
    fn versioned_roundtrip_and_staleness() {
        let cursor = VersionedCursor::encode(3, 50);
        let decoded = VersionedCursor::decode(&cursor).unwrap();
        assert_eq!(decoded.version, 3);
        assert_eq!(decoded.offset, 50);
        assert!(decoded.check_version(3).is_ok());
        assert!(decoded.check_version(4).is_err());
    }

    #[test]
    fn garbage_cursor_rejected() {
        assert!(OffsetCursor::decode("not-a-cursor!!!").is_err());
    }
}
