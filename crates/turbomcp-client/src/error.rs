//! Client-side error alias (spec.md §7). Reuses `turbomcp-core`'s
//! `McpError` exactly as the server crate does, so a client embedded
//! alongside a server (e.g. a test harness driving both) shares one error
//! vocabulary.

pub use turbomcp_core::{McpError, McpResult};

pub type ClientError = McpError;
pub type ClientResult<T> = McpResult<T>;
