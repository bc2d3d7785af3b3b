//! Server-side error alias (spec.md §7).
//!
//! Every capability service returns `ServerResult<T>`; the dispatcher turns
//! the `Err` side into a JSON-RPC error object via `McpError`'s existing
//! `code()`/`data()`. No new error codes are introduced here.

pub use turbomcp_core::{McpError, McpResult};

pub type ServerError = McpError;
pub type ServerResult<T> = McpResult<T>;
