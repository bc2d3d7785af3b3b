//! Per-call context handed to every capability handler (spec.md §3 "Request
//! record").
//!
//! Bundles the pieces a handler needs that aren't part of its typed request:
//! which session it's running on (for server-initiated calls back to the
//! same peer), its cancellation scope, and its progress token if the caller
//! supplied one.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use turbomcp_core::session::{ProgressToken, Session};

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session: Arc<Session>,
    pub cancellation: CancellationToken,
    pub progress_token: Option<ProgressToken>,
}

impl RequestContext {
    pub fn new(session: Arc<Session>, cancellation: CancellationToken, progress_token: Option<ProgressToken>) -> Self {
        Self {
            session,
            cancellation,
            progress_token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
