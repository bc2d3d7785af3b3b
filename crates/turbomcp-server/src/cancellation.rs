//! `notifications/cancelled` (spec.md §4.18).
//!
//! The bookkeeping itself lives on `Session` (`begin_inbound`/`end_inbound`/
//! `cancel_inbound`); this module just builds and interprets the wire
//! notification. `initialize` must never be cancelled (spec.md §4.3), so
//! callers are expected to have excluded it before reaching here.

use std::sync::Arc;

use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, RequestId};
use turbomcp_core::session::Session;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::CancelledNotification;

/// Apply an incoming `notifications/cancelled` to this session's in-flight
/// request table. A cancellation for an unknown or already-finished request
/// is a tolerated no-op (spec.md §4.18 "Late cancellation").
pub fn apply_cancellation(session: &Arc<Session>, notification: CancelledNotification) {
    session.cancel_inbound(&notification.request_id);
}

/// Build the outbound notification this side sends when abandoning a
/// request it initiated (e.g. a sampling call whose caller gave up).
pub fn build_cancellation(request_id: RequestId, reason: Option<String>) -> JsonRpcMessage {
    let notification = CancelledNotification { request_id, reason };
    JsonRpcMessage::Notification(JsonRpcNotification::new(
        methods::CANCELLED,
        serde_json::to_value(notification).ok(),
    ))
}
