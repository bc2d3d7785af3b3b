//! Cross-cutting notifications not owned by a single capability (spec.md §4.16, §4.18).

use serde::{Deserialize, Serialize};
use turbomcp_core::{ProgressToken, RequestId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressNotification {
    #[serde(rename = "progressToken")]
    pub progress_token: ProgressToken,
    /// Monotonically non-decreasing within one progress token (spec.md §4.16
    /// "Monotonicity"). A regression is dropped by the sender, not the wire type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelledNotification {
    #[serde(rename = "requestId")]
    pub request_id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
