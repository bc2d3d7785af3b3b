//! Log forwarding: `logging/setLevel` and `notifications/message` (spec.md §4.10).

use serde::{Deserialize, Serialize};
use turbomcp_core::LogLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetLevelRequest {
    pub level: LogLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SetLevelResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingMessageNotification {
    pub level: LogLevel,
    pub data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
}
