//! Connection liveness check: `ping` (spec.md §4.17).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PingRequest;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PingResult;
