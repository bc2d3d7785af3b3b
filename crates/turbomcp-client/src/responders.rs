//! Traits application code implements to answer server-initiated requests
//! (spec.md §4.12 "Sampling", §4.14 "Elicitation").
//!
//! Mirrors `turbomcp-server::handlers`: the dispatcher only ever calls
//! through these trait objects, never downcasts.

use async_trait::async_trait;
use turbomcp_protocol::types::{CreateMessageRequest, CreateMessageResult, ElicitRequest, ElicitResult};

use crate::error::ClientResult;

/// Answers `sampling/createMessage`: the server is asking this client to run
/// an LLM completion on its behalf.
#[async_trait]
pub trait SamplingHandler: Send + Sync {
    async fn create_message(&self, request: CreateMessageRequest) -> ClientResult<CreateMessageResult>;
}

/// Answers `elicitation/create`: the server is asking the user (through
/// whatever UI this client has) to supply structured input.
#[async_trait]
pub trait ElicitationHandler: Send + Sync {
    async fn elicit(&self, request: ElicitRequest) -> ClientResult<ElicitResult>;
}
