//! Traits application code implements to back a capability (spec.md §4.6-§4.9).
//!
//! Each registry in `services::*` stores `Arc<dyn ...Handler>` and never
//! downcasts; the dispatcher only ever calls through these trait objects.

use async_trait::async_trait;
use serde_json::Value;
use turbomcp_protocol::types::{
    CallToolRequest, GetPromptRequest, GetPromptResult, Prompt, ReadResourceRequest, Resource,
    ResourceTemplate, Tool,
};

use crate::context::RequestContext;
use crate::error::ServerResult;
use crate::normalize::{ResourcePayload, ToolOutput};

/// Backs one registered tool (spec.md §4.6 "Tools service").
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, request: CallToolRequest, ctx: RequestContext) -> ServerResult<ToolOutput>;

    fn definition(&self) -> Tool;

    /// Whether this tool is currently visible/callable given runtime state
    /// (spec.md §3 "Tool spec" `enabled` predicate). Defaults to always on.
    fn enabled(&self) -> bool {
        true
    }
}

/// Backs one registered static resource (spec.md §4.7 "Resources service").
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn read(&self, request: ReadResourceRequest, ctx: RequestContext) -> ServerResult<ResourcePayload>;

    fn definition(&self) -> Resource;
}

/// Backs one registered resource template: a URI pattern resolved at read
/// time rather than a fixed URI.
#[async_trait]
pub trait ResourceTemplateHandler: Send + Sync {
    /// Whether `uri` matches this template's pattern.
    fn matches(&self, uri: &str) -> bool;

    async fn read(&self, request: ReadResourceRequest, ctx: RequestContext) -> ServerResult<ResourcePayload>;

    fn definition(&self) -> ResourceTemplate;
}

/// Backs one registered prompt (spec.md §4.8 "Prompts service").
#[async_trait]
pub trait PromptHandler: Send + Sync {
    async fn get(&self, request: GetPromptRequest, ctx: RequestContext) -> ServerResult<GetPromptResult>;

    fn definition(&self) -> Prompt;
}

/// Supplies completion suggestions for one prompt argument or resource
/// template variable (spec.md §4.9 "Completion service").
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// `argument_value` is the partial value typed so far; `context`
    /// carries any already-resolved sibling arguments.
    async fn complete(&self, argument_name: &str, argument_value: &str, context: Option<&Value>) -> ServerResult<Vec<String>>;
}
