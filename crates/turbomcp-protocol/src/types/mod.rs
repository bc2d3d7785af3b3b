//! MCP method-specific message types, one module per capability.

pub mod capabilities;
pub mod completion;
pub mod elicitation;
pub mod initialization;
pub mod logging;
pub mod notifications;
pub mod ping;
pub mod prompts;
pub mod resources;
pub mod roots;
pub mod sampling;
pub mod tools;

pub use capabilities::{
    ClientCapabilities, CompletionCapability, ElicitationCapability, LoggingCapability,
    PromptsCapability, ResourcesCapability, RootsCapability, SamplingCapability,
    ServerCapabilities, ToolsCapability,
};
pub use completion::{
    ArgumentInfo, CompleteRequest, CompleteResult, CompletionContext, CompletionData,
    CompletionReference,
};
pub use elicitation::{
    ElicitRequest, ElicitResult, ElicitationAction, ElicitationSchema, PrimitiveSchema,
};
pub use initialization::{Implementation, InitializeRequest, InitializeResult, InitializedNotification};
pub use logging::{LoggingMessageNotification, SetLevelRequest, SetLevelResult};
pub use notifications::{CancelledNotification, ProgressNotification};
pub use ping::{PingRequest, PingResult};
pub use prompts::{GetPromptRequest, GetPromptResult, ListPromptsRequest, ListPromptsResult, Prompt, PromptArgument, PromptMessage};
pub use resources::{
    ListResourceTemplatesRequest, ListResourceTemplatesResult, ListResourcesRequest,
    ListResourcesResult, ReadResourceRequest, ReadResourceResult, Resource,
    ResourceTemplate, ResourceUpdatedNotification, SubscribeRequest, UnsubscribeRequest,
};
pub use roots::{ListRootsRequest, ListRootsResult, Root, RootsListChangedNotification};
pub use sampling::{
    CreateMessageRequest, CreateMessageResult, IncludeContext, ModelHint, ModelPreferences,
    SamplingMessage, StopReason,
};
pub use tools::{CallToolRequest, CallToolResult, ListToolsRequest, ListToolsResult, Tool, ToolAnnotations, ToolSchema};
