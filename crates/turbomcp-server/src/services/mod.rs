//! One module per MCP capability (spec.md §4.6-§4.17).

pub mod completion;
pub mod elicitation;
pub mod logging;
pub mod ping;
pub mod prompts;
pub mod resources;
pub mod roots;
pub mod sampling;
pub mod tools;

pub use completion::CompletionRegistry;
pub use elicitation::ElicitationService;
pub use logging::LoggingRegistry;
pub use ping::PingService;
pub use prompts::PromptRegistry;
pub use resources::ResourceRegistry;
pub use roots::RootsService;
pub use sampling::SamplingService;
pub use tools::ToolRegistry;
