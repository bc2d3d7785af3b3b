//! # turbomcp-server
//!
//! Server-side session state machine, request dispatcher, and the nine
//! capability services (tools, resources, prompts, completion, logging,
//! sampling, elicitation, roots, ping) that together implement the MCP
//! 2025-06-18 revision from the server's side of the wire.
//!
//! [`Dispatcher`] is the [`turbomcp_transport::MessageHandler`] every
//! transport drives; [`ServerBuilder`] wires one up with its identity and
//! capabilities and hands back something ready to register handlers on and
//! then serve.
//!
//! ```no_run
//! use std::sync::Arc;
//! use turbomcp_core::transport::TransportResult;
//! use turbomcp_server::ServerBuilder;
//! use turbomcp_transport::StdioTransport;
//!
//! # async fn run() -> TransportResult<()> {
//! let dispatcher = ServerBuilder::new("demo-server", "0.1.0")
//!     .capabilities_with_tools()
//!     .build();
//!
//! let transport = Arc::new(StdioTransport::new());
//! dispatcher.set_sink(transport.clone());
//! transport.run(dispatcher).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod cancellation;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod normalize;
pub mod pagination;
pub mod progress;
pub mod registry;
pub mod services;
pub mod session;

use std::sync::Arc;

use turbomcp_protocol::types::{Implementation, ServerCapabilities};

pub use context::RequestContext;
pub use dispatch::Dispatcher;
pub use error::{ServerError, ServerResult};
pub use session::SessionManager;

/// Builds a [`Dispatcher`] from a server's identity and advertised
/// capabilities (spec.md §4.1 "Capability negotiation").
#[derive(Debug, Clone)]
pub struct ServerBuilder {
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
}

impl ServerBuilder {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            server_info: Implementation { name: name.into(), title: None, version: version.into() },
            capabilities: ServerCapabilities::empty(),
            instructions: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.server_info.title = Some(title.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Replace the default (empty) capability set wholesale. Prefer the
    /// `capabilities_with_*` helpers for the common cases.
    pub fn capabilities(mut self, capabilities: ServerCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn capabilities_with_tools(mut self) -> Self {
        self.capabilities.tools = ServerCapabilities::empty().with_tools(true).tools;
        self
    }

    pub fn capabilities_with_resources(mut self) -> Self {
        self.capabilities.resources = ServerCapabilities::empty().with_resources(true, true).resources;
        self
    }

    pub fn capabilities_with_prompts(mut self) -> Self {
        self.capabilities.prompts = ServerCapabilities::empty().with_prompts(true).prompts;
        self
    }

    pub fn capabilities_with_logging(mut self) -> Self {
        self.capabilities.logging = ServerCapabilities::empty().with_logging().logging;
        self
    }

    pub fn capabilities_with_completions(mut self) -> Self {
        self.capabilities.completions = ServerCapabilities::empty().with_completions().completions;
        self
    }

    pub fn build(self) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::new(self.server_info, self.capabilities, self.instructions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_a_dispatcher() {
        let dispatcher = ServerBuilder::new("demo", "0.1.0")
            .title("Demo Server")
            .instructions("say hello")
            .capabilities_with_tools()
            .capabilities_with_resources()
            .build();
        assert_eq!(Arc::strong_count(&dispatcher), 1);
    }
}
