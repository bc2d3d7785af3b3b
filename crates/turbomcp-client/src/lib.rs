//! # turbomcp-client
//!
//! The client half of one MCP session (spec.md §4.1, §4.11, §4.12, §4.14,
//! §4.17): the `initialize` handshake, request/response correlation for
//! client-initiated calls (`tools/call`, `resources/read`, ...), and
//! responders for the requests a server initiates on this session
//! (`sampling/createMessage`, `elicitation/create`, `roots/list`, `ping`).
//!
//! [`Client`] implements [`turbomcp_transport::MessageHandler`] the same
//! way `turbomcp-server::Dispatcher` does, so it can be driven by the same
//! STDIO/HTTP transport code from the other end of the wire.
//!
//! ```no_run
//! use std::sync::Arc;
//! use turbomcp_client::Client;
//! use turbomcp_protocol::types::{ClientCapabilities, Implementation};
//! use turbomcp_transport::StdioTransport;
//!
//! # async fn run() -> turbomcp_core::transport::TransportResult<()> {
//! let client = Client::new(
//!     Implementation { name: "demo-client".to_string(), title: None, version: "0.1.0".to_string() },
//!     ClientCapabilities::default(),
//! );
//! let transport = Arc::new(StdioTransport::new());
//! client.set_sink(transport.clone());
//!
//! let client_for_transport = client.clone();
//! tokio::spawn(async move { transport.run(client_for_transport).await });
//! client.initialize().await.map_err(|e| turbomcp_core::transport::TransportError::Io(e.to_string()))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod client;
pub mod dispatch;
pub mod error;
pub mod responders;

pub use client::Client;
pub use error::{ClientError, ClientResult};
pub use responders::{ElicitationHandler, SamplingHandler};
