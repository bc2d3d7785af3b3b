//! # turbomcp
//!
//! Facade crate: one `prelude` pulling together the wire types
//! (`turbomcp-core`, `turbomcp-protocol`), the server dispatcher
//! (`turbomcp-server`), the client session (`turbomcp-client`), the
//! transports (`turbomcp-transport`), and the bearer-token seam
//! (`turbomcp-auth`). Application code should need only `use
//! turbomcp::prelude::*;` plus whichever transport it runs.
//!
//! ```no_run
//! use std::sync::Arc;
//! use turbomcp::prelude::*;
//!
//! # async fn run() -> turbomcp_core::transport::TransportResult<()> {
//! let dispatcher = ServerBuilder::new("demo-server", "0.1.0")
//!     .capabilities_with_tools()
//!     .build();
//!
//! let transport = Arc::new(StdioTransport::new());
//! dispatcher.set_sink(transport.clone());
//! transport.run(dispatcher).await
//! # }
//! ```

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod prelude {
    pub use turbomcp_core::error::{McpError, McpResult};
    pub use turbomcp_core::jsonrpc::{
        JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
        JsonRpcResponsePayload, RequestId,
    };
    pub use turbomcp_core::session::{Session, SessionId};
    pub use turbomcp_core::transport::{TransportError, TransportResult, TransportSink};
    pub use turbomcp_core::types::*;

    pub use turbomcp_protocol::types::*;
    pub use turbomcp_protocol::{methods, PROTOCOL_VERSION};

    pub use turbomcp_server::{Dispatcher, RequestContext, ServerBuilder, ServerError, ServerResult};
    pub use turbomcp_server::handlers::{ResourceHandler, ResourceTemplateHandler, ToolHandler};
    pub use turbomcp_server::normalize::{ResourcePayload, ToolOutput};
    pub use turbomcp_server::services::roots::RootGuard;

    pub use turbomcp_client::{Client, ClientError, ClientResult, ElicitationHandler, SamplingHandler};

    pub use turbomcp_transport::{HttpTransport, HttpTransportConfig, MessageHandler, StdioTransport};

    pub use turbomcp_auth::{
        AuthContext, AuthError, BearerAuthConfig, ProtectedResourceMetadata,
        ProtectedResourceMetadataBuilder, TokenValidator,
    };
}
