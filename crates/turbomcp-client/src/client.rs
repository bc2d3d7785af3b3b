//! The client half of one MCP session: `initialize` handshake, outbound
//! request/response correlation for client-initiated calls, and storage for
//! whatever the server told us during capability negotiation.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponsePayload};
use turbomcp_core::session::{Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{
    CallToolRequest, CallToolResult, ClientCapabilities, CompleteRequest, CompleteResult,
    GetPromptRequest, GetPromptResult, Implementation, InitializeRequest, InitializeResult,
    ListPromptsRequest, ListPromptsResult, ListResourceTemplatesRequest, ListResourceTemplatesResult,
    ListResourcesRequest, ListResourcesResult, ListToolsRequest, ListToolsResult, ReadResourceRequest,
    ReadResourceResult, Root, ServerCapabilities, SetLevelRequest, SetLevelResult, SubscribeRequest,
    UnsubscribeRequest,
};

use crate::error::ClientResult;
use crate::responders::{ElicitationHandler, SamplingHandler};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Reconstruct an `McpError` from a wire error so callers can match on
/// `.code()` the same way they would against a local error. `-32002` is
/// shared by `ResourceNotFound` and `NotInitialized` in the wire taxonomy
/// (spec.md §7); a response carrying it is reported as `ResourceNotFound`
/// since a client that reaches this path already manages its own
/// initialization state.
fn error_from_wire(error: turbomcp_core::jsonrpc::JsonRpcError) -> McpError {
    use turbomcp_core::error::{
        RPC_INVALID_PARAMS, RPC_INVALID_REQUEST, RPC_METHOD_NOT_FOUND, RPC_PARSE_ERROR,
        RPC_RESOURCE_NOT_FOUND, RPC_SERVICE_UNAVAILABLE,
    };
    match error.code {
        RPC_PARSE_ERROR => McpError::Parse(error.message),
        RPC_INVALID_REQUEST => McpError::InvalidRequest(error.message),
        RPC_METHOD_NOT_FOUND => McpError::MethodNotFound(error.message),
        RPC_INVALID_PARAMS => McpError::InvalidParams(error.message),
        RPC_RESOURCE_NOT_FOUND => McpError::ResourceNotFound(error.message),
        RPC_SERVICE_UNAVAILABLE => McpError::ServiceUnavailable(error.message),
        _ => McpError::Internal(error.message),
    }
}

/// One client-side MCP session. Owns the correlation table (via
/// `turbomcp_core::Session`), the transport's write side, and whatever
/// server-initiated-request responders the application has registered.
pub struct Client {
    pub(crate) session: Arc<Session>,
    sink: OnceLock<Arc<dyn TransportSink>>,
    client_info: Implementation,
    capabilities: ClientCapabilities,
    server_info: Mutex<Option<Implementation>>,
    server_capabilities: Mutex<Option<ServerCapabilities>>,
    pub(crate) roots: Mutex<Vec<Root>>,
    pub(crate) sampling: Mutex<Option<Arc<dyn SamplingHandler>>>,
    pub(crate) elicitation: Mutex<Option<Arc<dyn ElicitationHandler>>>,
    timeout: Duration,
}

impl Client {
    pub fn new(client_info: Implementation, capabilities: ClientCapabilities) -> Arc<Self> {
        Self::with_timeout(client_info, capabilities, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(client_info: Implementation, capabilities: ClientCapabilities, timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            session: Arc::new(Session::new(SessionId::generate())),
            sink: OnceLock::new(),
            client_info,
            capabilities,
            server_info: Mutex::new(None),
            server_capabilities: Mutex::new(None),
            roots: Mutex::new(Vec::new()),
            sampling: Mutex::new(None),
            elicitation: Mutex::new(None),
            timeout,
        })
    }

    /// Bind the transport's write side. Must be called before `initialize`
    /// or any other request; panics if called twice.
    pub fn set_sink(&self, sink: Arc<dyn TransportSink>) {
        self.sink.set(sink).map_err(|_| ()).expect("sink already set");
    }

    fn sink(&self) -> &dyn TransportSink {
        self.sink.get().expect("Client::set_sink was not called").as_ref()
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session.id
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    pub fn server_info(&self) -> Option<Implementation> {
        self.server_info.lock().clone()
    }

    pub fn server_capabilities(&self) -> Option<ServerCapabilities> {
        self.server_capabilities.lock().clone()
    }

    pub fn set_sampling_handler(&self, handler: Arc<dyn SamplingHandler>) {
        *self.sampling.lock() = Some(handler);
    }

    pub fn set_elicitation_handler(&self, handler: Arc<dyn ElicitationHandler>) {
        *self.elicitation.lock() = Some(handler);
    }

    /// Replace the client's advertised filesystem roots and, if the
    /// handshake already completed, tell the server they changed (spec.md
    /// §4.11 "roots/list_changed").
    pub async fn set_roots(&self, roots: Vec<Root>) -> ClientResult<()> {
        *self.roots.lock() = roots;
        if self.is_initialized() {
            let notification = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::ROOTS_LIST_CHANGED, None));
            self.sink().send(&self.session.id, notification).await.map_err(|e| McpError::ServiceUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    pub(crate) fn snapshot_roots(&self) -> Vec<Root> {
        self.roots.lock().clone()
    }

    /// Perform the `initialize` handshake: send `InitializeRequest`, wait
    /// for the server's result, then send `notifications/initialized`
    /// (spec.md §4.1). The session is not marked `Initialized` until that
    /// final notification has gone out, matching the server side's gate.
    pub async fn initialize(&self) -> ClientResult<InitializeResult> {
        let request = InitializeRequest {
            protocol_version: turbomcp_protocol::PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            client_info: self.client_info.clone(),
            meta: None,
        };
        let result: InitializeResult = self.request(methods::INITIALIZE, &request).await?;

        *self.server_info.lock() = Some(result.server_info.clone());
        *self.server_capabilities.lock() = Some(result.capabilities.clone());

        let initialized = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::INITIALIZED, None));
        self.sink().send(&self.session.id, initialized).await.map_err(|e| McpError::ServiceUnavailable(e.to_string()))?;
        self.session.mark_initialized(result.protocol_version.clone());

        Ok(result)
    }

    pub async fn list_tools(&self, cursor: Option<String>) -> ClientResult<ListToolsResult> {
        self.request(methods::TOOLS_LIST, &ListToolsRequest { cursor }).await
    }

    pub async fn call_tool(&self, request: CallToolRequest) -> ClientResult<CallToolResult> {
        self.request(methods::TOOLS_CALL, &request).await
    }

    pub async fn list_resources(&self, cursor: Option<String>) -> ClientResult<ListResourcesResult> {
        self.request(methods::RESOURCES_LIST, &ListResourcesRequest { cursor }).await
    }

    pub async fn list_resource_templates(&self, cursor: Option<String>) -> ClientResult<ListResourceTemplatesResult> {
        self.request(methods::RESOURCES_TEMPLATES_LIST, &ListResourceTemplatesRequest { cursor }).await
    }

    pub async fn read_resource(&self, request: ReadResourceRequest) -> ClientResult<ReadResourceResult> {
        self.request(methods::RESOURCES_READ, &request).await
    }

    pub async fn subscribe_resource(&self, request: SubscribeRequest) -> ClientResult<()> {
        let _: Value = self.request(methods::RESOURCES_SUBSCRIBE, &request).await?;
        Ok(())
    }

    pub async fn unsubscribe_resource(&self, request: UnsubscribeRequest) -> ClientResult<()> {
        let _: Value = self.request(methods::RESOURCES_UNSUBSCRIBE, &request).await?;
        Ok(())
    }

    pub async fn list_prompts(&self, cursor: Option<String>) -> ClientResult<ListPromptsResult> {
        self.request(methods::PROMPTS_LIST, &ListPromptsRequest { cursor }).await
    }

    pub async fn get_prompt(&self, request: GetPromptRequest) -> ClientResult<GetPromptResult> {
        self.request(methods::PROMPTS_GET, &request).await
    }

    pub async fn complete(&self, request: CompleteRequest) -> ClientResult<CompleteResult> {
        self.request(methods::COMPLETION_COMPLETE, &request).await
    }

    pub async fn set_level(&self, request: SetLevelRequest) -> ClientResult<SetLevelResult> {
        self.request(methods::LOGGING_SET_LEVEL, &request).await
    }

    /// Send a request and wait for its matching response, under this
    /// client's configured timeout. Shared by every public client-initiated
    /// call above.
    async fn request<Req: Serialize, Res: DeserializeOwned>(&self, method: &str, params: &Req) -> ClientResult<Res> {
        let (id, receiver) = self.session.begin_outbound();
        let params = serde_json::to_value(params).map_err(|e| McpError::Internal(format!("params did not serialize: {e}")))?;
        let wire = JsonRpcMessage::Request(JsonRpcRequest::new(method, Some(params), id.clone()));

        if self.sink().send(&self.session.id, wire).await.is_err() {
            self.session.abandon_outbound(&id);
            return Err(McpError::ServiceUnavailable(format!("failed to deliver {method}")));
        }

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(JsonRpcResponsePayload::Success { result })) => {
                serde_json::from_value(result).map_err(|e| McpError::Internal(format!("malformed {method} result: {e}")))
            }
            Ok(Ok(JsonRpcResponsePayload::Error { error })) => Err(error_from_wire(error)),
            Ok(Err(_)) => Err(McpError::Internal(format!("{method} response channel dropped"))),
            Err(_) => {
                self.session.abandon_outbound(&id);
                Err(McpError::ServiceUnavailable(format!("{method} timed out")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use turbomcp_core::transport::TransportResult;

    #[derive(Default)]
    struct RecordingSink {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl TransportSink for RecordingSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn client() -> Arc<Client> {
        let client = Client::new(
            Implementation { name: "test-client".to_string(), title: None, version: "0.1.0".to_string() },
            ClientCapabilities::default(),
        );
        client.set_sink(Arc::new(RecordingSink::default()));
        client
    }

    #[tokio::test]
    async fn initialize_times_out_without_a_server_reply() {
        let client = Client::with_timeout(
            Implementation { name: "test-client".to_string(), title: None, version: "0.1.0".to_string() },
            ClientCapabilities::default(),
            Duration::from_millis(20),
        );
        client.set_sink(Arc::new(RecordingSink::default()));
        let err = client.initialize().await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_SERVICE_UNAVAILABLE);
        assert!(!client.is_initialized());
    }

    #[tokio::test]
    async fn set_roots_before_initialize_does_not_notify() {
        let client = client();
        client.set_roots(vec![Root { uri: "file:///tmp".to_string(), name: None }]).await.unwrap();
        assert_eq!(client.snapshot_roots().len(), 1);
    }
}
