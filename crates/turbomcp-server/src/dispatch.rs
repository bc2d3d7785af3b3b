//! The request router: implements `turbomcp_transport::MessageHandler` and
//! owns every capability registry (spec.md §4.4 "Dispatcher").

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use turbomcp_core::session::{ProgressToken, RequestRecord, Session, SessionId};
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{
    CallToolRequest, CancelledNotification, CompleteRequest, GetPromptRequest, Implementation,
    InitializeRequest, InitializeResult, ListPromptsRequest, ListResourceTemplatesRequest,
    ListResourcesRequest, ListRootsResult, ListToolsRequest, PingResult, ReadResourceRequest,
    ServerCapabilities, SetLevelRequest, SubscribeRequest, UnsubscribeRequest,
};
use turbomcp_transport::MessageHandler;

use crate::cancellation::apply_cancellation;
use crate::context::RequestContext;
use crate::error::ServerResult;
use crate::progress::ProgressTracker;
use crate::registry::{ObserverRegistry, SubscriptionRegistry};
use crate::services::ping::DEFAULT_HEARTBEAT_INTERVAL;
use crate::services::{
    CompletionRegistry, ElicitationService, LoggingRegistry, PingService, PromptRegistry,
    ResourceRegistry, RootsService, SamplingService, ToolRegistry,
};
use crate::session::SessionManager;

/// Everything a running server needs to answer any MCP request: the session
/// table, every capability registry, and server identity/capability
/// metadata sent back from `initialize`.
pub struct Dispatcher {
    sessions: SessionManager,
    sink: OnceLock<Arc<dyn TransportSink>>,
    server_info: Implementation,
    capabilities: ServerCapabilities,
    instructions: Option<String>,
    pub tools: Arc<ToolRegistry>,
    pub resources: Arc<ResourceRegistry>,
    pub prompts: Arc<PromptRegistry>,
    pub completion: Arc<CompletionRegistry>,
    pub logging: Arc<LoggingRegistry>,
    pub sampling: Arc<SamplingService>,
    pub elicitation: Arc<ElicitationService>,
    pub roots: Arc<RootsService>,
    pub ping: Arc<PingService>,
    pub progress: Arc<ProgressTracker>,
    tools_observers: Arc<ObserverRegistry>,
    resources_observers: Arc<ObserverRegistry>,
    prompts_observers: Arc<ObserverRegistry>,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl Dispatcher {
    pub fn new(server_info: Implementation, capabilities: ServerCapabilities, instructions: Option<String>) -> Self {
        let tools_observers = Arc::new(ObserverRegistry::new());
        let resources_observers = Arc::new(ObserverRegistry::new());
        let prompts_observers = Arc::new(ObserverRegistry::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new());

        let ping = Arc::new(PingService::default());
        ping.set_on_suspect(|session, phi| {
            tracing::warn!(session_id = %session.id, phi, "session suspect");
        });
        ping.set_on_down(|session| {
            tracing::error!(session_id = %session.id, "session down, dropping from heartbeat set");
        });

        Self {
            sessions: SessionManager::new(),
            sink: OnceLock::new(),
            server_info,
            capabilities,
            instructions,
            tools: Arc::new(ToolRegistry::new(true, Arc::clone(&tools_observers))),
            resources: Arc::new(ResourceRegistry::new(true, Arc::clone(&resources_observers), Arc::clone(&subscriptions))),
            prompts: Arc::new(PromptRegistry::new(true, Arc::clone(&prompts_observers))),
            completion: Arc::new(CompletionRegistry::new()),
            logging: Arc::new(LoggingRegistry::new()),
            sampling: Arc::new(SamplingService::default()),
            elicitation: Arc::new(ElicitationService::default()),
            roots: Arc::new(RootsService::default()),
            ping,
            progress: Arc::new(ProgressTracker::new()),
            tools_observers,
            resources_observers,
            prompts_observers,
            subscriptions,
        }
    }

    /// Bind the transport's write side. Must be called before `handle` is
    /// ever invoked (broadcasts and server-initiated requests need it);
    /// panics if called twice. Also starts the heartbeat loop (spec.md
    /// §4.17), since pinging a session needs the same sink.
    pub fn set_sink(&self, sink: Arc<dyn TransportSink>) {
        self.sink.set(Arc::clone(&sink)).map_err(|_| ()).expect("sink already set");
        tokio::spawn(Arc::clone(&self.ping).run_heartbeat_loop(sink, self.sessions.clone(), DEFAULT_HEARTBEAT_INTERVAL));
    }

    fn sink(&self) -> &dyn TransportSink {
        self.sink.get().expect("Dispatcher::set_sink was not called before serving requests").as_ref()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Application-facing accessor for a session's roots, fetching from the
    /// client on a cache miss. There is no inbound `roots/list` route in
    /// `dispatch_request`: the client never calls it on the server, the
    /// server calls it on the client, so this is the seam callers outside
    /// this crate (tool/resource handlers wanting to check a path against
    /// `RootGuard`, or an application enumerating roots directly) use
    /// instead of reaching into `RootsService` themselves.
    pub async fn list_roots(&self, session_id: &SessionId, cursor: Option<&str>) -> ServerResult<ListRootsResult> {
        let session = self.sessions.get_or_create(session_id);
        self.roots.list(self.sink(), &session, cursor).await
    }

    async fn dispatch_request(&self, session: &Arc<Session>, request: &JsonRpcRequest) -> ServerResult<Value> {
        if request.method != methods::INITIALIZE && !session.is_initialized() {
            return Err(McpError::NotInitialized);
        }

        match request.method.as_str() {
            methods::INITIALIZE => to_value(self.initialize(session, parse(request)?)),
            methods::PING => to_value(PingResult),
            methods::TOOLS_LIST => {
                let req: ListToolsRequest = parse_or_default(request)?;
                to_value(self.tools.list(session, req.cursor.as_deref()).await?)
            }
            methods::TOOLS_CALL => {
                let req: CallToolRequest = parse(request)?;
                let ctx = self.context_for(session, request);
                to_value(self.tools.call(req, ctx).await?)
            }
            methods::RESOURCES_LIST => {
                let req: ListResourcesRequest = parse_or_default(request)?;
                to_value(self.resources.list(session, req.cursor.as_deref()).await?)
            }
            methods::RESOURCES_TEMPLATES_LIST => {
                let req: ListResourceTemplatesRequest = parse_or_default(request)?;
                to_value(self.resources.list_templates(session, req.cursor.as_deref()).await?)
            }
            methods::RESOURCES_READ => {
                let req: ReadResourceRequest = parse(request)?;
                let ctx = self.context_for(session, request);
                to_value(self.resources.read(req, ctx).await?)
            }
            methods::RESOURCES_SUBSCRIBE => {
                let req: SubscribeRequest = parse(request)?;
                self.resources.subscribe(session, req.uri);
                to_value(serde_json::json!({}))
            }
            methods::RESOURCES_UNSUBSCRIBE => {
                let req: UnsubscribeRequest = parse(request)?;
                self.resources.unsubscribe(session, &req.uri);
                to_value(serde_json::json!({}))
            }
            methods::PROMPTS_LIST => {
                let req: ListPromptsRequest = parse_or_default(request)?;
                to_value(self.prompts.list(session, req.cursor.as_deref()).await?)
            }
            methods::PROMPTS_GET => {
                let req: GetPromptRequest = parse(request)?;
                let ctx = self.context_for(session, request);
                to_value(self.prompts.get(req, ctx).await?)
            }
            methods::COMPLETION_COMPLETE => {
                let req: CompleteRequest = parse(request)?;
                to_value(self.completion.complete(req).await?)
            }
            methods::LOGGING_SET_LEVEL => {
                let req: SetLevelRequest = parse(request)?;
                to_value(self.logging.set_level(session, req)?)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    async fn initialize(&self, session: &Arc<Session>, request: InitializeRequest) -> InitializeResult {
        session.set_client_capabilities(turbomcp_core::session::ClientCapabilitySnapshot {
            sampling: request.capabilities.sampling.is_some(),
            elicitation: request.capabilities.elicitation.is_some(),
            roots: request.capabilities.roots.is_some(),
            roots_list_changed: request.capabilities.roots.as_ref().and_then(|r| r.list_changed).unwrap_or(false),
        });

        InitializeResult {
            protocol_version: turbomcp_protocol::PROTOCOL_VERSION.to_string(),
            capabilities: self.capabilities.clone(),
            server_info: self.server_info.clone(),
            instructions: self.instructions.clone(),
            meta: None,
        }
    }

    async fn handle_notification(&self, session_id: &SessionId, notification: JsonRpcNotification) {
        let session = self.sessions.get_or_create(session_id);
        match notification.method.as_str() {
            methods::INITIALIZED => session.mark_initialized(turbomcp_protocol::PROTOCOL_VERSION),
            methods::CANCELLED => {
                if let Ok(parsed) = parse_notification::<CancelledNotification>(&notification) {
                    apply_cancellation(&session, parsed);
                }
            }
            methods::ROOTS_LIST_CHANGED => {
                let _ = self.roots.handle_list_changed(self.sink(), &session).await;
            }
            _ => tracing::debug!(method = %notification.method, "unhandled notification"),
        }
    }

    fn handle_response(&self, session_id: &SessionId, response: JsonRpcResponse) {
        let Some(id) = response.id.as_request_id() else {
            return;
        };
        if let Some(session) = self.sessions.get(session_id) {
            session.complete_outbound(id, response.payload);
        }
    }

    fn context_for(&self, session: &Arc<Session>, request: &JsonRpcRequest) -> RequestContext {
        let progress_token = request
            .params
            .as_ref()
            .and_then(|p| p.get("_meta"))
            .and_then(|m| m.get("progressToken"))
            .and_then(progress_token_from_value);
        let record = RequestRecord::new(request.id.clone(), request.method.clone(), progress_token.clone());
        let record = session.begin_inbound(record);
        RequestContext::new(Arc::clone(session), record.cancellation.clone(), progress_token)
    }
}

fn progress_token_from_value(value: &Value) -> Option<ProgressToken> {
    if let Some(s) = value.as_str() {
        Some(ProgressToken::String(s.to_string()))
    } else {
        value.as_i64().map(ProgressToken::Number)
    }
}

fn to_value<T: serde::Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::Internal(format!("result did not serialize: {e}")))
}

fn parse<T: DeserializeOwned>(request: &JsonRpcRequest) -> ServerResult<T> {
    let params = request.params.clone().ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(format!("malformed params: {e}")))
}

fn parse_or_default<T: DeserializeOwned + Default>(request: &JsonRpcRequest) -> ServerResult<T> {
    match &request.params {
        Some(params) => serde_json::from_value(params.clone()).map_err(|e| McpError::invalid_params(format!("malformed params: {e}"))),
        None => Ok(T::default()),
    }
}

fn parse_notification<T: DeserializeOwned>(notification: &JsonRpcNotification) -> ServerResult<T> {
    let params = notification.params.clone().ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(format!("malformed params: {e}")))
}

#[async_trait]
impl MessageHandler for Dispatcher {
    async fn handle(&self, session_id: &SessionId, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => {
                let session = self.sessions.get_or_create(session_id);
                let id = request.id.clone();
                let result = self.dispatch_request(&session, &request).await;
                session.end_inbound(&id);
                let response = match result {
                    Ok(value) => JsonRpcResponse::success(value, id),
                    Err(err) => JsonRpcResponse::error(err.into(), id),
                };
                Some(JsonRpcMessage::Response(response))
            }
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(session_id, notification).await;
                None
            }
            JsonRpcMessage::Response(response) => {
                self.handle_response(session_id, response);
                None
            }
        }
    }

    /// Release every piece of per-session state the dispatcher and its
    /// services hold, so a closed session stops costing anything beyond
    /// the cost of dropping its `Weak` upgrades (spec.md §4.3 "destroyed on
    /// transport close or fatal error", invariant #11).
    async fn on_disconnect(&self, session_id: &SessionId) {
        if let Some(session) = self.sessions.get(session_id) {
            session.mark_closed();
        }
        self.tools_observers.remove(session_id);
        self.resources_observers.remove(session_id);
        self.prompts_observers.remove(session_id);
        self.subscriptions.prune_session(session_id);
        self.roots.remove(session_id);
        self.ping.remove(session_id);
        self.sessions.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbomcp_core::transport::TransportResult;
    use turbomcp_protocol::types::ClientCapabilities;

    #[derive(Default)]
    struct NullSink;

    #[async_trait]
    impl TransportSink for NullSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher {
        let dispatcher = Dispatcher::new(
            Implementation { name: "test-server".to_string(), title: None, version: "0.1.0".to_string() },
            ServerCapabilities::empty().with_tools(true),
            None,
        );
        dispatcher.set_sink(Arc::new(NullSink));
        dispatcher
    }

    #[tokio::test]
    async fn rejects_requests_before_initialize() {
        let dispatcher = dispatcher();
        let session_id = SessionId::generate();
        let request = JsonRpcMessage::Request(JsonRpcRequest::new(methods::TOOLS_LIST, None, 1i64));
        let response = dispatcher.handle(&session_id, request).await.unwrap();
        match response {
            JsonRpcMessage::Response(r) => assert!(!r.is_success()),
            _ => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn initialize_then_tools_list_succeeds() {
        let dispatcher = dispatcher();
        let session_id = SessionId::generate();

        let init_params = serde_json::to_value(InitializeRequest {
            protocol_version: turbomcp_protocol::PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation { name: "test-client".to_string(), title: None, version: "0.1.0".to_string() },
            meta: None,
        })
        .unwrap();
        let init = JsonRpcMessage::Request(JsonRpcRequest::new(methods::INITIALIZE, Some(init_params), 1i64));
        let response = dispatcher.handle(&session_id, init).await.unwrap();
        assert!(matches!(response, JsonRpcMessage::Response(r) if r.is_success()));

        let initialized = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::INITIALIZED, None));
        assert!(dispatcher.handle(&session_id, initialized).await.is_none());

        let list = JsonRpcMessage::Request(JsonRpcRequest::new(methods::TOOLS_LIST, None, 2i64));
        let response = dispatcher.handle(&session_id, list).await.unwrap();
        assert!(matches!(response, JsonRpcMessage::Response(r) if r.is_success()));
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let dispatcher = dispatcher();
        let session_id = SessionId::generate();
        dispatcher.sessions.get_or_create(&session_id).mark_initialized(turbomcp_protocol::PROTOCOL_VERSION);

        let request = JsonRpcMessage::Request(JsonRpcRequest::new("nonexistent/method", None, 1i64));
        let response = dispatcher.handle(&session_id, request).await.unwrap();
        match response {
            JsonRpcMessage::Response(r) => assert!(!r.is_success()),
            _ => panic!("expected a response"),
        }
    }
}
