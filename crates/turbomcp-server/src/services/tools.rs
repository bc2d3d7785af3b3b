//! Tools service: `tools/list`, `tools/call`, `tools/list_changed` (spec.md §4.6).

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
use turbomcp_core::session::Session;
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{CallToolRequest, CallToolResult, ListToolsResult, Tool};

use crate::context::RequestContext;
use crate::error::ServerResult;
use crate::handlers::ToolHandler;
use crate::normalize::ToolOutput;
use crate::pagination::{paginate, DEFAULT_PAGE_SIZE};
use crate::registry::ObserverRegistry;

/// Holds every registered tool and the runtime allow-list gating which of
/// them are currently callable (spec.md §4.6 "Allow-list & enabled
/// predicates").
pub struct ToolRegistry {
    handlers: Mutex<Vec<Arc<dyn ToolHandler>>>,
    allow_list: Mutex<Option<HashSet<String>>>,
    /// Whether tools can be registered/unregistered after startup. Only
    /// then does a registry mutation broadcast `tools/list_changed`
    /// (spec.md §4.6 "List-change emission").
    dynamic: bool,
    observers: Arc<ObserverRegistry>,
}

impl ToolRegistry {
    pub fn new(dynamic: bool, observers: Arc<ObserverRegistry>) -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            allow_list: Mutex::new(None),
            dynamic,
            observers,
        }
    }

    /// Register a tool at startup (no broadcast regardless of `dynamic`,
    /// since no session has had a chance to observe an earlier list yet).
    pub fn register(&self, handler: Arc<dyn ToolHandler>) {
        self.handlers.lock().push(handler);
    }

    /// Restrict the visible tool set to `names`, or lift the restriction
    /// with `None`. Disabled/denied tools stay registered, just hidden
    /// (spec.md §4.6).
    pub fn set_allow_list(&self, names: Option<HashSet<String>>) {
        *self.allow_list.lock() = names;
    }

    /// Register a tool after startup and, in dynamic mode, broadcast
    /// `tools/list_changed` to every observing session.
    pub async fn register_dynamic(&self, handler: Arc<dyn ToolHandler>, sink: &dyn TransportSink) {
        self.handlers.lock().push(handler);
        if self.dynamic {
            self.broadcast_list_changed(sink).await;
        }
    }

    pub async fn unregister_dynamic(&self, name: &str, sink: &dyn TransportSink) {
        self.handlers.lock().retain(|h| h.definition().name != name);
        if self.dynamic {
            self.broadcast_list_changed(sink).await;
        }
    }

    async fn broadcast_list_changed(&self, sink: &dyn TransportSink) {
        let notification = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::TOOLS_LIST_CHANGED, None));
        self.observers.broadcast(sink, notification).await;
    }

    fn visible(&self) -> Vec<Arc<dyn ToolHandler>> {
        let allow_list = self.allow_list.lock();
        self.handlers
            .lock()
            .iter()
            .filter(|h| h.enabled() && allow_list.as_ref().is_none_or(|allowed| allowed.contains(&h.definition().name)))
            .cloned()
            .collect()
    }

    fn resolve(&self, name: &str) -> ServerResult<Arc<dyn ToolHandler>> {
        self.visible()
            .into_iter()
            .find(|h| h.definition().name == name)
            .ok_or_else(|| McpError::invalid_params(format!("unknown or disabled tool: {name}")))
    }

    pub async fn list(&self, session: &Arc<Session>, cursor: Option<&str>) -> ServerResult<ListToolsResult> {
        self.observers.add(session);
        let definitions: Vec<Tool> = self.visible().iter().map(|h| h.definition()).collect();
        let page = paginate(&definitions, cursor, DEFAULT_PAGE_SIZE)?;
        Ok(ListToolsResult {
            tools: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// Validate `arguments` against the tool's input schema, invoke the
    /// handler, and normalize its return value (spec.md §4.6 steps 2-4).
    ///
    /// A handler-level error becomes an `isError=true` result, not a
    /// JSON-RPC error; only resolution/validation failures (unknown tool,
    /// schema violation) propagate as dispatch errors.
    pub async fn call(&self, request: CallToolRequest, ctx: RequestContext) -> ServerResult<CallToolResult> {
        let handler = self.resolve(&request.name)?;
        validate_against_schema(&handler.definition(), request.arguments.as_ref())?;

        match handler.call(request, ctx).await {
            Ok(output) => Ok(output.into_result()),
            Err(err) => Ok(ToolOutput::text(err.to_string()).into_result_with_error()),
        }
    }
}

impl ToolOutput {
    /// Same as `into_result` but forces `isError=true`, for the
    /// handler-failure path in [`ToolRegistry::call`].
    fn into_result_with_error(self) -> CallToolResult {
        let mut result = self.into_result();
        result.is_error = Some(true);
        result
    }
}

fn validate_against_schema(tool: &Tool, arguments: Option<&std::collections::HashMap<String, serde_json::Value>>) -> ServerResult<()> {
    let schema = serde_json::to_value(&tool.input_schema)
        .map_err(|e| McpError::Internal(format!("tool schema did not serialize: {e}")))?;

    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| McpError::Internal(format!("tool {} has an invalid input schema: {e}", tool.name)))?;

    let instance = match arguments {
        Some(args) => serde_json::to_value(args).unwrap_or(serde_json::Value::Null),
        None => serde_json::json!({}),
    };

    if !validator.is_valid(&instance) {
        return Err(McpError::invalid_params_for("arguments", format!("do not match {}'s input schema", tool.name)));
    }
    Ok(())
}
