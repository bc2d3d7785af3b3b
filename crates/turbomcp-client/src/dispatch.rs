//! Answers requests the server initiates on this session: `sampling/
//! createMessage`, `elicitation/create`, `roots/list`, and `ping` (spec.md
//! §4.11, §4.12, §4.14, §4.17). Implements `turbomcp_transport::MessageHandler`
//! exactly as `turbomcp-server::Dispatcher` does on the other side of the
//! wire, so the same STDIO/HTTP transport code drives both.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use turbomcp_core::session::SessionId;
use turbomcp_core::McpError;
use turbomcp_protocol::cursor::VersionedCursor;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{CreateMessageRequest, ElicitRequest, ListRootsRequest, ListRootsResult, PingResult};
use turbomcp_transport::MessageHandler;

use crate::client::Client;
use crate::error::ClientResult;

const ROOTS_PAGE_SIZE: usize = 50;

impl Client {
    async fn dispatch_request(&self, request: &JsonRpcRequest) -> ClientResult<Value> {
        match request.method.as_str() {
            methods::PING => to_value(PingResult),
            methods::SAMPLING_CREATE_MESSAGE => {
                let handler = self.sampling.lock().clone().ok_or_else(|| McpError::MethodNotFound(request.method.clone()))?;
                let req: CreateMessageRequest = parse(request)?;
                to_value(handler.create_message(req).await?)
            }
            methods::ELICITATION_CREATE => {
                let handler = self.elicitation.lock().clone().ok_or_else(|| McpError::MethodNotFound(request.method.clone()))?;
                let req: ElicitRequest = parse(request)?;
                to_value(handler.elicit(req).await?)
            }
            methods::ROOTS_LIST => {
                let req: ListRootsRequest = parse_or_default(request)?;
                to_value(self.list_roots_page(req.cursor.as_deref())?)
            }
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    fn list_roots_page(&self, cursor: Option<&str>) -> ClientResult<ListRootsResult> {
        let roots = self.snapshot_roots();
        let offset = match cursor {
            Some(c) => VersionedCursor::decode(c)?.offset,
            None => 0,
        };
        let page: Vec<_> = roots.iter().skip(offset).take(ROOTS_PAGE_SIZE).cloned().collect();
        let next_offset = offset + page.len();
        let next_cursor = if next_offset < roots.len() { Some(VersionedCursor::encode(0, next_offset)) } else { None };
        Ok(ListRootsResult { roots: page, next_cursor })
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            methods::INITIALIZED | methods::CANCELLED => {}
            other => tracing::debug!(method = %other, "unhandled server-initiated notification"),
        }
    }

    fn handle_response(&self, response: JsonRpcResponse) {
        if let Some(id) = response.id.as_request_id() {
            self.session.complete_outbound(id, response.payload);
        }
    }
}

fn to_value<T: serde::Serialize>(value: T) -> ClientResult<Value> {
    serde_json::to_value(value).map_err(|e| McpError::Internal(format!("result did not serialize: {e}")))
}

fn parse<T: DeserializeOwned>(request: &JsonRpcRequest) -> ClientResult<T> {
    let params = request.params.clone().ok_or_else(|| McpError::invalid_params("missing params"))?;
    serde_json::from_value(params).map_err(|e| McpError::invalid_params(format!("malformed params: {e}")))
}

fn parse_or_default<T: DeserializeOwned + Default>(request: &JsonRpcRequest) -> ClientResult<T> {
    match &request.params {
        Some(params) => serde_json::from_value(params.clone()).map_err(|e| McpError::invalid_params(format!("malformed params: {e}"))),
        None => Ok(T::default()),
    }
}

#[async_trait]
impl MessageHandler for Client {
    async fn handle(&self, _session_id: &SessionId, message: JsonRpcMessage) -> Option<JsonRpcMessage> {
        match message {
            JsonRpcMessage::Request(request) => {
                let id = request.id.clone();
                let result = self.dispatch_request(&request).await;
                let response = match result {
                    Ok(value) => JsonRpcResponse::success(value, id),
                    Err(err) => JsonRpcResponse::error(err.into(), id),
                };
                Some(JsonRpcMessage::Response(response))
            }
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(response) => {
                self.handle_response(response);
                None
            }
        }
    }
}
