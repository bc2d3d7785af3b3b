//! S7 from spec.md §8: a `notifications/cancelled` arriving mid-call never
//! produces a second response for the same request id, and the handler
//! actually observes the cancellation rather than running to completion.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use turbomcp::prelude::*;

struct SlowTool;

#[async_trait]
impl ToolHandler for SlowTool {
    async fn call(&self, _request: CallToolRequest, ctx: RequestContext) -> ServerResult<ToolOutput> {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => Ok(ToolOutput::text("done")),
            _ = ctx.cancellation.cancelled() => Err(McpError::Internal("cancelled while running".to_string())),
        }
    }

    fn definition(&self) -> Tool {
        Tool::new("slow")
    }
}

#[derive(Default)]
struct NullSink;

#[async_trait]
impl TransportSink for NullSink {
    async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn s7_cancellation_race_yields_exactly_one_response() {
    let dispatcher = ServerBuilder::new("demo-server", "0.1.0").capabilities_with_tools().build();
    dispatcher.tools.register(Arc::new(SlowTool));
    dispatcher.set_sink(Arc::new(NullSink));

    let session_id = SessionId::generate();
    let params = serde_json::to_value(InitializeRequest {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation { name: "test-client".to_string(), title: None, version: "0.1.0".to_string() },
        meta: None,
    })
    .unwrap();
    dispatcher.handle(&session_id, JsonRpcMessage::Request(JsonRpcRequest::new(methods::INITIALIZE, Some(params), 1i64))).await;
    dispatcher
        .handle(&session_id, JsonRpcMessage::Notification(JsonRpcNotification::new(methods::INITIALIZED, None)))
        .await;

    let call = CallToolRequest { name: "slow".to_string(), arguments: None, meta: None };
    let request_id = RequestId::Number(2);
    let dispatcher_for_call = dispatcher.clone();
    let session_for_call = session_id.clone();
    let call_task = tokio::spawn(async move {
        let request = JsonRpcMessage::Request(JsonRpcRequest::new(methods::TOOLS_CALL, Some(serde_json::to_value(call).unwrap()), 2i64));
        dispatcher_for_call.handle(&session_for_call, request).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let cancel = JsonRpcMessage::Notification(JsonRpcNotification::new(
        methods::CANCELLED,
        Some(serde_json::to_value(CancelledNotification { request_id, reason: Some("user".to_string()) }).unwrap()),
    ));
    let started = tokio::time::Instant::now();
    dispatcher.handle(&session_id, cancel).await;

    let response = call_task.await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(450), "the handler should have been interrupted, not run to completion");

    match response {
        Some(JsonRpcMessage::Response(r)) => assert!(!r.is_success(), "an interrupted call surfaces as an error, not a silent success"),
        other => panic!("expected exactly one response, got {other:?}"),
    }
}
