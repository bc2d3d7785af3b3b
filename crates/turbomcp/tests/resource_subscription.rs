//! S4 from spec.md §8: subscribe, receive one update per subscribe call,
//! then stop receiving updates after unsubscribe.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use turbomcp::prelude::*;

const URI: &str = "resource://demo/value";

struct DemoValue;

#[async_trait]
impl ResourceHandler for DemoValue {
    async fn read(&self, _request: ReadResourceRequest, _ctx: RequestContext) -> ServerResult<ResourcePayload> {
        Ok(ResourcePayload::Text("initial".to_string()))
    }

    fn definition(&self) -> Resource {
        Resource {
            name: "demo-value".to_string(),
            title: None,
            uri: URI.to_string(),
            description: None,
            mime_type: None,
            annotations: None,
            size: None,
        }
    }
}

#[derive(Default)]
struct CountingSink {
    updates: AtomicUsize,
}

#[async_trait]
impl TransportSink for CountingSink {
    async fn send(&self, _session_id: &SessionId, message: JsonRpcMessage) -> TransportResult<()> {
        if let JsonRpcMessage::Notification(n) = &message {
            if n.method == methods::RESOURCES_UPDATED {
                self.updates.fetch_add(1, Ordering::SeqCst);
            }
        }
        Ok(())
    }
}

async fn initialize(dispatcher: &Dispatcher, session_id: &SessionId) {
    let params = serde_json::to_value(InitializeRequest {
        protocol_version: PROTOCOL_VERSION.to_string(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation { name: "test-client".to_string(), title: None, version: "0.1.0".to_string() },
        meta: None,
    })
    .unwrap();
    let init = JsonRpcMessage::Request(JsonRpcRequest::new(methods::INITIALIZE, Some(params), 1i64));
    dispatcher.handle(session_id, init).await;
    let initialized = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::INITIALIZED, None));
    dispatcher.handle(session_id, initialized).await;
}

#[tokio::test]
async fn s4_subscribe_receive_update_then_unsubscribe_stops_delivery() {
    let dispatcher = ServerBuilder::new("demo-server", "0.1.0").capabilities_with_resources().build();
    dispatcher.resources.register(Arc::new(DemoValue));

    let sink = Arc::new(CountingSink::default());
    dispatcher.set_sink(sink.clone());

    let session_id = SessionId::generate();
    initialize(&dispatcher, &session_id).await;

    let subscribe = JsonRpcMessage::Request(JsonRpcRequest::new(
        methods::RESOURCES_SUBSCRIBE,
        Some(serde_json::to_value(SubscribeRequest { uri: URI.to_string() }).unwrap()),
        2i64,
    ));
    let response = dispatcher.handle(&session_id, subscribe).await.unwrap();
    assert!(matches!(response, JsonRpcMessage::Response(r) if r.is_success()));

    dispatcher.resources.notify_updated(sink.as_ref(), &URI.to_string()).await;
    assert_eq!(sink.updates.load(Ordering::SeqCst), 1);

    let unsubscribe = JsonRpcMessage::Request(JsonRpcRequest::new(
        methods::RESOURCES_UNSUBSCRIBE,
        Some(serde_json::to_value(UnsubscribeRequest { uri: URI.to_string() }).unwrap()),
        3i64,
    ));
    dispatcher.handle(&session_id, unsubscribe).await;

    dispatcher.resources.notify_updated(sink.as_ref(), &URI.to_string()).await;
    assert_eq!(sink.updates.load(Ordering::SeqCst), 1, "no further updates should reach an unsubscribed session");
}
