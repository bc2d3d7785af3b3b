//! S1, S2, S3 from spec.md §8: tool call happy path, unknown tool, and
//! pagination over a longer tool list.

mod support;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use turbomcp::prelude::*;

struct Add;

#[async_trait]
impl ToolHandler for Add {
    async fn call(&self, request: CallToolRequest, _ctx: RequestContext) -> ServerResult<ToolOutput> {
        let args = request.arguments.unwrap_or_default();
        let a = args.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
        let b = args.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(ToolOutput::json(a + b))
    }

    fn definition(&self) -> Tool {
        Tool::new("add").with_input_schema(ToolSchema::with_properties(
            HashMap::from([
                ("a".to_string(), serde_json::json!({"type": "integer"})),
                ("b".to_string(), serde_json::json!({"type": "integer"})),
            ]),
            vec!["a".to_string(), "b".to_string()],
        ))
    }
}

struct NumberedTool(usize);

#[async_trait]
impl ToolHandler for NumberedTool {
    async fn call(&self, _request: CallToolRequest, _ctx: RequestContext) -> ServerResult<ToolOutput> {
        Ok(ToolOutput::Empty)
    }

    fn definition(&self) -> Tool {
        Tool::new(format!("t{}", self.0))
    }
}

fn wired_pair() -> (Arc<Client>, Arc<Dispatcher>) {
    let dispatcher = ServerBuilder::new("demo-server", "0.1.0").capabilities_with_tools().build();
    let client = Client::new(
        Implementation { name: "demo-client".to_string(), title: None, version: "0.1.0".to_string() },
        ClientCapabilities::default(),
    );
    support::wire(client.clone(), dispatcher.clone());
    (client, dispatcher)
}

#[tokio::test]
async fn s1_tool_call_happy_path() {
    let (client, dispatcher) = wired_pair();
    dispatcher.tools.register(Arc::new(Add));

    let result = client.initialize().await.unwrap();
    assert_eq!(result.protocol_version, PROTOCOL_VERSION);

    let call = CallToolRequest {
        name: "add".to_string(),
        arguments: Some(HashMap::from([
            ("a".to_string(), serde_json::json!(2)),
            ("b".to_string(), serde_json::json!(3)),
        ])),
        meta: None,
    };
    let result = client.call_tool(call).await.unwrap();
    assert_eq!(result.is_error, None);
    assert_eq!(result.content[0].as_text(), Some("5"));
    assert_eq!(result.structured_content, Some(serde_json::json!({"result": 5})));
}

#[tokio::test]
async fn s2_unknown_tool_is_invalid_params() {
    let (client, dispatcher) = wired_pair();
    dispatcher.tools.register(Arc::new(Add));
    client.initialize().await.unwrap();

    let call = CallToolRequest { name: "missing".to_string(), arguments: None, meta: None };
    let err = client.call_tool(call).await.unwrap_err();
    assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
}

#[tokio::test]
async fn s3_pagination_of_25_tools_with_default_page_size() {
    let (client, dispatcher) = wired_pair();
    for i in 0..25 {
        dispatcher.tools.register(Arc::new(NumberedTool(i)));
    }
    client.initialize().await.unwrap();

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = client.list_tools(cursor).await.unwrap();
        seen.extend(page.tools.into_iter().map(|t| t.name));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(seen.len(), 25);

    let err = client.list_tools(Some("not-a-cursor".to_string())).await.unwrap_err();
    assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
}
