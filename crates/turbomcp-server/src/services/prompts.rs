//! Prompts service: `prompts/list`, `prompts/get`, `prompts/list_changed`
//! (spec.md §4.8).

use std::sync::Arc;

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
use turbomcp_core::session::Session;
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{GetPromptRequest, GetPromptResult, ListPromptsResult, Prompt};

use crate::context::RequestContext;
use crate::error::ServerResult;
use crate::handlers::PromptHandler;
use crate::pagination::{paginate, DEFAULT_PAGE_SIZE};
use crate::registry::ObserverRegistry;

pub struct PromptRegistry {
    handlers: Mutex<Vec<Arc<dyn PromptHandler>>>,
    dynamic: bool,
    observers: Arc<ObserverRegistry>,
}

impl PromptRegistry {
    pub fn new(dynamic: bool, observers: Arc<ObserverRegistry>) -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            dynamic,
            observers,
        }
    }

    pub fn register(&self, handler: Arc<dyn PromptHandler>) {
        self.handlers.lock().push(handler);
    }

    pub async fn register_dynamic(&self, handler: Arc<dyn PromptHandler>, sink: &dyn TransportSink) {
        self.handlers.lock().push(handler);
        if self.dynamic {
            self.broadcast_list_changed(sink).await;
        }
    }

    async fn broadcast_list_changed(&self, sink: &dyn TransportSink) {
        let notification = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::PROMPTS_LIST_CHANGED, None));
        self.observers.broadcast(sink, notification).await;
    }

    fn resolve(&self, name: &str) -> ServerResult<Arc<dyn PromptHandler>> {
        self.handlers
            .lock()
            .iter()
            .find(|h| h.definition().name == name)
            .cloned()
            .ok_or_else(|| McpError::invalid_params(format!("unknown prompt: {name}")))
    }

    pub async fn list(&self, session: &Arc<Session>, cursor: Option<&str>) -> ServerResult<ListPromptsResult> {
        self.observers.add(session);
        let definitions: Vec<Prompt> = self.handlers.lock().iter().map(|h| h.definition()).collect();
        let page = paginate(&definitions, cursor, DEFAULT_PAGE_SIZE)?;
        Ok(ListPromptsResult {
            prompts: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// Resolve the named prompt, validate its required arguments are
    /// present, then invoke the handler (spec.md §4.8 "prompts/get").
    pub async fn get(&self, request: GetPromptRequest, ctx: RequestContext) -> ServerResult<GetPromptResult> {
        let handler = self.resolve(&request.name)?;
        validate_required_arguments(&handler.definition(), request.arguments.as_ref())?;
        handler.get(request, ctx).await
    }
}

fn validate_required_arguments(
    prompt: &Prompt,
    arguments: Option<&std::collections::HashMap<String, String>>,
) -> ServerResult<()> {
    let Some(declared) = &prompt.arguments else {
        return Ok(());
    };
    for argument in declared.iter().filter(|a| a.required.unwrap_or(false)) {
        let present = arguments.is_some_and(|args| args.contains_key(&argument.name));
        if !present {
            return Err(McpError::invalid_params_for(&argument.name, "required argument missing"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio_util::sync::CancellationToken;
    use turbomcp_core::session::SessionId;
    use turbomcp_core::types::{ContentBlock, Role};
    use turbomcp_protocol::types::{PromptArgument, PromptMessage};

    struct Greeting;

    #[async_trait]
    impl PromptHandler for Greeting {
        async fn get(&self, request: GetPromptRequest, _ctx: RequestContext) -> ServerResult<GetPromptResult> {
            let name = request.arguments.as_ref().and_then(|a| a.get("name")).cloned().unwrap_or_default();
            Ok(GetPromptResult {
                description: None,
                messages: vec![PromptMessage {
                    role: Role::User,
                    content: ContentBlock::text(format!("Hello, {name}!")),
                }],
            })
        }

        fn definition(&self) -> Prompt {
            Prompt {
                name: "greeting".to_string(),
                title: None,
                description: None,
                arguments: Some(vec![PromptArgument {
                    name: "name".to_string(),
                    title: None,
                    description: None,
                    required: Some(true),
                }]),
            }
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Arc::new(Session::new(SessionId::generate())), CancellationToken::new(), None)
    }

    #[tokio::test]
    async fn gets_a_registered_prompt() {
        let registry = PromptRegistry::new(false, Arc::new(ObserverRegistry::new()));
        registry.register(Arc::new(Greeting));

        let request = GetPromptRequest {
            name: "greeting".to_string(),
            arguments: Some(HashMap::from([("name".to_string(), "Ada".to_string())])),
        };
        let result = registry.get(request, ctx()).await.unwrap();
        match &result.messages[0].content {
            ContentBlock::Text(text) => assert_eq!(text.text, "Hello, Ada!"),
            _ => panic!("expected text content"),
        }
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid_params() {
        let registry = PromptRegistry::new(false, Arc::new(ObserverRegistry::new()));
        registry.register(Arc::new(Greeting));

        let request = GetPromptRequest { name: "greeting".to_string(), arguments: None };
        let err = registry.get(request, ctx()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
    }

    #[tokio::test]
    async fn unknown_prompt_is_invalid_params() {
        let registry = PromptRegistry::new(false, Arc::new(ObserverRegistry::new()));
        let request = GetPromptRequest { name: "missing".to_string(), arguments: None };
        let err = registry.get(request, ctx()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
    }
}
