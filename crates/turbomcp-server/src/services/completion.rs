//! Completion service: `completion/complete` (spec.md §4.11).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use turbomcp_protocol::types::{CompleteRequest, CompleteResult, CompletionData, CompletionReference};

use crate::error::ServerResult;
use crate::handlers::CompletionProvider;

/// Completion providers bound either to a prompt name or a resource
/// template's URI template string (spec.md §4.11 "Binding"). A reference
/// with no bound provider yields an empty result rather than an error.
#[derive(Default)]
pub struct CompletionRegistry {
    prompts: Mutex<HashMap<String, Arc<dyn CompletionProvider>>>,
    resource_templates: Mutex<HashMap<String, Arc<dyn CompletionProvider>>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_prompt(&self, name: impl Into<String>, provider: Arc<dyn CompletionProvider>) {
        self.prompts.lock().insert(name.into(), provider);
    }

    pub fn bind_resource_template(&self, uri_template: impl Into<String>, provider: Arc<dyn CompletionProvider>) {
        self.resource_templates.lock().insert(uri_template.into(), provider);
    }

    pub async fn complete(&self, request: CompleteRequest) -> ServerResult<CompleteResult> {
        let provider = match &request.reference {
            CompletionReference::Prompt { name } => self.prompts.lock().get(name).cloned(),
            CompletionReference::ResourceTemplate { uri } => self.resource_templates.lock().get(uri).cloned(),
        };

        let Some(provider) = provider else {
            return Ok(CompleteResult { completion: CompletionData::new(Vec::new()) });
        };

        let context = request
            .context
            .as_ref()
            .and_then(|c| c.arguments.as_ref())
            .map(|args| serde_json::to_value(args).unwrap_or(serde_json::Value::Null));

        let values = provider
            .complete(&request.argument.name, &request.argument.value, context.as_ref())
            .await?;

        Ok(CompleteResult { completion: CompletionData::new(values) })
    }
}
