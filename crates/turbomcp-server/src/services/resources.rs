//! Resources service: static resources, templates, and subscriptions
//! (spec.md §4.7).

use std::sync::Arc;

use parking_lot::Mutex;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcNotification};
use turbomcp_core::session::Session;
use turbomcp_core::transport::TransportSink;
use turbomcp_core::types::Uri;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{
    ListResourceTemplatesResult, ListResourcesResult, ReadResourceRequest, ReadResourceResult,
    Resource, ResourceTemplate, ResourceUpdatedNotification,
};

use crate::context::RequestContext;
use crate::error::ServerResult;
use crate::handlers::{ResourceHandler, ResourceTemplateHandler};
use crate::pagination::{paginate, DEFAULT_PAGE_SIZE};
use crate::registry::{ObserverRegistry, SubscriptionRegistry};

pub struct ResourceRegistry {
    statics: Mutex<Vec<Arc<dyn ResourceHandler>>>,
    templates: Mutex<Vec<Arc<dyn ResourceTemplateHandler>>>,
    dynamic: bool,
    observers: Arc<ObserverRegistry>,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl ResourceRegistry {
    pub fn new(dynamic: bool, observers: Arc<ObserverRegistry>, subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            statics: Mutex::new(Vec::new()),
            templates: Mutex::new(Vec::new()),
            dynamic,
            observers,
            subscriptions,
        }
    }

    pub fn register(&self, handler: Arc<dyn ResourceHandler>) {
        self.statics.lock().push(handler);
    }

    pub fn register_template(&self, handler: Arc<dyn ResourceTemplateHandler>) {
        self.templates.lock().push(handler);
    }

    pub async fn register_dynamic(&self, handler: Arc<dyn ResourceHandler>, sink: &dyn TransportSink) {
        self.statics.lock().push(handler);
        if self.dynamic {
            self.broadcast_list_changed(sink).await;
        }
    }

    async fn broadcast_list_changed(&self, sink: &dyn TransportSink) {
        let notification = JsonRpcMessage::Notification(JsonRpcNotification::new(methods::RESOURCES_LIST_CHANGED, None));
        self.observers.broadcast(sink, notification).await;
    }

    pub async fn list(&self, session: &Arc<Session>, cursor: Option<&str>) -> ServerResult<ListResourcesResult> {
        self.observers.add(session);
        let definitions: Vec<Resource> = self.statics.lock().iter().map(|h| h.definition()).collect();
        let page = paginate(&definitions, cursor, DEFAULT_PAGE_SIZE)?;
        Ok(ListResourcesResult {
            resources: page.items,
            next_cursor: page.next_cursor,
        })
    }

    pub async fn list_templates(&self, session: &Arc<Session>, cursor: Option<&str>) -> ServerResult<ListResourceTemplatesResult> {
        self.observers.add(session);
        let definitions: Vec<ResourceTemplate> = self.templates.lock().iter().map(|h| h.definition()).collect();
        let page = paginate(&definitions, cursor, DEFAULT_PAGE_SIZE)?;
        Ok(ListResourceTemplatesResult {
            resource_templates: page.items,
            next_cursor: page.next_cursor,
        })
    }

    /// Resolve a static URI or matching template, invoke the handler, and
    /// normalize its payload (spec.md §4.7 "resources/read"). An unmatched
    /// URI is `-32002 RESOURCE_NOT_FOUND`.
    pub async fn read(&self, request: ReadResourceRequest, ctx: RequestContext) -> ServerResult<ReadResourceResult> {
        let uri = request.uri.clone();

        if let Some(handler) = self.statics.lock().iter().find(|h| h.definition().uri == uri).cloned() {
            let mime = handler.definition().mime_type;
            return handler
                .read(request, ctx)
                .await
                .map(|payload| payload.into_result(&uri, mime.as_deref()));
        }

        if let Some(template) = self.templates.lock().iter().find(|t| t.matches(&uri)).cloned() {
            let mime = template.definition().mime_type;
            return template
                .read(request, ctx)
                .await
                .map(|payload| payload.into_result(&uri, mime.as_deref()));
        }

        Err(McpError::ResourceNotFound(uri))
    }

    pub fn subscribe(&self, session: &Arc<Session>, uri: Uri) {
        self.subscriptions.subscribe(session, uri);
    }

    pub fn unsubscribe(&self, session: &Arc<Session>, uri: &Uri) {
        self.subscriptions.unsubscribe(&session.id, uri);
    }

    /// Called by application code when a resource's underlying data
    /// changes; broadcasts `resources/updated` to every subscribed session
    /// (spec.md §4.7 "notify_resource_updated").
    pub async fn notify_updated(&self, sink: &dyn TransportSink, uri: &Uri) {
        let notification = JsonRpcMessage::Notification(JsonRpcNotification::new(
            methods::RESOURCES_UPDATED,
            serde_json::to_value(ResourceUpdatedNotification { uri: uri.clone() }).ok(),
        ));
        self.subscriptions.notify_updated(sink, uri, notification).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;
    use turbomcp_core::session::SessionId;
    use turbomcp_protocol::types::Resource;

    use crate::normalize::ResourcePayload;

    struct StaticFile;

    #[async_trait]
    impl ResourceHandler for StaticFile {
        async fn read(&self, _request: ReadResourceRequest, _ctx: RequestContext) -> ServerResult<ResourcePayload> {
            Ok(ResourcePayload::Text("contents".to_string()))
        }

        fn definition(&self) -> Resource {
            Resource {
                name: "readme".to_string(),
                title: None,
                uri: "file:///readme.txt".to_string(),
                description: None,
                mime_type: None,
                annotations: None,
                size: None,
            }
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Arc::new(Session::new(SessionId::generate())), CancellationToken::new(), None)
    }

    #[tokio::test]
    async fn reads_a_registered_static_resource() {
        let registry = ResourceRegistry::new(false, Arc::new(ObserverRegistry::new()), Arc::new(SubscriptionRegistry::new()));
        registry.register(Arc::new(StaticFile));

        let request = ReadResourceRequest { uri: "file:///readme.txt".to_string() };
        let result = registry.read(request, ctx()).await.unwrap();
        assert_eq!(result.contents[0].uri(), "file:///readme.txt");
    }

    #[tokio::test]
    async fn unknown_uri_is_resource_not_found() {
        let registry = ResourceRegistry::new(false, Arc::new(ObserverRegistry::new()), Arc::new(SubscriptionRegistry::new()));
        let request = ReadResourceRequest { uri: "file:///missing.txt".to_string() };
        let err = registry.read(request, ctx()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_RESOURCE_NOT_FOUND);
    }
}
