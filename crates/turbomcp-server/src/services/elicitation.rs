//! Elicitation service: server-initiated `elicitation/create` (spec.md
//! §4.14).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use turbomcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponsePayload};
use turbomcp_core::session::Session;
use turbomcp_core::transport::TransportSink;
use turbomcp_core::McpError;
use turbomcp_protocol::methods;
use turbomcp_protocol::types::{ElicitRequest, ElicitResult, ElicitationAction, PrimitiveSchema};

use crate::error::ServerResult;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct ElicitationService {
    timeout: Duration,
}

impl Default for ElicitationService {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ElicitationService {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn create(
        &self,
        sink: &dyn TransportSink,
        session: &Arc<Session>,
        request: ElicitRequest,
    ) -> ServerResult<ElicitResult> {
        if !session.client_capabilities().elicitation {
            return Err(McpError::MethodNotFound(methods::ELICITATION_CREATE.to_string()));
        }

        validate_schema(&request)?;

        let (id, receiver) = session.begin_outbound();
        let params = serde_json::to_value(&request).map_err(|e| McpError::Internal(format!("elicitation request did not serialize: {e}")))?;
        let wire = JsonRpcMessage::Request(JsonRpcRequest::new(methods::ELICITATION_CREATE, Some(params), id.clone()));

        if sink.send(&session.id, wire).await.is_err() {
            session.abandon_outbound(&id);
            return Err(McpError::ServiceUnavailable("failed to deliver elicitation request".to_string()));
        }

        let outcome = tokio::time::timeout(self.timeout, receiver).await;
        let result = match outcome {
            Ok(Ok(JsonRpcResponsePayload::Success { result })) => {
                serde_json::from_value::<ElicitResult>(result).map_err(|e| McpError::Internal(format!("malformed elicitation result: {e}")))?
            }
            Ok(Ok(JsonRpcResponsePayload::Error { error })) => {
                return Err(McpError::InvalidParamsWithData(error.message, serde_json::json!({"code": error.code})));
            }
            Ok(Err(_)) => return Err(McpError::Internal("elicitation response channel dropped".to_string())),
            Err(_) => {
                session.abandon_outbound(&id);
                return Err(McpError::ServiceUnavailable("elicitation request timed out".to_string()));
            }
        };

        if result.action == ElicitationAction::Accept {
            validate_accepted_content(&request, &result)?;
        }

        Ok(result)
    }
}

/// A flat elicitation schema is already enforced by the type system
/// (`PrimitiveSchema` has no nested object/array variant); this only checks
/// that every declared required key actually has a property entry.
fn validate_schema(request: &ElicitRequest) -> ServerResult<()> {
    let schema = &request.requested_schema;
    for name in schema.required.iter().flatten() {
        if !schema.properties.contains_key(name) {
            return Err(McpError::invalid_params_for(name, "required key has no matching property"));
        }
    }
    Ok(())
}

/// Validate an accepted response has every required key present and that
/// each present value's JSON type is compatible with its declared
/// primitive schema (spec.md §4.14 "Validation").
fn validate_accepted_content(request: &ElicitRequest, result: &ElicitResult) -> ServerResult<()> {
    let schema = &request.requested_schema;
    let content = result.content.as_ref().ok_or_else(|| McpError::invalid_params("accepted elicitation is missing content"))?;

    for name in schema.required.iter().flatten() {
        if !content.contains_key(name) {
            return Err(McpError::invalid_params_for(name, "required key missing from accepted content"));
        }
    }

    for (name, value) in content {
        let Some(declared) = schema.properties.get(name) else {
            return Err(McpError::invalid_params_for(name, "not declared in the requested schema"));
        };
        if !type_compatible(declared, value) {
            return Err(McpError::invalid_params_for(name, "does not match its declared type"));
        }
    }
    Ok(())
}

fn type_compatible(schema: &PrimitiveSchema, value: &Value) -> bool {
    match schema {
        PrimitiveSchema::String { .. } => value.is_string(),
        PrimitiveSchema::Number { .. } => value.is_number(),
        PrimitiveSchema::Integer { .. } => value.is_i64() || value.is_u64(),
        PrimitiveSchema::Boolean { .. } => value.is_boolean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use turbomcp_core::session::{ClientCapabilitySnapshot, SessionId};
    use turbomcp_core::transport::TransportResult;
    use turbomcp_protocol::types::ElicitationSchema;

    struct NullSink;

    #[async_trait]
    impl TransportSink for NullSink {
        async fn send(&self, _session_id: &SessionId, _message: JsonRpcMessage) -> TransportResult<()> {
            Ok(())
        }
    }

    fn request() -> ElicitRequest {
        ElicitRequest {
            message: "confirm?".to_string(),
            requested_schema: ElicitationSchema::new().add_property(
                "confirmed",
                PrimitiveSchema::Boolean { title: None, description: None, default: None },
                true,
            ),
        }
    }

    #[test]
    fn schema_with_orphaned_required_key_is_rejected() {
        let mut req = request();
        req.requested_schema.required = Some(vec!["missing".to_string()]);
        let err = validate_schema(&req).unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_INVALID_PARAMS);
    }

    #[test]
    fn accepted_content_must_satisfy_required_and_types() {
        let req = request();
        let missing = ElicitResult::accept(HashMap::new());
        assert!(validate_accepted_content(&req, &missing).is_err());

        let wrong_type = ElicitResult::accept(HashMap::from([("confirmed".to_string(), serde_json::json!("yes"))]));
        assert!(validate_accepted_content(&req, &wrong_type).is_err());

        let ok = ElicitResult::accept(HashMap::from([("confirmed".to_string(), serde_json::json!(true))]));
        assert!(validate_accepted_content(&req, &ok).is_ok());
    }

    #[tokio::test]
    async fn rejects_when_client_never_advertised_elicitation() {
        let service = ElicitationService::default();
        let session = Arc::new(Session::new(SessionId::generate()));
        let err = service.create(&NullSink, &session, request()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn times_out_when_no_response_arrives() {
        let service = ElicitationService::new(Duration::from_millis(20));
        let session = Arc::new(Session::new(SessionId::generate()));
        session.set_client_capabilities(ClientCapabilitySnapshot { elicitation: true, ..Default::default() });

        let err = service.create(&NullSink, &session, request()).await.unwrap_err();
        assert_eq!(err.code(), turbomcp_core::error::RPC_SERVICE_UNAVAILABLE);
    }
}
