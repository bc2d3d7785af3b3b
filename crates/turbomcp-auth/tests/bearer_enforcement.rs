use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use turbomcp_auth::{enforce, AuthContext, AuthError, BearerAuthConfig, ProtectedResourceMetadataBuilder, TokenValidator, WwwAuthenticateBuilder};

struct ScopedValidator;

#[async_trait]
impl TokenValidator for ScopedValidator {
    async fn validate(&self, token: &str) -> Result<AuthContext, AuthError> {
        match token {
            "reader-token" => Ok(AuthContext {
                subject: "reader".to_string(),
                scopes: HashSet::from(["resources:read".to_string()]),
                claims: serde_json::json!({"sub": "reader"}),
            }),
            "writer-token" => Ok(AuthContext {
                subject: "writer".to_string(),
                scopes: HashSet::from(["resources:read".to_string(), "tools:call".to_string()]),
                claims: serde_json::json!({"sub": "writer"}),
            }),
            _ => Err(AuthError::Invalid("unrecognized token".to_string())),
        }
    }
}

#[tokio::test]
async fn scope_subset_check_gates_tool_calls() {
    let config = BearerAuthConfig::new(Arc::new(ScopedValidator)).with_required_scopes(["tools:call"]);

    let denied = enforce(&config, Some("Bearer reader-token")).await;
    assert!(matches!(denied, Err(AuthError::InsufficientScope(_))));

    let allowed = enforce(&config, Some("Bearer writer-token")).await.unwrap();
    assert_eq!(allowed.subject, "writer");
}

#[tokio::test]
async fn invalid_token_rejected_regardless_of_scope_requirement() {
    let config = BearerAuthConfig::new(Arc::new(ScopedValidator));
    let result = enforce(&config, Some("Bearer garbage")).await;
    assert!(matches!(result, Err(AuthError::Invalid(_))));
}

#[test]
fn metadata_and_www_authenticate_round_trip_the_same_uri() {
    let metadata_uri = "https://mcp.example.com/.well-known/oauth-protected-resource";
    let metadata = ProtectedResourceMetadataBuilder::new("https://mcp.example.com/mcp", "https://auth.example.com")
        .with_scopes(["tools:call", "resources:read"])
        .build();
    assert_eq!(metadata.resource, "https://mcp.example.com/mcp");

    let header = WwwAuthenticateBuilder::new(metadata_uri).build();
    assert!(header.contains(metadata_uri));
}
