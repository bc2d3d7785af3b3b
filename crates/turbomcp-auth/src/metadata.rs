//! Protected Resource Metadata (RFC 9728) for server-side discovery
//! (spec.md §4.19 "Authorization (optional)").
//!
//! A client that receives `401` from the main endpoint follows
//! `WWW-Authenticate: Bearer resource_metadata="<PRM-URL>"` to this document
//! to learn which authorization server issues tokens this resource accepts.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Bearer token delivery methods a resource server advertises (RFC 9728,
/// RFC 6750 §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BearerTokenMethod {
    /// `Authorization: Bearer <token>` header. The only method this crate's
    /// middleware accepts; the others are advertised for client compatibility
    /// but are not implemented here.
    #[default]
    Header,
    /// `access_token` query parameter — discouraged, logs leak tokens.
    Query,
    /// `access_token` form field on a POST body.
    Body,
}

/// RFC 9728 Protected Resource Metadata document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    /// Canonical URI identifying this resource server (REQUIRED).
    pub resource: String,
    /// Authorization server this resource trusts to issue tokens (REQUIRED).
    pub authorization_server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<BearerTokenMethod>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_documentation: Option<String>,
    #[serde(flatten)]
    pub additional_metadata: HashMap<String, serde_json::Value>,
}

/// Builds a [`ProtectedResourceMetadata`] document for the
/// `/.well-known/oauth-protected-resource` endpoint.
#[derive(Debug, Clone)]
pub struct ProtectedResourceMetadataBuilder {
    resource: String,
    authorization_server: String,
    scopes: Vec<String>,
    bearer_methods: Vec<BearerTokenMethod>,
    documentation_uri: Option<String>,
}

impl ProtectedResourceMetadataBuilder {
    pub fn new(resource: impl Into<String>, authorization_server: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            authorization_server: authorization_server.into(),
            scopes: Vec::new(),
            bearer_methods: vec![BearerTokenMethod::Header],
            documentation_uri: None,
        }
    }

    pub fn with_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_documentation(mut self, uri: impl Into<String>) -> Self {
        self.documentation_uri = Some(uri.into());
        self
    }

    pub fn build(self) -> ProtectedResourceMetadata {
        ProtectedResourceMetadata {
            resource: self.resource,
            authorization_server: self.authorization_server,
            scopes_supported: if self.scopes.is_empty() {
                None
            } else {
                Some(self.scopes)
            },
            bearer_methods_supported: Some(self.bearer_methods),
            resource_documentation: self.documentation_uri,
            additional_metadata: HashMap::new(),
        }
    }
}

/// Builds the `WWW-Authenticate` header value a `401` response carries
/// (spec.md §4.19, §6 "Streamable HTTP").
#[derive(Debug, Clone)]
pub struct WwwAuthenticateBuilder {
    metadata_uri: String,
    scope: Option<String>,
    error: Option<&'static str>,
    error_description: Option<String>,
}

impl WwwAuthenticateBuilder {
    pub fn new(metadata_uri: impl Into<String>) -> Self {
        Self {
            metadata_uri: metadata_uri.into(),
            scope: None,
            error: None,
            error_description: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_error(mut self, error: &'static str, description: Option<String>) -> Self {
        self.error = Some(error);
        self.error_description = description;
        self
    }

    pub fn build(self) -> String {
        let mut parts = vec![format!("Bearer resource_metadata=\"{}\"", self.metadata_uri)];
        if let Some(scope) = self.scope {
            parts.push(format!("scope=\"{scope}\""));
        }
        if let Some(error) = self.error {
            parts.push(format!("error=\"{error}\""));
        }
        if let Some(description) = self.error_description {
            parts.push(format!("error_description=\"{description}\""));
        }
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_omits_empty_scopes() {
        let metadata =
            ProtectedResourceMetadataBuilder::new("https://mcp.example.com/mcp", "https://auth.example.com").build();
        assert!(metadata.scopes_supported.is_none());
        assert_eq!(
            metadata.bearer_methods_supported,
            Some(vec![BearerTokenMethod::Header])
        );
    }

    #[test]
    fn www_authenticate_header_shape() {
        let header = WwwAuthenticateBuilder::new("https://mcp.example.com/.well-known/oauth-protected-resource")
            .with_scope("tools:call")
            .with_error("invalid_token", Some("token expired".to_string()))
            .build();
        assert_eq!(
            header,
            "Bearer resource_metadata=\"https://mcp.example.com/.well-known/oauth-protected-resource\", scope=\"tools:call\", error=\"invalid_token\", error_description=\"token expired\""
        );
    }
}
