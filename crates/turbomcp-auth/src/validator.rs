//! The pluggable token-validation seam (spec.md §4.19: "Validation is
//! delegated to an implementer-supplied provider returning `(subject,
//! scopes, claims)` or raising.").
//!
//! This crate deliberately does not ship a JWT/JWKS/OAuth2 implementation —
//! that is explicitly out of scope (spec.md §4 Non-goals). Anyone needing
//! JWKS-backed validation brings their own `TokenValidator` impl.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// What a successful validation yields: who the token is for and what it's
/// allowed to do.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub subject: String,
    pub scopes: HashSet<String>,
    pub claims: Value,
}

impl AuthContext {
    pub fn new(subject: impl Into<String>, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            subject: subject.into(),
            scopes: scopes.into_iter().map(Into::into).collect(),
            claims: Value::Null,
        }
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|s| self.scopes.contains(s))
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,
    #[error("Authorization header is not a Bearer token")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    Invalid(String),
    #[error("token lacks required scope(s): {0:?}")]
    InsufficientScope(Vec<String>),
}

/// Validates a bearer token and reports who it authenticates and what it's
/// scoped to. The core ships no implementation; callers supply one (an
/// in-memory API key map, a JWKS-backed JWT verifier, a call to an
/// introspection endpoint, whatever fits their authorization server).
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Result<AuthContext, AuthError>;
}

/// Extract the bearer token from an `Authorization` header value
/// (`"Bearer <token>"`). Shared by every transport's middleware so the
/// parsing rule is defined once.
pub fn extract_bearer_token(authorization_header: &str) -> Result<&str, AuthError> {
    let mut parts = authorization_header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}
