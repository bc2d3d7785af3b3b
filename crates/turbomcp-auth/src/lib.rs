//! # turbomcp-auth
//!
//! RFC 9728 Protected Resource Metadata and bearer-token enforcement for
//! the optional authorization layer a Streamable HTTP transport may enable
//! (spec.md §4.19). This crate validates nothing on its own: it defines the
//! [`TokenValidator`] seam and the scope/fail-open policy around it, and
//! leaves token verification (JWT/JWKS, introspection, API keys, whatever
//! fits) to the implementer. No authorization server, JWKS client, or DPoP
//! support lives here by design.

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod metadata;
pub mod middleware;
pub mod validator;

pub use metadata::{BearerTokenMethod, ProtectedResourceMetadata, ProtectedResourceMetadataBuilder, WwwAuthenticateBuilder};
pub use middleware::{enforce, BearerAuthConfig};
pub use validator::{extract_bearer_token, AuthContext, AuthError, TokenValidator};

#[cfg(feature = "middleware")]
pub use middleware::{BearerAuthLayer, BearerAuthService};
