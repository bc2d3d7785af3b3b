//! Bearer-token enforcement (spec.md §4.19).
//!
//! `enforce` is the policy every transport's HTTP handler calls before
//! dispatching a request: missing/invalid tokens are rejected (or, with
//! `fail_open`, waved through) and insufficient scope is rejected
//! regardless of `fail_open` — that knob only covers provider outages, not
//! a token that was successfully checked and found wanting.

use std::sync::Arc;

use tracing::warn;

use crate::validator::{extract_bearer_token, AuthContext, AuthError, TokenValidator};

/// Authorization policy for one protected endpoint.
#[derive(Clone)]
pub struct BearerAuthConfig {
    pub validator: Arc<dyn TokenValidator>,
    pub required_scopes: Vec<String>,
    /// Admit the request when the validator itself errors (not when it
    /// cleanly rejects the token). Development-only; defaults off.
    pub fail_open: bool,
}

impl BearerAuthConfig {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self {
            validator,
            required_scopes: Vec::new(),
            fail_open: false,
        }
    }

    pub fn with_required_scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }
}

/// Check one request's `Authorization` header against `config`.
///
/// Returns the authenticated context on success. `fail_open` only rescues a
/// provider that raised (network error, JWKS fetch failure, etc); a token
/// the provider actively rejected, or one missing required scopes, is
/// always an error.
pub async fn enforce(
    config: &BearerAuthConfig,
    authorization_header: Option<&str>,
) -> Result<AuthContext, AuthError> {
    let header = authorization_header.ok_or(AuthError::MissingToken)?;
    let token = extract_bearer_token(header)?;

    let context = match config.validator.validate(token).await {
        Ok(context) => context,
        Err(AuthError::Invalid(reason)) if config.fail_open => {
            warn!(reason, "token validator errored, admitting request (fail_open)");
            return Ok(AuthContext::new("fail-open", Vec::<String>::new()));
        }
        Err(error) => return Err(error),
    };

    if !context.has_scopes(&config.required_scopes) {
        return Err(AuthError::InsufficientScope(config.required_scopes.clone()));
    }

    Ok(context)
}

#[cfg(feature = "middleware")]
pub use tower_layer::{BearerAuthLayer, BearerAuthService};

#[cfg(feature = "middleware")]
mod tower_layer {
    //! Generic `tower::Layer`/`Service` wrapper for anyone assembling their
    //! own `http`-crate-based router around a protected endpoint, mirroring
    //! the `Layer`/`Service` split the rest of this workspace uses for
    //! cross-cutting HTTP concerns.

    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use http::{Request, Response, StatusCode};
    use tower::{Layer, Service};

    use super::{enforce, BearerAuthConfig};
    use crate::metadata::WwwAuthenticateBuilder;

    #[derive(Clone)]
    pub struct BearerAuthLayer {
        config: BearerAuthConfig,
        metadata_uri: String,
    }

    impl BearerAuthLayer {
        pub fn new(config: BearerAuthConfig, metadata_uri: impl Into<String>) -> Self {
            Self {
                config,
                metadata_uri: metadata_uri.into(),
            }
        }
    }

    impl<S> Layer<S> for BearerAuthLayer {
        type Service = BearerAuthService<S>;

        fn layer(&self, inner: S) -> Self::Service {
            BearerAuthService {
                inner,
                config: self.config.clone(),
                metadata_uri: self.metadata_uri.clone(),
            }
        }
    }

    #[derive(Clone)]
    pub struct BearerAuthService<S> {
        inner: S,
        config: BearerAuthConfig,
        metadata_uri: String,
    }

    impl<S, ReqBody, RespBody> Service<Request<ReqBody>> for BearerAuthService<S>
    where
        S: Service<Request<ReqBody>, Response = Response<RespBody>> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Send + 'static,
        ReqBody: Send + 'static,
        RespBody: Default + Send + 'static,
    {
        type Response = S::Response;
        type Error = S::Error;
        type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

        fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            self.inner.poll_ready(cx)
        }

        fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
            let config = self.config.clone();
            let metadata_uri = self.metadata_uri.clone();
            let mut inner = self.inner.clone();

            Box::pin(async move {
                let header = req
                    .headers()
                    .get(http::header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok());

                match enforce(&config, header).await {
                    Ok(_context) => inner.call(req).await,
                    Err(error) => {
                        let www_authenticate = WwwAuthenticateBuilder::new(metadata_uri)
                            .with_error("invalid_token", Some(error.to_string()))
                            .build();
                        let response = Response::builder()
                            .status(StatusCode::UNAUTHORIZED)
                            .header(http::header::WWW_AUTHENTICATE, www_authenticate)
                            .body(RespBody::default())
                            .expect("static 401 response is well-formed");
                        Ok(response)
                    }
                }
            })
        }
    }
}
