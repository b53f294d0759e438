//! API Middleware
//!
//! Caller authorization for Axum. The service does not validate credentials
//! itself: the caller's API key or bearer token is forwarded to the platform
//! "who am I" endpoint and its verdict is trusted.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::nucleus::{CallerPrincipal, PrincipalOracle};
use crate::shared::error::{PlatformError, Result};

/// Platform API key header, preferred over `Authorization` when both are sent
pub const API_KEY_HEADER: &str = "X-Domino-Api-Key";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub oracle: Arc<dyn PrincipalOracle>,
}

impl AppState {
    pub fn new(oracle: Arc<dyn PrincipalOracle>) -> Self {
        Self { oracle }
    }
}

/// Credential header copied from the inbound request for upstream calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ForwardedCredentials {
    ApiKey(String),
    Authorization(String),
    #[default]
    Anonymous,
}

impl ForwardedCredentials {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };

        if let Some(key) = header(API_KEY_HEADER) {
            Self::ApiKey(key)
        } else if let Some(auth) = header(AUTHORIZATION.as_str()) {
            Self::Authorization(auth)
        } else {
            Self::Anonymous
        }
    }

    /// Attach the forwarded header to an outgoing request.
    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::ApiKey(key) => request.header(API_KEY_HEADER, key),
            Self::Authorization(value) => request.header(AUTHORIZATION.as_str(), value),
            Self::Anonymous => request,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ForwardedCredentials
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Request caller, resolved lazily against the identity oracle.
///
/// Handlers decide when to authorize so each endpoint can shape its own
/// rejection body.
pub struct Caller {
    pub credentials: ForwardedCredentials,
    oracle: Arc<dyn PrincipalOracle>,
}

impl Caller {
    pub fn new(credentials: ForwardedCredentials, oracle: Arc<dyn PrincipalOracle>) -> Self {
        Self { credentials, oracle }
    }

    /// Resolve the caller and require platform admin.
    pub async fn require_admin(&self) -> Result<CallerPrincipal> {
        let principal = self.oracle.whoami(&self.credentials).await?;
        warn!(user = %principal.canonical_name, "Extended API invoking user");

        if principal.is_admin {
            warn!(user = %principal.canonical_name, "User allowed because user is a platform admin");
            Ok(principal)
        } else {
            Err(PlatformError::forbidden(format!(
                "User {} is not a platform admin",
                principal.canonical_name
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = PlatformError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> std::result::Result<Self, Self::Rejection> {
        // Get AppState from extensions (set by middleware layer)
        let app_state = parts
            .extensions
            .get::<AppState>()
            .ok_or_else(|| PlatformError::configuration("Identity oracle not configured"))?;

        Ok(Caller::new(
            ForwardedCredentials::from_headers(&parts.headers),
            app_state.oracle.clone(),
        ))
    }
}

/// Middleware layer that injects AppState into request extensions
/// This enables the Caller extractor to work
use tower::Layer;
use tower::Service;
use std::task::{Context, Poll};
use std::future::Future;
use std::pin::Pin;

#[derive(Clone)]
pub struct AuthLayer {
    state: AppState,
}

impl AuthLayer {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    state: AppState,
}

impl<S, B> Service<axum::http::Request<B>> for AuthMiddleware<S>
where
    S: Service<axum::http::Request<B>, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        req.extensions_mut().insert(self.state.clone());
        Box::pin(self.inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_api_key_preferred_over_authorization() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("key-1"));

        assert_eq!(
            ForwardedCredentials::from_headers(&headers),
            ForwardedCredentials::ApiKey("key-1".to_string())
        );
    }

    #[test]
    fn test_authorization_forwarded_without_api_key() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));

        assert_eq!(
            ForwardedCredentials::from_headers(&headers),
            ForwardedCredentials::Authorization("Bearer abc".to_string())
        );
    }

    #[test]
    fn test_no_credentials() {
        assert_eq!(
            ForwardedCredentials::from_headers(&HeaderMap::new()),
            ForwardedCredentials::Anonymous
        );
    }

    #[test]
    fn test_apply_sets_single_header() {
        let client = reqwest::Client::new();
        let request = ForwardedCredentials::ApiKey("k".to_string())
            .apply(client.get("http://localhost/"))
            .build()
            .unwrap();

        assert_eq!(request.headers().get(API_KEY_HEADER).unwrap(), "k");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }
}
