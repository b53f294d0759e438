//! Nucleus Client
//!
//! HTTP client for the platform front-end: caller identity, listing
//! endpoints proxied for enrichment, and the platform version.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::nucleus::version::PlatformVersion;
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::ForwardedCredentials;

/// Identity endpoint, relative to the nucleus base URI
pub const WHO_AM_I_PATH: &str = "/v4/auth/principal";
pub const VERSION_PATH: &str = "/version";

/// Caller identity as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerPrincipal {
    pub canonical_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Resolves who is calling from the forwarded credentials.
#[async_trait]
pub trait PrincipalOracle: Send + Sync {
    async fn whoami(&self, credentials: &ForwardedCredentials) -> Result<CallerPrincipal>;
}

/// Raw upstream listing reply. `body` is `Null` unless the status is 200.
#[derive(Debug, Clone)]
pub struct UpstreamListing {
    pub status: u16,
    pub body: Value,
}

impl UpstreamListing {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Upstream listing API proxied by the enrichment endpoints.
#[async_trait]
pub trait ListingUpstream: Send + Sync {
    async fn list(
        &self,
        path: &str,
        query: Option<&str>,
        credentials: &ForwardedCredentials,
    ) -> Result<UpstreamListing>;
}

#[derive(Debug, Deserialize)]
struct VersionReply {
    version: String,
}

pub struct NucleusClient {
    http: reqwest::Client,
    base_url: String,
}

impl NucleusClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str, query: Option<&str>) -> String {
        match query.filter(|q| !q.is_empty()) {
            Some(q) => format!("{}{}?{}", self.base_url, path, q),
            None => format!("{}{}", self.base_url, path),
        }
    }

    /// Fetch the platform release. Returns `Ok(None)` when the reply cannot be parsed.
    pub async fn platform_version(&self) -> Result<Option<PlatformVersion>> {
        let response = self.http.get(self.url(VERSION_PATH, None)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PlatformError::upstream(
                status.as_u16(),
                format!("{} - Error getting platform version", status.as_u16()),
            ));
        }

        let reply: VersionReply = response.json().await?;
        let parsed = PlatformVersion::parse(&reply.version);
        if parsed.is_none() {
            warn!(version = %reply.version, "Unrecognised platform version");
        }
        Ok(parsed)
    }
}

#[async_trait]
impl PrincipalOracle for NucleusClient {
    async fn whoami(&self, credentials: &ForwardedCredentials) -> Result<CallerPrincipal> {
        let request = credentials.apply(self.http.get(self.url(WHO_AM_I_PATH, None)));
        let response = request.send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(PlatformError::upstream(
                status.as_u16(),
                format!("{} - Error getting user status", status.as_u16()),
            ));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ListingUpstream for NucleusClient {
    async fn list(
        &self,
        path: &str,
        query: Option<&str>,
        credentials: &ForwardedCredentials,
    ) -> Result<UpstreamListing> {
        let url = self.url(path, query);
        debug!(%url, "Proxying upstream listing");

        let response = credentials.apply(self.http.get(&url)).send().await?;
        let status = response.status().as_u16();

        let body = if status == 200 {
            response.json().await?
        } else {
            warn!(%url, status, "Upstream listing returned non-success status");
            Value::Null
        };

        Ok(UpstreamListing { status, body })
    }
}
