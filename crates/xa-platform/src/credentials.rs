//! Platform Credential Store
//!
//! Admin credentials for MongoDB and Keycloak live in a Kubernetes secret in
//! the system namespace. The secret holds a Python-style dict under a single
//! key, so single quotes are swapped for double quotes before JSON parsing.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use serde::Deserialize;
use tracing::{info, warn};

use crate::shared::error::{PlatformError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MongoCredentials {
    pub admin_username: String,
    pub admin_password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeycloakCredentials {
    pub username: String,
    pub password: String,
}

/// Contents of the credential store. Sections for other components are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SystemCredentials {
    pub mongodb: Option<MongoCredentials>,
    pub keycloak: Option<KeycloakCredentials>,
}

/// Parse the raw secret value.
pub fn parse_credentials(raw: &[u8]) -> Result<SystemCredentials> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| PlatformError::configuration(format!("credential store is not UTF-8: {}", e)))?;
    Ok(serde_json::from_str(&text.replace('\'', "\""))?)
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn load(&self) -> Result<SystemCredentials>;
}

/// Reads the credential store secret through the Kubernetes API.
pub struct CredentialStore {
    api: Api<Secret>,
    secret_name: String,
    secret_key: String,
}

impl CredentialStore {
    pub fn new(client: kube::Client, namespace: &str, secret_name: &str, secret_key: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            secret_name: secret_name.to_string(),
            secret_key: secret_key.to_string(),
        }
    }
}

#[async_trait]
impl CredentialSource for CredentialStore {
    async fn load(&self) -> Result<SystemCredentials> {
        let secret = self.api.get(&self.secret_name).await?;
        let raw = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&self.secret_key))
            .ok_or_else(|| {
                warn!(secret = %self.secret_name, key = %self.secret_key, "Credential store key missing");
                PlatformError::configuration(format!(
                    "secret {} has no key {}",
                    self.secret_name, self.secret_key
                ))
            })?;

        let credentials = parse_credentials(&raw.0)?;
        info!(
            secret = %self.secret_name,
            mongodb = credentials.mongodb.is_some(),
            keycloak = credentials.keycloak.is_some(),
            "Loaded platform credentials"
        );
        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_style_dict() {
        let raw = b"{'mongodb': {'admin_username': 'admin', 'admin_password': 'pw', 'metrics_username': 'm'}, \
                    'keycloak': {'username': 'keycloak', 'password': 'kpw'}, 'grafana': {}}";
        let creds = parse_credentials(raw).unwrap();

        let mongo = creds.mongodb.unwrap();
        assert_eq!(mongo.admin_username, "admin");
        assert_eq!(mongo.admin_password, "pw");
        assert_eq!(creds.keycloak.unwrap().password, "kpw");
    }

    #[test]
    fn test_missing_sections_are_none() {
        let creds = parse_credentials(b"{}").unwrap();
        assert!(creds.mongodb.is_none());
        assert!(creds.keycloak.is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(matches!(parse_credentials(b"not a dict"), Err(PlatformError::Json(_))));
        assert!(parse_credentials(&[0xff, 0xfe]).is_err());
    }
}
