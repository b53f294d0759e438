//! Keycloak Admin Client
//!
//! Minimal Keycloak admin REST client covering role-group membership and
//! user enable/disable. The admin token is obtained with a password grant
//! against the user realm and reused until shortly before it expires.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::shared::error::{PlatformError, Result};
use crate::user_management::roles::ROLES_GROUP;

/// Refresh the admin token this long before it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(10);

/// Keycloak group with nested sub-groups
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeycloakGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sub_groups: Vec<KeycloakGroup>,
}

/// Keycloak user representation. Unknown fields round-trip unchanged on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeycloakUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Identity-provider admin operations used by user management.
#[async_trait]
pub trait IdentityAdmin: Send + Sync {
    /// Sub-groups of the top-level `roles` group, name to id.
    async fn role_groups(&self) -> Result<HashMap<String, String>>;

    async fn user_id(&self, username: &str) -> Result<String>;

    /// Names of the groups the user belongs to.
    async fn user_groups(&self, user_id: &str) -> Result<Vec<String>>;

    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<()>;

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<()>;

    async fn get_user(&self, user_id: &str) -> Result<KeycloakUser>;

    async fn update_user(&self, user_id: &str, user: &KeycloakUser) -> Result<()>;
}

/// Connection settings for [`KeycloakAdminClient`]
#[derive(Debug, Clone)]
pub struct KeycloakAdminConfig {
    pub server_url: String,
    pub realm: String,
    pub user_realm: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct KeycloakAdminClient {
    http: reqwest::Client,
    config: KeycloakAdminConfig,
    token: Mutex<Option<CachedToken>>,
}

impl KeycloakAdminClient {
    pub fn new(config: KeycloakAdminConfig) -> Self {
        let mut config = config;
        config.server_url = config.server_url.trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            config,
            token: Mutex::new(None),
        }
    }

    fn admin_url(&self, path: &str) -> String {
        format!(
            "{}/admin/realms/{}{}",
            self.config.server_url,
            urlencoding::encode(&self.config.realm),
            path
        )
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(cached) = self.token.lock().as_ref() {
            if cached.expires_at > Instant::now() {
                return Ok(cached.value.clone());
            }
        }

        let url = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            self.config.server_url,
            urlencoding::encode(&self.config.user_realm)
        );
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self.http.post(&url).form(&params).send().await?;
        let response = check_status(response, "Keycloak token request").await?;
        let token: TokenResponse = response.json().await?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *self.token.lock() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        debug!(realm = %self.config.user_realm, "Obtained Keycloak admin token");

        Ok(token.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let token = self.access_token().await?;
        let response = self.http.get(self.admin_url(path)).bearer_auth(token).send().await?;
        Ok(check_status(response, what).await?.json().await?)
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<()> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response, what).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PlatformError::upstream(
        status.as_u16(),
        format!("{} failed: {} {}", what, status.as_u16(), body),
    ))
}

#[async_trait]
impl IdentityAdmin for KeycloakAdminClient {
    async fn role_groups(&self) -> Result<HashMap<String, String>> {
        let groups: Vec<KeycloakGroup> = self.get_json("/groups", "List groups").await?;
        let Some(roles) = groups.into_iter().find(|g| g.name == ROLES_GROUP) else {
            return Ok(HashMap::new());
        };

        // Newer Keycloak releases leave subGroups empty in listings
        let sub_groups = if roles.sub_groups.is_empty() {
            self.get_json(&format!("/groups/{}/children", roles.id), "List role groups")
                .await?
        } else {
            roles.sub_groups
        };

        Ok(sub_groups.into_iter().map(|g| (g.name, g.id)).collect())
    }

    async fn user_id(&self, username: &str) -> Result<String> {
        let path = format!("/users?username={}&exact=true", urlencoding::encode(username));
        let users: Vec<KeycloakUser> = self.get_json(&path, "Find user").await?;

        users
            .into_iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .map(|u| u.id)
            .ok_or_else(|| PlatformError::not_found("KeycloakUser", username))
    }

    async fn user_groups(&self, user_id: &str) -> Result<Vec<String>> {
        let groups: Vec<KeycloakGroup> = self
            .get_json(&format!("/users/{}/groups", user_id), "List user groups")
            .await?;
        Ok(groups.into_iter().map(|g| g.name).collect())
    }

    async fn add_user_to_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let url = self.admin_url(&format!("/users/{}/groups/{}", user_id, group_id));
        self.send(self.http.put(url), "Add group membership").await
    }

    async fn remove_user_from_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        let url = self.admin_url(&format!("/users/{}/groups/{}", user_id, group_id));
        self.send(self.http.delete(url), "Remove group membership").await
    }

    async fn get_user(&self, user_id: &str) -> Result<KeycloakUser> {
        self.get_json(&format!("/users/{}", user_id), "Get user").await
    }

    async fn update_user(&self, user_id: &str, user: &KeycloakUser) -> Result<()> {
        let url = self.admin_url(&format!("/users/{}", user_id));
        self.send(self.http.put(url).json(user), "Update user").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KeycloakAdminClient {
        KeycloakAdminClient::new(KeycloakAdminConfig {
            server_url: format!("{}/auth/", server.uri()),
            realm: "DominoRealm".to_string(),
            user_realm: "master".to_string(),
            client_id: "admin-cli".to_string(),
            username: "keycloak".to_string(),
            password: "pw".to_string(),
        })
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/realms/master/protocol/openid-connect/token"))
            .and(body_string_contains("grant_type=password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": 300
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_role_groups_and_token_reuse() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/groups"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "g0", "name": "other" },
                { "id": "g1", "name": "roles", "subGroups": [
                    { "id": "g2", "name": "SysAdmin" },
                    { "id": "g3", "name": "Librarian" }
                ]}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/users"))
            .and(query_param("username", "alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "u1", "username": "alice", "enabled": true }
            ])))
            .mount(&server)
            .await;

        let kc = client(&server);
        let groups = kc.role_groups().await.unwrap();
        assert_eq!(groups.get("SysAdmin").map(String::as_str), Some("g2"));
        assert_eq!(groups.len(), 2);

        assert_eq!(kc.user_id("alice").await.unwrap(), "u1");
    }

    #[tokio::test]
    async fn test_role_groups_falls_back_to_children() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "g1", "name": "roles", "subGroupCount": 1 }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/groups/g1/children"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "g9", "name": "Practitioner" }
            ])))
            .mount(&server)
            .await;

        let groups = client(&server).role_groups().await.unwrap();
        assert_eq!(groups.get("Practitioner").map(String::as_str), Some("g9"));
    }

    #[tokio::test]
    async fn test_update_user_preserves_unknown_fields() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/users/u1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u1", "username": "alice", "enabled": true, "email": "alice@example.com"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/admin/realms/DominoRealm/users/u1"))
            .and(body_string_contains("\"email\":\"alice@example.com\""))
            .and(body_string_contains("\"enabled\":false"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let kc = client(&server);
        let mut user = kc.get_user("u1").await.unwrap();
        user.enabled = false;
        kc.update_user("u1", &user).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_is_upstream_error() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/auth/admin/realms/DominoRealm/users/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("User not found"))
            .mount(&server)
            .await;

        let err = client(&server).get_user("missing").await.unwrap_err();
        assert!(matches!(err, PlatformError::Upstream { status: 404, .. }));
        assert!(err.to_string().contains("User not found"));
    }
}
