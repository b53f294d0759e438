//! User Management Entities

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::document::{get_path, id_string};

/// Platform user account (collection `users`), reduced to the fields used here.
#[derive(Debug, Clone, PartialEq)]
pub struct UserAccount {
    pub id: Bson,
    pub login_id: String,
    /// Identity-provider user id
    pub idp_id: Option<String>,
    pub system_roles: Vec<String>,
}

impl UserAccount {
    pub fn from_document(doc: &Document) -> Option<Self> {
        let id = doc.get("_id").cloned()?;
        let login_id = match get_path(doc, "loginId.id") {
            Some(Bson::String(login)) => login.clone(),
            _ => return None,
        };
        let idp_id = doc.get("idpId").and_then(id_string);
        let system_roles = match doc.get("_systemRoles") {
            Some(Bson::Array(roles)) => roles
                .iter()
                .filter_map(|r| r.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            id,
            login_id,
            idp_id,
            system_roles,
        })
    }

    /// Stable string key for `_id`, used to match run owners.
    pub fn id_key(&self) -> String {
        id_string(&self.id).unwrap_or_else(|| self.id.to_string())
    }
}

/// Role update payload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleUpdateRequest {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Role update result (success and failure share this shape)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoleUpdateResponse {
    pub user_name: String,
    pub current_roles: Vec<String>,
    pub message: String,
}

/// Rejection for roles outside the known set
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvalidRolesResponse {
    pub roles: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InactiveAccount {
    pub user_name: String,
    pub is_svc_account: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InactiveAccountsResponse {
    pub inactive_accounts: Vec<InactiveAccount>,
}

/// Activate / deactivate payload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ActivationRequest {
    /// Login ids
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivationResponse {
    /// Identity-provider usernames updated, in order
    pub updated_users: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
