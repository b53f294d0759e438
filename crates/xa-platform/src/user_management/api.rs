//! User Management Admin API
//!
//! Role updates mirrored into identity-provider groups, inactive account
//! reporting, and bulk activate / deactivate.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::nucleus::PlatformVersion;
use crate::shared::api_common::{json_body, JsonBody, MessageResponse};
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::Caller;
use crate::user_management::accounts::find_inactive_accounts;
use crate::user_management::entity::{
    ActivationRequest, ActivationResponse, InactiveAccountsResponse, InvalidRolesResponse,
    RoleUpdateRequest, RoleUpdateResponse,
};
use crate::user_management::keycloak::IdentityAdmin;
use crate::user_management::repository::UserDirectory;
use crate::user_management::roles::{are_roles_valid, invalid_roles_message, RoleChanges};

const ROLES_FORBIDDEN: &str = "Unauthorized to list user roles because not an admin";
const ADMINS_ONLY: &str = "Only Admins are authorized to make this call";

#[derive(Clone)]
pub struct UserManagementState {
    /// `None` when the platform version could not be read at startup
    pub platform_version: Option<PlatformVersion>,
    pub identity: Arc<dyn IdentityAdmin>,
    pub users: Arc<dyn UserDirectory>,
}

/// Replace a user's system roles
///
/// On platform releases after 5.6 the user's membership in the identity
/// provider's role groups is reconciled as well.
#[utoipa::path(
    post,
    path = "/roles/{user}",
    tag = "user-management",
    params(("user" = String, Path, description = "Login id")),
    request_body = RoleUpdateRequest,
    responses(
        (status = 200, description = "Roles updated", body = RoleUpdateResponse),
        (status = 403, description = "Platform release too old, or caller is not an admin", body = MessageResponse),
        (status = 500, description = "Invalid roles or update failure", body = RoleUpdateResponse)
    )
)]
pub async fn update_roles(
    State(state): State<UserManagementState>,
    caller: Caller,
    Path(user): Path<String>,
    body: JsonBody<RoleUpdateRequest>,
) -> Response {
    let Some(version) = state.platform_version.filter(|v| v.supports_role_updates()) else {
        warn!(version = ?state.platform_version, "Role updates unavailable on this platform release");
        return (StatusCode::FORBIDDEN, Json(json!({}))).into_response();
    };

    let failure = |e: PlatformError, roles: Vec<String>| {
        error!(user = %user, error = %e, "Error updating roles for the user");
        let body = RoleUpdateResponse {
            user_name: user.clone(),
            current_roles: roles,
            message: format!("Error : {}", e),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    };

    let desired = match json_body(body) {
        Ok(request) => request.roles,
        Err(e) => {
            return match caller.require_admin().await {
                Err(denied) if denied.is_forbidden() => roles_forbidden(),
                Err(denied) => failure(denied, Vec::new()),
                Ok(_) => failure(e, Vec::new()),
            };
        }
    };

    if !are_roles_valid(&desired) {
        let body = InvalidRolesResponse {
            roles: desired,
            message: invalid_roles_message(),
        };
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    match caller.require_admin().await {
        Ok(_) => {}
        Err(e) if e.is_forbidden() => return roles_forbidden(),
        Err(e) => return failure(e, desired),
    }

    match apply_roles(&state, version, &user, &desired).await {
        Ok(()) => Json(RoleUpdateResponse {
            user_name: user.clone(),
            current_roles: desired,
            message: "Success : Roles updated ".to_string(),
        })
        .into_response(),
        Err(e) => failure(e, desired),
    }
}

fn roles_forbidden() -> Response {
    (StatusCode::FORBIDDEN, Json(MessageResponse::new(ROLES_FORBIDDEN))).into_response()
}

async fn apply_roles(
    state: &UserManagementState,
    version: PlatformVersion,
    user: &str,
    desired: &[String],
) -> Result<()> {
    let group_ids = state.identity.role_groups().await?;
    let idp_user_id = state.identity.user_id(user).await?;
    let member_of: HashSet<String> = state.identity.user_groups(&idp_user_id).await?.into_iter().collect();

    let account = state
        .users
        .find_by_login(user)
        .await?
        .ok_or_else(|| PlatformError::not_found("User", user))?;

    if version.manages_role_groups() {
        let changes = RoleChanges::plan(&account.system_roles, desired, &member_of);
        if changes.is_empty() {
            debug!(user, "Role group membership already up to date");
        }
        let group_id = |role: &str| {
            group_ids
                .get(role)
                .ok_or_else(|| PlatformError::internal(format!("No identity provider group for role {}", role)))
        };

        for role in &changes.remove {
            warn!(role = %role, user, "Removing role from user");
            state.identity.remove_user_from_group(&idp_user_id, group_id(role)?).await?;
        }
        for role in &changes.add {
            warn!(role = %role, user, "Adding role for user");
            state.identity.add_user_to_group(&idp_user_id, group_id(role)?).await?;
        }
    }

    state.users.set_system_roles(&account.id, desired).await
}

/// Accounts that queued no run in the last `days` days
#[utoipa::path(
    get,
    path = "/inactivefor/{days}",
    tag = "user-management",
    params(("days" = String, Path, description = "Window length in days")),
    responses(
        (status = 200, description = "Inactive accounts", body = InactiveAccountsResponse),
        (status = 403, description = "Caller is not an admin", body = MessageResponse),
        (status = 500, description = "Lookup failed", body = MessageResponse)
    )
)]
pub async fn list_inactive_accounts(
    State(state): State<UserManagementState>,
    caller: Caller,
    Path(days): Path<String>,
) -> Response {
    let result = async {
        caller.require_admin().await?;
        let days: i64 = days
            .trim()
            .parse()
            .map_err(|_| PlatformError::validation(format!("invalid literal for days: '{}'", days)))?;
        let since = Duration::try_days(days)
            .and_then(|window| Utc::now().checked_sub_signed(window))
            .ok_or_else(|| PlatformError::validation(format!("days out of range: {}", days)))?;

        let svc_idp_ids = state.users.service_account_idp_ids().await?;
        let accounts = state.users.list_accounts().await?;
        let active = state.users.starting_user_ids_since(since).await?;
        Ok::<_, PlatformError>(find_inactive_accounts(&accounts, &active, &svc_idp_ids))
    }
    .await;

    match result {
        Ok(inactive_accounts) => Json(InactiveAccountsResponse { inactive_accounts }).into_response(),
        Err(e) if e.is_forbidden() => {
            (StatusCode::FORBIDDEN, Json(MessageResponse::new(ADMINS_ONLY))).into_response()
        }
        Err(e) => {
            error!(error = %e, "Error fetching inactive users");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(MessageResponse::new(e.to_string()))).into_response()
        }
    }
}

/// Enable the listed users in the identity provider
#[utoipa::path(
    post,
    path = "/activate",
    tag = "user-management",
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Users updated", body = ActivationResponse),
        (status = 403, description = "Caller is not an admin", body = MessageResponse),
        (status = 500, description = "Users updated before the failure", body = ActivationResponse)
    )
)]
pub async fn activate_users(
    State(state): State<UserManagementState>,
    caller: Caller,
    body: JsonBody<ActivationRequest>,
) -> Response {
    change_activation(&state, &caller, body, true).await
}

/// Disable the listed users in the identity provider
#[utoipa::path(
    post,
    path = "/deactivate",
    tag = "user-management",
    request_body = ActivationRequest,
    responses(
        (status = 200, description = "Users updated", body = ActivationResponse),
        (status = 403, description = "Caller is not an admin", body = MessageResponse),
        (status = 500, description = "Users updated before the failure", body = ActivationResponse)
    )
)]
pub async fn deactivate_users(
    State(state): State<UserManagementState>,
    caller: Caller,
    body: JsonBody<ActivationRequest>,
) -> Response {
    change_activation(&state, &caller, body, false).await
}

async fn change_activation(
    state: &UserManagementState,
    caller: &Caller,
    body: JsonBody<ActivationRequest>,
    enabled: bool,
) -> Response {
    let mut updated_users = Vec::new();

    let result = async {
        caller.require_admin().await?;
        let request = json_body(body)?;
        for idp_id in state.users.idp_ids_for_logins(&request.users).await? {
            let mut user = state.identity.get_user(&idp_id).await?;
            user.enabled = enabled;
            state.identity.update_user(&idp_id, &user).await?;
            updated_users.push(user.username);
        }
        Ok::<_, PlatformError>(())
    }
    .await;

    match result {
        Ok(()) => {
            info!(enabled, users = %updated_users.join(","), "Updated activation status");
            Json(ActivationResponse { updated_users, message: None }).into_response()
        }
        Err(e) if e.is_forbidden() => {
            (StatusCode::FORBIDDEN, Json(MessageResponse::new(ADMINS_ONLY))).into_response()
        }
        Err(e) => {
            warn!(
                users = %updated_users.join(","),
                error = %e,
                "Error updating activation status of users. Some users may be updated"
            );
            let body = ActivationResponse {
                updated_users,
                message: Some(format!("Error : {}", e)),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// Create user management router
pub fn user_management_router(state: UserManagementState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(update_roles))
        .routes(routes!(list_inactive_accounts))
        .routes(routes!(activate_users))
        .routes(routes!(deactivate_users))
        .with_state(state)
}
