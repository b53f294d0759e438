//! User Management Aggregate
//!
//! System roles, identity-provider group membership and account activation.

pub mod entity;
pub mod roles;
pub mod accounts;
pub mod keycloak;
pub mod repository;
pub mod api;

pub use entity::{ActivationRequest, ActivationResponse, InactiveAccount, RoleUpdateRequest, RoleUpdateResponse, UserAccount};
pub use roles::{are_roles_valid, RoleChanges, ALL_ROLES};
pub use accounts::find_inactive_accounts;
pub use keycloak::{IdentityAdmin, KeycloakAdminClient, KeycloakAdminConfig, KeycloakUser};
pub use repository::{UserDirectory, UserRepository};
pub use api::{UserManagementState, user_management_router};
