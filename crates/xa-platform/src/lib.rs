//! Extended API Platform
//!
//! Administrative endpoints in front of the platform's MongoDB, Keycloak and
//! Kubernetes control plane:
//! - Workspace auto-shutdown policy push
//! - Environment / project listing enrichment backed by lookup tables
//! - Mutation custom resource management
//! - User roles and activation
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints

// Aggregates
pub mod environment;
pub mod project;
pub mod autoshutdown;
pub mod mutation;
pub mod user_management;

// Upstream platform services
pub mod nucleus;
pub mod credentials;

// Shared infrastructure
pub mod shared;

pub use shared::error::{PlatformError, Result};

// Re-export main entity types for convenience
pub use environment::entity::EnvironmentRevision;
pub use project::entity::Project;
pub use autoshutdown::entity::{AutoShutdownRequest, AutoShutdownSettings};
pub use user_management::entity::UserAccount;
pub use nucleus::{CallerPrincipal, PlatformVersion};

// Re-export services
pub use environment::{BaseImageResolver, EnvironmentRevisionCache, Resolution};
pub use project::ProjectCache;
pub use nucleus::NucleusClient;
pub use user_management::{KeycloakAdminClient, KeycloakAdminConfig};
pub use mutation::KubeMutationStore;
pub use credentials::{CredentialSource, CredentialStore, SystemCredentials};

/// Repository re-exports
pub mod repository {
    pub use crate::environment::repository::EnvironmentRevisionRepository;
    pub use crate::project::repository::ProjectRepository;
    pub use crate::autoshutdown::repository::{AutoShutdownRepository, CentralConfigRepository};
    pub use crate::user_management::repository::UserRepository;
}

/// Router and state re-exports
pub mod api {
    pub use crate::shared::middleware::{AppState, AuthLayer};
    pub use crate::shared::health_api::{health_router, HealthState};
    pub use crate::shared::cache_api::{cache_router, cache_legacy_router, CacheState};
    pub use crate::environment::api::{environments_router, environments_legacy_router, EnvironmentsState};
    pub use crate::project::api::{projects_router, projects_legacy_router, ProjectsState};
    pub use crate::autoshutdown::api::{autoshutdown_router, autoshutdown_legacy_router, AutoShutdownState};
    pub use crate::mutation::api::{mutations_router, MutationsState};
    pub use crate::user_management::api::{user_management_router, UserManagementState};
}
