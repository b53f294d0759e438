//! Lookup Table Refresh API

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::environment::cache::EnvironmentRevisionCache;
use crate::project::cache::ProjectCache;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheRefreshResponse {
    pub environment_revision_cache_refreshed: bool,
    pub projects_cache_refreshed: bool,
}

#[derive(Clone)]
pub struct CacheState {
    pub revisions: Arc<EnvironmentRevisionCache>,
    pub projects: Arc<ProjectCache>,
}

/// Key names of the refresh reply on the path served by earlier releases.
#[derive(Debug, Serialize)]
pub struct LegacyCacheRefreshResponse {
    #[serde(rename = "EnvironmentReviewCacheRefreshed")]
    pub environment_revision_cache_refreshed: bool,
    #[serde(rename = "ProjectsCacheRefreshed")]
    pub projects_cache_refreshed: bool,
}

/// Reload both lookup tables
///
/// Each flag is false when that table's refresh failed. The failure is logged
/// and the previous snapshot stays in use.
#[utoipa::path(
    get,
    path = "/refresh-cache",
    tag = "cache",
    responses(
        (status = 200, description = "Refresh attempted", body = CacheRefreshResponse)
    )
)]
pub async fn refresh_cache(State(state): State<CacheState>) -> Json<CacheRefreshResponse> {
    Json(refresh_tables(&state).await)
}

pub async fn refresh_cache_legacy(State(state): State<CacheState>) -> Json<LegacyCacheRefreshResponse> {
    let flags = refresh_tables(&state).await;
    Json(LegacyCacheRefreshResponse {
        environment_revision_cache_refreshed: flags.environment_revision_cache_refreshed,
        projects_cache_refreshed: flags.projects_cache_refreshed,
    })
}

async fn refresh_tables(state: &CacheState) -> CacheRefreshResponse {
    let environment_revision_cache_refreshed = match state.revisions.refresh().await {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Environment revision table refresh failed");
            false
        }
    };

    let projects_cache_refreshed = match state.projects.refresh().await {
        Ok(_) => true,
        Err(e) => {
            error!(error = %e, "Project table refresh failed");
            false
        }
    };

    CacheRefreshResponse {
        environment_revision_cache_refreshed,
        projects_cache_refreshed,
    }
}

/// Create cache router
pub fn cache_router(state: CacheState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(refresh_cache))
        .with_state(state)
}

/// Path served by earlier releases of the service
pub fn cache_legacy_router(state: CacheState) -> Router {
    Router::new()
        .route("/api-extended/refresh_cache", get(refresh_cache_legacy))
        .with_state(state)
}
