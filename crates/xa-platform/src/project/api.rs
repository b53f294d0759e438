//! Projects Listing API

use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::nucleus::ListingUpstream;
use crate::project::cache::ProjectCache;
use crate::shared::api_common::passthrough_status;
use crate::shared::middleware::ForwardedCredentials;

pub const UPSTREAM_PROJECTS_PATH: &str = "/api/projects/beta/projects";

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectsResponse {
    #[schema(value_type = Vec<Object>)]
    pub projects: Vec<Value>,
}

#[derive(Clone)]
pub struct ProjectsState {
    pub upstream: Arc<dyn ListingUpstream>,
    pub projects: Arc<ProjectCache>,
}

/// List projects with their environment override and default revision spec
#[utoipa::path(
    get,
    path = "/projects",
    tag = "projects",
    responses(
        (status = 200, description = "Enriched project listing", body = ProjectsResponse),
        (status = 500, description = "Upstream unreachable")
    )
)]
pub async fn list_projects(
    State(state): State<ProjectsState>,
    credentials: ForwardedCredentials,
    RawQuery(query): RawQuery,
) -> Response {
    warn!("Extended API endpoint /projects invoked");

    let listing = match state
        .upstream
        .list(UPSTREAM_PROJECTS_PATH, query.as_deref(), &credentials)
        .await
    {
        Ok(listing) => listing,
        Err(e) => {
            error!(error = %e, "Project listing failed");
            return e.into_response();
        }
    };

    if !listing.is_ok() {
        let body = ProjectsResponse { projects: Vec::new() };
        return (passthrough_status(listing.status), Json(body)).into_response();
    }

    let projects = enrich_projects(&state.projects, listing.body).await;
    Json(ProjectsResponse { projects }).into_response()
}

/// Attach stored project fields to each listed project found in the table.
pub async fn enrich_projects(cache: &ProjectCache, body: Value) -> Vec<Value> {
    let Value::Object(mut body) = body else {
        return Vec::new();
    };
    let Some(Value::Array(mut projects)) = body.remove("projects") else {
        return Vec::new();
    };

    for project in projects.iter_mut() {
        let Some(id) = project.get("id").and_then(Value::as_str).map(String::from) else {
            continue;
        };

        let stored = match cache.find_by_project(&id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => continue,
            Err(e) => {
                warn!(project_id = %id, error = %e, "Project lookup failed");
                continue;
            }
        };

        if let Some(fields) = project.as_object_mut() {
            fields.insert(
                "environment_id".to_string(),
                stored.environment_id.clone().map(Value::String).unwrap_or(Value::Null),
            );
            fields.insert(
                "default_environment_revision_spec".to_string(),
                stored.default_environment_revision_spec.clone(),
            );
        }
    }
    projects
}

/// Create projects router
pub fn projects_router(state: ProjectsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_projects))
        .with_state(state)
}

/// Path served by earlier releases of the service
pub fn projects_legacy_router(state: ProjectsState) -> Router {
    Router::new()
        .route("/api-extended/projects/beta/projects", get(list_projects))
        .with_state(state)
}
