//! Environments Listing API
//!
//! Proxies the platform environment listing and annotates each revision with
//! the docker image it is ultimately based on.

use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::environment::resolver::BaseImageResolver;
use crate::nucleus::ListingUpstream;
use crate::shared::api_common::passthrough_status;
use crate::shared::middleware::ForwardedCredentials;

pub const UPSTREAM_ENVIRONMENTS_PATH: &str = "/api/environments/beta/environments";

/// Revision objects on each environment that get annotated
const REVISION_FIELDS: [&str; 2] = ["latestRevision", "selectedRevision"];

#[derive(Debug, Serialize, ToSchema)]
pub struct EnvironmentsResponse {
    #[schema(value_type = Vec<Object>)]
    pub environments: Vec<Value>,
}

#[derive(Clone)]
pub struct EnvironmentsState {
    pub upstream: Arc<dyn ListingUpstream>,
    pub resolver: Arc<BaseImageResolver>,
}

/// List environments with base image details
///
/// Query parameters are forwarded unchanged. A non-200 upstream status is
/// passed through with an empty list.
#[utoipa::path(
    get,
    path = "/environments",
    tag = "environments",
    responses(
        (status = 200, description = "Enriched environment listing", body = EnvironmentsResponse),
        (status = 500, description = "Upstream unreachable")
    )
)]
pub async fn list_environments(
    State(state): State<EnvironmentsState>,
    credentials: ForwardedCredentials,
    RawQuery(query): RawQuery,
) -> Response {
    warn!("Extended API endpoint /environments invoked");

    let listing = match state
        .upstream
        .list(UPSTREAM_ENVIRONMENTS_PATH, query.as_deref(), &credentials)
        .await
    {
        Ok(listing) => listing,
        Err(e) => {
            error!(error = %e, "Environment listing failed");
            return e.into_response();
        }
    };

    if !listing.is_ok() {
        let body = EnvironmentsResponse { environments: Vec::new() };
        return (passthrough_status(listing.status), Json(body)).into_response();
    }

    let environments = enrich_environments(&state.resolver, listing.body).await;
    Json(EnvironmentsResponse { environments }).into_response()
}

/// Annotate every environment in an upstream listing body.
pub async fn enrich_environments(resolver: &BaseImageResolver, body: Value) -> Vec<Value> {
    let Value::Object(mut body) = body else {
        return Vec::new();
    };
    let Some(Value::Array(mut environments)) = body.remove("environments") else {
        return Vec::new();
    };

    for environment in environments.iter_mut() {
        enrich_environment(resolver, environment).await;
    }
    environments
}

async fn enrich_environment(resolver: &BaseImageResolver, environment: &mut Value) {
    let Some(environment_id) = environment.get("id").and_then(Value::as_str).map(String::from) else {
        warn!("Environment without id in upstream listing");
        return;
    };

    for field in REVISION_FIELDS {
        let Some(revision) = environment.get_mut(field).and_then(Value::as_object_mut) else {
            continue;
        };
        let Some(number) = revision.get("number").and_then(Value::as_i64) else {
            continue;
        };

        let resolution = resolver.resolve(&environment_id, number).await;
        if !resolution.is_success() {
            debug!(%environment_id, number, status = %resolution.status, "Base image not resolved");
        }
        revision.insert(
            "basedOnDockerImage".to_string(),
            resolution.image.map(Value::String).unwrap_or(Value::Null),
        );
        revision.insert(
            "basedOnDockerImageStatusMessage".to_string(),
            Value::String(resolution.status),
        );
        revision.insert("availableTools".to_string(), Value::Null);
    }
}

/// Create environments router
pub fn environments_router(state: EnvironmentsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_environments))
        .with_state(state)
}

/// Path served by earlier releases of the service
pub fn environments_legacy_router(state: EnvironmentsState) -> Router {
    Router::new()
        .route("/api-extended/environments/beta/environments", get(list_environments))
        .with_state(state)
}
