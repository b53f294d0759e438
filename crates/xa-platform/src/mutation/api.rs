//! Mutations Admin API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::mutation::store::{manifest_name, MutationStore};
use crate::shared::api_common::{json_body, JsonBody};
use crate::shared::error::{PlatformError, Result};
use crate::shared::middleware::Caller;

/// Mutation manifest or API server reply, passed through as-is
#[derive(ToSchema)]
#[schema(value_type = Object)]
pub struct MutationDocument(pub Value);

#[derive(Clone)]
pub struct MutationsState {
    pub store: Arc<dyn MutationStore>,
}

/// Authorize the caller, answering non-admins with `denied` as plain text.
async fn authorize(caller: &Caller, denied: &'static str) -> std::result::Result<(), Response> {
    match caller.require_admin().await {
        Ok(_) => Ok(()),
        Err(e) if e.is_forbidden() => Err((StatusCode::FORBIDDEN, denied).into_response()),
        Err(e) => {
            error!(error = %e, "Caller authorization failed");
            Err(e.into_response())
        }
    }
}

/// Replace a mutation: delete any existing object with the same name, then create
#[utoipa::path(
    post,
    path = "/apply",
    tag = "mutations",
    request_body = MutationDocument,
    responses(
        (status = 200, description = "Created mutation", body = MutationDocument),
        (status = 403, description = "Caller is not an admin"),
        (status = 500, description = "Apply failed")
    )
)]
pub async fn apply_mutation(
    State(state): State<MutationsState>,
    caller: Caller,
    body: JsonBody<Value>,
) -> Response {
    if let Err(denied) = authorize(&caller, "Unauthorized to apply mutations because not an admin").await {
        return denied;
    }

    let mutation = match json_body(body) {
        Ok(mutation) => mutation,
        Err(e) => {
            error!(error = %e, "Mutation failed to apply");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let name = manifest_name(&mutation).map(String::from);
    match replace(state.store.as_ref(), name.as_deref(), mutation).await {
        Ok(created) => Json(created).into_response(),
        Err(e) => {
            error!(name = ?name, error = %e, "Mutation failed to apply");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn replace(store: &dyn MutationStore, name: Option<&str>, mutation: Value) -> Result<Value> {
    let name = name.ok_or_else(|| PlatformError::validation("mutation metadata.name is required"))?;

    if store.get(name).await?.is_some() {
        warn!(name, "Deleting existing mutation before apply");
        store.delete(name).await?;
    }

    let created = store.create(mutation).await?;
    warn!(name, "Mutation added");
    Ok(created)
}

/// List mutations in the platform namespace
#[utoipa::path(
    get,
    path = "/list",
    tag = "mutations",
    responses(
        (status = 200, description = "Mutation list", body = MutationDocument),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_mutations(State(state): State<MutationsState>, caller: Caller) -> Response {
    if let Err(denied) = authorize(&caller, "Unauthorized to list mutations because not an admin").await {
        return denied;
    }

    match state.store.list().await {
        Ok(list) => Json(list).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list mutations");
            e.into_response()
        }
    }
}

/// Get a mutation by name
#[utoipa::path(
    get,
    path = "/{name}",
    tag = "mutations",
    params(("name" = String, Path, description = "Mutation name")),
    responses(
        (status = 200, description = "Mutation", body = MutationDocument),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such mutation")
    )
)]
pub async fn get_mutation(
    State(state): State<MutationsState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&caller, "Unauthorized to get mutation because not an admin").await {
        return denied;
    }

    match state.store.get(&name).await {
        Ok(Some(mutation)) => Json(mutation).into_response(),
        Ok(None) => PlatformError::not_found("Mutation", &name).into_response(),
        Err(e) => {
            error!(name, error = %e, "Failed to get mutation");
            e.into_response()
        }
    }
}

/// Delete a mutation by name
#[utoipa::path(
    delete,
    path = "/{name}",
    tag = "mutations",
    params(("name" = String, Path, description = "Mutation name")),
    responses(
        (status = 200, description = "Deleted mutation", body = MutationDocument),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such mutation")
    )
)]
pub async fn delete_mutation(
    State(state): State<MutationsState>,
    caller: Caller,
    Path(name): Path<String>,
) -> Response {
    if let Err(denied) = authorize(&caller, "Unauthorized to delete mutations because not an admin").await {
        return denied;
    }

    let result = async {
        if state.store.get(&name).await?.is_none() {
            return Err(PlatformError::not_found("Mutation", &name));
        }
        state.store.delete(&name).await
    }
    .await;

    match result {
        Ok(deleted) => {
            info!(name, "Mutation deleted");
            Json(deleted).into_response()
        }
        Err(e) => {
            error!(name, error = %e, "Mutation failed to delete");
            e.into_response()
        }
    }
}

/// Create mutations router
pub fn mutations_router(state: MutationsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(apply_mutation))
        .routes(routes!(list_mutations))
        .routes(routes!(get_mutation, delete_mutation))
        .with_state(state)
}
