//! Auto-Shutdown Admin API

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::autoshutdown::entity::AutoShutdownRequest;
use crate::autoshutdown::policy::{apply_rules, ApplyOutcome};
use crate::autoshutdown::repository::AutoShutdownStore;
use crate::shared::api_common::{json_body, JsonBody};
use crate::shared::middleware::Caller;

const FORBIDDEN_MESSAGE: &str = "Unauthorized - Must be Domino Admin or one of the allowed users";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AutoShutdownResponse {
    pub msg: String,
}

#[derive(Clone)]
pub struct AutoShutdownState {
    pub store: Arc<dyn AutoShutdownStore>,
}

/// Apply workspace auto-shutdown durations to all users
///
/// Failures are returned as plain text.
#[utoipa::path(
    post,
    path = "/autoshutdown-rules",
    tag = "autoshutdown",
    request_body = AutoShutdownRequest,
    responses(
        (status = 200, description = "Rules applied, or skipped with the reason", body = AutoShutdownResponse),
        (status = 403, description = "Caller is not an admin", body = String, content_type = "text/plain"),
        (status = 500, description = "Error text", body = String, content_type = "text/plain")
    )
)]
pub async fn apply_autoshutdown_rules(
    State(state): State<AutoShutdownState>,
    caller: Caller,
    body: JsonBody<AutoShutdownRequest>,
) -> Response {
    warn!("Extended API endpoint /autoshutdown-rules invoked");
    run_rules(&state, &caller, body, |outcome| outcome.message).await
}

/// Same operation on the path of earlier releases, whose skip messages are
/// matched verbatim by existing callers.
pub async fn apply_autoshutdown_rules_legacy(
    State(state): State<AutoShutdownState>,
    caller: Caller,
    body: JsonBody<AutoShutdownRequest>,
) -> Response {
    warn!("Extended API endpoint /v4-extended/autoshutdownwksrules invoked");
    run_rules(&state, &caller, body, |outcome| match outcome.skipped {
        Some(reason) => reason.legacy_message().to_string(),
        None => outcome.message,
    })
    .await
}

async fn run_rules(
    state: &AutoShutdownState,
    caller: &Caller,
    body: JsonBody<AutoShutdownRequest>,
    message: impl FnOnce(ApplyOutcome) -> String,
) -> Response {
    if let Err(e) = caller.require_admin().await {
        if e.is_forbidden() {
            return (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response();
        }
        error!(error = %e, "Caller authorization failed");
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    let request = match json_body(body) {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Malformed auto-shutdown payload");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    match apply_rules(state.store.as_ref(), &request).await {
        Ok(outcome) => {
            warn!(
                upserted = outcome.upserted,
                deleted = outcome.deleted,
                unchanged = outcome.unchanged,
                "Auto-shutdown rules processed"
            );
            Json(AutoShutdownResponse { msg: message(outcome) }).into_response()
        }
        Err(e) => {
            error!(error = %e, "Applying auto-shutdown rules failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Create auto-shutdown router
pub fn autoshutdown_router(state: AutoShutdownState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(apply_autoshutdown_rules))
        .with_state(state)
}

/// Path served by earlier releases of the service
pub fn autoshutdown_legacy_router(state: AutoShutdownState) -> Router {
    Router::new()
        .route("/v4-extended/autoshutdownwksrules", post(apply_autoshutdown_rules_legacy))
        .with_state(state)
}
