//! `POST /v1/batch` — thin wrapper around `setu_batch::BatchOrchestrator`,
//! which already owns the whole DAG walk (spec.md §4.11).

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::sync::CancellationToken;

use setu_batch::BatchRequest;
use setu_security::Principal;

use crate::error::GatewayError;
use crate::state::AppState;
use crate::util;

pub async fn batch(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<BatchRequest>,
) -> Result<Response, GatewayError> {
    let rate_key = util::bucket_key("batch", &principal.key_id);
    let decision = match util::check_rate_limit(
        &state,
        &rate_key,
        state.config.rate_limit_default_max,
        state.config.rate_limit_default_window_secs,
    ) {
        Ok(decision) => decision,
        Err(rejection) => return Ok(rejection),
    };

    let result = state
        .batch_orchestrator
        .run(request, &principal.tenant_id, principal.role.is_admin(), CancellationToken::new())
        .await?;

    Ok(util::stamp_rate_limit(Json(result).into_response(), &decision))
}
