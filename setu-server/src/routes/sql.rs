//! `POST /v1/sql` — caller-supplied SQL, spec.md §4.5/§4.6.
//!
//! Gate first, execute second: `validate_select_only` rejects anything but
//! a single read-only `SELECT` before the gateway even looks at the
//! dataset's RLS policy, so a rejected statement never reaches the
//! upstream warehouse.

use std::time::Instant;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use setu_analytics::QueryRecord;
use setu_compiler::{ColumnMeta, TenantContext};
use setu_security::Principal;
use setu_sql_gate::validate_select_only;

use crate::error::GatewayError;
use crate::ids;
use crate::state::AppState;
use crate::util;

#[derive(Debug, Deserialize)]
pub struct SqlRequest {
    pub sql: String,
    pub dataset: String,
    #[serde(default)]
    pub parameters: Vec<JsonValue>,
}

#[derive(Debug, Serialize)]
struct SqlResponse {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<JsonValue>>,
    stats: SqlStats,
}

#[derive(Debug, Serialize)]
struct SqlStats {
    duration_ms: i64,
    rows: usize,
    truncated: bool,
}

pub async fn sql(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<SqlRequest>,
) -> Result<Response, GatewayError> {
    let started = Instant::now();
    let rate_key = util::bucket_key("sql", &principal.key_id);
    let decision = match util::check_rate_limit(
        &state,
        &rate_key,
        state.config.rate_limit_default_max,
        state.config.rate_limit_default_window_secs,
    ) {
        Ok(decision) => decision,
        Err(rejection) => return Ok(rejection),
    };

    let snapshot = state.catalog.current().await;
    let dataset = snapshot.dataset(&request.dataset)?;
    let source = snapshot.source(&dataset.source_id)?;
    let dialect = setu_compiler::descriptor_for(source.kind);

    validate_select_only(&request.sql, source.kind)?;

    let tenant = TenantContext {
        tenant_id: &principal.tenant_id,
        is_admin: principal.role.is_admin(),
    };
    let (wrapped_sql, mut rls_params) = setu_compiler::wrap_raw_sql(
        &request.sql,
        dataset.rls.as_ref(),
        tenant,
        &dialect,
        request.parameters.len(),
    );
    let mut bound_params = request.parameters.clone();
    bound_params.append(&mut rls_params);

    let deadline = Instant::now() + state.query_timeout();
    let result = state
        .executor
        .execute_raw(
            &dataset.source_id,
            &wrapped_sql,
            &bound_params,
            deadline,
            state.query_timeout(),
            state.config.guards.max_rows as usize,
            CancellationToken::new(),
        )
        .await?;

    let duration_ms = started.elapsed().as_millis() as i64;
    state.analytics.record(QueryRecord {
        id: ids::record_id(),
        dataset: dataset.id.clone(),
        tenant: principal.tenant_id.clone(),
        dimensions: Vec::new(),
        metrics: Vec::new(),
        duration_ms,
        rows: result.rows.len() as u64,
        cache_hit: false,
        success: true,
        error_code: None,
        started_at: Utc::now(),
        source_ip: String::new(),
    });

    let rows_len = result.rows.len();
    let response = SqlResponse {
        columns: result.columns,
        rows: result.rows,
        stats: SqlStats {
            duration_ms,
            rows: rows_len,
            truncated: result.truncated,
        },
    };

    Ok(util::stamp_rate_limit(Json(response).into_response(), &decision))
}
