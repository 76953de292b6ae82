//! `POST /v1/query` — the semantic query path, spec.md §6.
//!
//! Mirrors `setu-batch::BatchOrchestrator::run_one`'s sequence exactly
//! (catalog snapshot → guard check → dataset/source lookup → dialect →
//! compile → execute) but adds the single layer batch sub-queries skip:
//! result caching keyed by `setu_compiler::fingerprint`, with single-flight
//! coalescing so concurrent identical requests hit the upstream once
//! (spec.md §8 scenario 5).

use std::time::Instant;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

use setu_analytics::QueryRecord;
use setu_catalog::{check_request, QueryRequest};
use setu_compiler::{fingerprint, ColumnMeta, TenantContext};
use setu_security::Principal;

use crate::error::GatewayError;
use crate::ids;
use crate::state::{AppState, CachedResult};
use crate::util;

#[derive(Debug, Serialize)]
struct QueryStats {
    cached: bool,
    cached_at: Option<chrono::DateTime<Utc>>,
    duration_ms: i64,
    rows: usize,
    truncated: bool,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<JsonValue>>,
    stats: QueryStats,
}

/// spec.md §4.9: `Cache-Control: no-cache` bypasses the lookup but still
/// populates the cache on success, the same "revalidate, don't disable"
/// contract HTTP caches use for that directive.
fn wants_no_cache(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("no-cache"))
        .unwrap_or(false)
}

pub async fn query(
    State(state): State<AppState>,
    principal: Principal,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Result<Response, GatewayError> {
    let started = Instant::now();
    let no_cache = wants_no_cache(&headers);
    let rate_key = util::bucket_key("query", &principal.key_id);
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
    check_request(&snapshot, &state.config.guards, &request)?;
    let source = snapshot.source(&dataset.source_id)?;
    let dialect = setu_compiler::descriptor_for(source.kind);
    let tenant = TenantContext {
        tenant_id: &principal.tenant_id,
        is_admin: principal.role.is_admin(),
    };

    let key = fingerprint(&request, &principal.tenant_id, snapshot.generation);

    let cache = state.result_cache.clone();
    let cache_for_check = cache.clone();
    let check_cache = move || {
        if no_cache {
            None
        } else {
            cache_for_check.get(&key).map(Ok)
        }
    };

    let dataset_id = dataset.id.clone();
    let source_id = dataset.source_id.clone();
    let compiled = setu_compiler::compile(&request, dataset, tenant, &dialect, state.config.guards.max_rows)?;
    let executor = state.executor.clone();
    let query_timeout = state.query_timeout();
    let deadline = Instant::now() + query_timeout;
    let max_rows = state.config.guards.max_rows as usize;

    let compute = move || async move {
        let outcome = executor
            .execute(
                &source_id,
                &compiled,
                deadline,
                query_timeout,
                max_rows,
                CancellationToken::new(),
            )
            .await;
        outcome.map(|result| CachedResult {
            result,
            cached_at: Utc::now(),
        })
    };

    let cache_hit = check_cache().is_some();
    let outcome = state.single_flight.run(key, check_cache, compute).await;
    let cached_result = outcome?;
    let cached_at = if cache_hit { Some(cached_result.cached_at) } else { None };

    if !cache_hit {
        let byte_size = estimate_bytes(&cached_result.result);
        cache.insert(key, cached_result.clone(), byte_size, dataset_id.clone());
    }

    let duration_ms = started.elapsed().as_millis() as i64;
    state.analytics.record(QueryRecord {
        id: ids::record_id(),
        dataset: dataset_id,
        tenant: principal.tenant_id.clone(),
        dimensions: request.dimensions.clone(),
        metrics: request.metrics.clone(),
        duration_ms,
        rows: cached_result.result.rows.len() as u64,
        cache_hit,
        success: true,
        error_code: None,
        started_at: Utc::now(),
        source_ip: String::new(),
    });

    let response = QueryResponse {
        columns: cached_result.result.columns.clone(),
        rows: cached_result.result.rows.clone(),
        stats: QueryStats {
            cached: cache_hit,
            cached_at,
            duration_ms,
            rows: cached_result.result.rows.len(),
            truncated: cached_result.result.truncated,
        },
    };

    Ok(util::stamp_rate_limit(Json(response).into_response(), &decision))
}

fn estimate_bytes(result: &setu_sources::QueryResult) -> usize {
    result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string().len()).sum::<usize>())
        .sum::<usize>()
        + result.columns.len() * 32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_cache_control(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::CACHE_CONTROL, value.parse().unwrap());
        headers
    }

    #[test]
    fn no_header_does_not_bypass_cache() {
        assert!(!wants_no_cache(&HeaderMap::new()));
    }

    #[test]
    fn no_cache_directive_bypasses_cache() {
        assert!(wants_no_cache(&headers_with_cache_control("no-cache")));
    }

    #[test]
    fn no_cache_directive_is_case_insensitive_and_may_share_the_header() {
        assert!(wants_no_cache(&headers_with_cache_control("max-age=0, No-Cache")));
    }

    #[test]
    fn unrelated_directives_do_not_bypass_cache() {
        assert!(!wants_no_cache(&headers_with_cache_control("max-age=60")));
    }
}
