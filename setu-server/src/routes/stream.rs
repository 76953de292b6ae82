//! `POST /v1/stream` and its WebSocket sibling, spec.md §4.10/§6.
//!
//! The executor materializes the full result set today (there is no
//! incremental upstream cursor in `setu-executor`), so every protocol here
//! feeds `setu_stream::MaterializedRowSource` — the dispatcher's framing,
//! heartbeat, and backpressure behavior is identical to a genuinely
//! incremental source, only the first `next_chunk()` resolves eagerly
//! instead of waiting on upstream I/O.

use std::time::Instant;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::sse::Sse;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use setu_catalog::QueryRequest;
use setu_compiler::TenantContext;
use setu_core::ws::WsStream;
use setu_security::Principal;
use setu_stream::{chunked_response, dispatch_sse, dispatch_ws, keep_alive, ChunkedFormat, MaterializedRowSource};

use crate::error::GatewayError;
use crate::ids;
use crate::state::AppState;
use crate::util;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFormat {
    Ndjson,
    Csv,
    JsonArray,
    Sse,
}

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    #[serde(flatten)]
    pub query: QueryRequest,
    pub format: StreamFormat,
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

async fn run_query(
    state: &AppState,
    principal: &Principal,
    query: &QueryRequest,
) -> Result<setu_sources::QueryResult, GatewayError> {
    let snapshot = state.catalog.current().await;
    let dataset = snapshot.dataset(&query.dataset)?;
    setu_catalog::check_request(&snapshot, &state.config.guards, query)?;
    let source = snapshot.source(&dataset.source_id)?;
    let dialect = setu_compiler::descriptor_for(source.kind);
    let tenant = TenantContext {
        tenant_id: &principal.tenant_id,
        is_admin: principal.role.is_admin(),
    };
    let compiled = setu_compiler::compile(query, dataset, tenant, &dialect, state.config.guards.max_rows)?;
    let deadline = Instant::now() + state.query_timeout();
    let result = state
        .executor
        .execute(
            &dataset.source_id,
            &compiled,
            deadline,
            state.query_timeout(),
            state.config.guards.max_rows as usize,
            CancellationToken::new(),
        )
        .await?;
    Ok(result)
}

pub async fn stream(
    State(state): State<AppState>,
    principal: Principal,
    axum::Json(request): axum::Json<StreamRequest>,
) -> Result<Response, GatewayError> {
    let rate_key = util::bucket_key("stream", &principal.key_id);
    let decision = match util::check_rate_limit(
        &state,
        &rate_key,
        state.config.rate_limit_default_max,
        state.config.rate_limit_default_window_secs,
    ) {
        Ok(decision) => decision,
        Err(rejection) => return Ok(rejection),
    };

    let result = run_query(&state, &principal, &request.query).await?;
    let chunk_size = request.chunk_size.unwrap_or(state.config.stream_default_chunk_size);
    let columns = result.columns.clone();
    let source = MaterializedRowSource::new(result.rows, chunk_size);
    let stream_id = ids::stream_id();

    let response = match request.format {
        StreamFormat::Sse => {
            let frames = dispatch_sse(
                &stream_id,
                &request.query.dataset,
                chunk_size,
                &columns,
                source,
                state.config.stream_progress_interval,
                state.config.stream_max_rows,
            );
            Sse::new(frames).keep_alive(keep_alive()).into_response()
        }
        StreamFormat::Ndjson => chunked_response(
            ChunkedFormat::Ndjson,
            &stream_id,
            &request.query.dataset,
            chunk_size,
            columns,
            source,
            state.config.stream_progress_interval,
            state.config.stream_max_rows,
        ),
        StreamFormat::Csv => chunked_response(
            ChunkedFormat::Csv,
            &stream_id,
            &request.query.dataset,
            chunk_size,
            columns,
            source,
            state.config.stream_progress_interval,
            state.config.stream_max_rows,
        ),
        StreamFormat::JsonArray => chunked_response(
            ChunkedFormat::JsonArray,
            &stream_id,
            &request.query.dataset,
            chunk_size,
            columns,
            source,
            state.config.stream_progress_interval,
            state.config.stream_max_rows,
        ),
    };

    Ok(util::stamp_rate_limit(response, &decision))
}

/// Query parameters for the WebSocket upgrade. A WS handshake carries no
/// body, so the query request travels url-encoded as a JSON string instead
/// of the POST body the other stream formats use.
#[derive(Debug, Deserialize)]
pub struct WsStreamParams {
    pub request: String,
}

pub async fn stream_ws(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<WsStreamParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, GatewayError> {
    let request: StreamRequest = serde_json::from_str(&params.request)
        .map_err(|e| setu_core::AppError::BadRequest(format!("invalid stream request: {e}")))?;

    let rate_key = util::bucket_key("stream_ws", &principal.key_id);
    if let Err(rejection) = util::check_rate_limit(
        &state,
        &rate_key,
        state.config.rate_limit_default_max,
        state.config.rate_limit_default_window_secs,
    ) {
        return Ok(rejection);
    }

    let result = run_query(&state, &principal, &request.query).await?;
    let chunk_size = request.chunk_size.unwrap_or(state.config.stream_default_chunk_size);
    let columns = result.columns.clone();
    let source = MaterializedRowSource::new(result.rows, chunk_size);
    let stream_id = ids::stream_id();
    let progress_interval = state.config.stream_progress_interval;
    let stream_max_rows = state.config.stream_max_rows;
    let dataset = request.query.dataset.clone();

    Ok(ws.on_upgrade(move |socket| async move {
        let mut stream = WsStream::new(socket);
        let cancellation = CancellationToken::new();
        let _ = dispatch_ws(
            &mut stream,
            cancellation,
            &stream_id,
            &dataset,
            chunk_size,
            &columns,
            source,
            progress_interval,
            stream_max_rows,
        )
        .await;
    }))
}
