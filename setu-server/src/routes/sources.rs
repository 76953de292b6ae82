//! `GET/POST/DELETE /v1/sources` — admin-only source lifecycle, spec.md §6.
//!
//! Credentials are sealed with `setu_vault::seal` before they ever touch
//! `CatalogStore`; the plaintext only exists long enough to connect an
//! adapter and is never logged or returned.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use setu_catalog::{Source, SourceKind};
use setu_security::Principal;

use crate::catalog_admin::{connect_adapter, reload_catalog_from_store};
use crate::error::GatewayError;
use crate::state::AppState;

fn require_admin(principal: &Principal) -> Result<(), GatewayError> {
    if principal.role.is_admin() {
        Ok(())
    } else {
        Err(GatewayError(setu_core::AppError::Forbidden(
            "source management requires the admin role".to_string(),
        )))
    }
}

#[derive(Debug, Serialize)]
struct SourceView {
    id: String,
    kind: SourceKind,
    display_name: Option<String>,
}

pub async fn list_sources(State(state): State<AppState>, principal: Principal) -> Result<Response, GatewayError> {
    require_admin(&principal)?;
    let snapshot = state.catalog.current().await;
    let views: Vec<SourceView> = snapshot
        .sources()
        .map(|s| SourceView {
            id: s.id.clone(),
            kind: s.kind,
            display_name: s.display_name.clone(),
        })
        .collect();
    Ok(Json(views).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateSourceRequest {
    pub id: String,
    pub kind: SourceKind,
    pub display_name: Option<String>,
    /// Raw connection string (DSN for sqlx-native kinds, bearer token +
    /// endpoint for HTTP-driven warehouses) — sealed before persisting,
    /// never echoed back.
    pub connection_string: String,
    #[serde(default)]
    pub pool_size: Option<u32>,
}

pub async fn create_source(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<CreateSourceRequest>,
) -> Result<Response, GatewayError> {
    require_admin(&principal)?;

    let source = Source {
        id: request.id.clone(),
        kind: request.kind,
        display_name: request.display_name.clone(),
    };
    let pool_size = request.pool_size.unwrap_or(state.config.sqlite_pool_size);
    let checkout_deadline = Duration::from_secs(state.config.query_timeout_secs);

    let adapter = connect_adapter(&source, &request.connection_string, pool_size, checkout_deadline).await?;

    let sealed = setu_vault::seal(&state.vault_key, &request.connection_string)?;
    state.catalog_store.put_source(&source, sealed.as_str()).await?;
    state.sources.register(source.id.clone(), adapter);
    reload_catalog_from_store(&state).await?;

    Ok((
        setu_core::http::StatusCode::CREATED,
        Json(SourceView {
            id: source.id,
            kind: source.kind,
            display_name: source.display_name,
        }),
    )
        .into_response())
}

pub async fn delete_source(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    require_admin(&principal)?;

    state.catalog_store.remove_source(&id).await?;
    state.sources.remove(&id);
    reload_catalog_from_store(&state).await?;

    Ok(setu_core::http::StatusCode::NO_CONTENT.into_response())
}
