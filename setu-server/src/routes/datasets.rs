//! `GET /v1/datasets` (+ per-dataset introspection) and admin dataset CRUD,
//! spec.md §4.2/§4.3/§6.
//!
//! Listing is any authenticated principal's read; writes are admin-only and
//! go through the same reload-from-store path as `routes::sources`.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use setu_catalog::{Dataset, ValueType};
use setu_security::Principal;

use crate::catalog_admin::reload_catalog_from_store;
use crate::error::GatewayError;
use crate::state::AppState;

fn require_admin(principal: &Principal) -> Result<(), GatewayError> {
    if principal.role.is_admin() {
        Ok(())
    } else {
        Err(GatewayError(setu_core::AppError::Forbidden(
            "dataset management requires the admin role".to_string(),
        )))
    }
}

#[derive(Debug, Serialize)]
struct DimensionView {
    name: String,
    value_type: ValueType,
    label: Option<String>,
}

#[derive(Debug, Serialize)]
struct MetricView {
    name: String,
    format: Option<String>,
}

#[derive(Debug, Serialize)]
struct DatasetView {
    id: String,
    source_id: String,
    dimensions: Vec<DimensionView>,
    metrics: Vec<MetricView>,
    has_rls: bool,
}

impl From<&Dataset> for DatasetView {
    fn from(dataset: &Dataset) -> Self {
        DatasetView {
            id: dataset.id.clone(),
            source_id: dataset.source_id.clone(),
            dimensions: dataset
                .dimensions
                .iter()
                .map(|d| DimensionView {
                    name: d.name.clone(),
                    value_type: d.value_type,
                    label: d.label.clone(),
                })
                .collect(),
            metrics: dataset
                .metrics
                .iter()
                .map(|m| MetricView {
                    name: m.name.clone(),
                    format: m.format.clone(),
                })
                .collect(),
            has_rls: dataset.rls.is_some(),
        }
    }
}

pub async fn list_datasets(State(state): State<AppState>, _principal: Principal) -> Result<Response, GatewayError> {
    let snapshot = state.catalog.current().await;
    let views: Vec<DatasetView> = snapshot.datasets().map(DatasetView::from).collect();
    Ok(Json(views).into_response())
}

pub async fn get_dataset(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    let snapshot = state.catalog.current().await;
    let dataset = snapshot.dataset(&id)?;
    Ok(Json(DatasetView::from(dataset)).into_response())
}

pub async fn create_dataset(
    State(state): State<AppState>,
    principal: Principal,
    Json(dataset): Json<Dataset>,
) -> Result<Response, GatewayError> {
    require_admin(&principal)?;
    dataset.validate()?;
    state.catalog_store.put_dataset(&dataset).await?;
    reload_catalog_from_store(&state).await?;
    Ok((setu_core::http::StatusCode::CREATED, Json(DatasetView::from(&dataset))).into_response())
}

pub async fn delete_dataset(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Response, GatewayError> {
    require_admin(&principal)?;
    state.catalog_store.remove_dataset(&id).await?;
    reload_catalog_from_store(&state).await?;
    Ok(setu_core::http::StatusCode::NO_CONTENT.into_response())
}
