//! `GET /v1/health` — spec.md §6: `{status, version, dependencies:{cache,store}}`.
//! Unauthenticated, per spec.md §6's authentication section.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum DependencyStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
struct Dependencies {
    cache: DependencyStatus,
    store: DependencyStatus,
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: DependencyStatus,
    version: &'static str,
    dependencies: Dependencies,
}

pub async fn health(State(state): State<AppState>) -> Response {
    // In-process concurrent map; reachable whenever this handler runs at all.
    let cache = DependencyStatus::Up;

    let store = match state.catalog_store.load_all().await {
        Ok(_) => DependencyStatus::Up,
        Err(err) => {
            tracing::warn!(error = %err, "catalog store health probe failed");
            DependencyStatus::Down
        }
    };

    let status = if matches!(store, DependencyStatus::Up) {
        DependencyStatus::Up
    } else {
        DependencyStatus::Down
    };
    let http_status = if matches!(status, DependencyStatus::Up) {
        setu_core::http::StatusCode::OK
    } else {
        setu_core::http::StatusCode::SERVICE_UNAVAILABLE
    };

    (
        http_status,
        Json(HealthBody {
            status,
            version: env!("CARGO_PKG_VERSION"),
            dependencies: Dependencies { cache, store },
        }),
    )
        .into_response()
}
