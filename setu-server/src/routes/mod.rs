//! Route table, spec.md §6 "HTTP API (stable surface)". One module per
//! surface area, composed into a single `Router<AppState>` here the way the
//! teacher's own top-level router wires its controllers.

mod analytics;
mod batch;
mod cache;
mod datasets;
mod health;
mod query;
mod sources;
mod sql;
mod stream;
mod stubs;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/health", get(health::health))
        .route("/v1/query", post(query::query))
        .route("/v1/sql", post(sql::sql))
        .route("/v1/nlq", post(stubs::nlq))
        .route("/v1/stream", post(stream::stream))
        .route("/v1/stream/ws", get(stream::stream_ws))
        .route("/v1/batch", post(batch::batch))
        .route("/v1/graphql", post(stubs::graphql))
        .route("/v1/odata/{*path}", get(stubs::odata))
        .route("/v1/tableau/wdc", get(stubs::tableau_wdc))
        .route("/v1/sources", get(sources::list_sources).post(sources::create_source))
        .route("/v1/sources/{id}", delete(sources::delete_source))
        .route("/v1/datasets", get(datasets::list_datasets).post(datasets::create_dataset))
        .route("/v1/datasets/{id}", get(datasets::get_dataset).delete(datasets::delete_dataset))
        .route("/v1/introspection/datasets", get(datasets::list_datasets))
        .route("/v1/introspection/datasets/{id}", get(datasets::get_dataset))
        .route("/admin/cache/clear", post(cache::clear_cache))
        .route("/v1/analytics", get(analytics::analytics))
        .route("/v1/analytics/recent-queries", get(analytics::recent_queries))
}
