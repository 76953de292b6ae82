//! Shared source/dataset admin plumbing used by both `routes::sources` and
//! `routes::datasets`: connecting a `SourceAdapter` for a newly registered
//! source, and rebuilding the live `CatalogSnapshot` from `CatalogStore`
//! after any mutation (there is no incremental `CatalogHandle::add_*`, only
//! whole-snapshot `reload`, so every admin write re-derives the full
//! catalog the same way startup does).

use std::sync::Arc;
use std::time::Duration;

use setu_catalog::{CatalogBuilder, Source};
use setu_sources::{is_sqlx_native, HttpWarehouseAdapter, SourceAdapter, SqlxAdapter};

use crate::error::GatewayError;
use crate::state::AppState;

/// Connect a live adapter for `source` using `secret` (a decrypted DSN or
/// bearer token, depending on `kind`).
pub async fn connect_adapter(
    source: &Source,
    secret: &str,
    pool_size: u32,
    checkout_deadline: Duration,
) -> Result<Arc<dyn SourceAdapter>, setu_sources::SourceError> {
    if is_sqlx_native(source.kind) {
        let adapter = SqlxAdapter::connect(source.id.clone(), source.kind, secret, pool_size, checkout_deadline).await?;
        Ok(Arc::new(adapter))
    } else {
        let endpoint = secret.to_string();
        let adapter = HttpWarehouseAdapter::new(source.id.clone(), source.kind, endpoint, secret, checkout_deadline)?;
        Ok(Arc::new(adapter))
    }
}

/// Re-derive the full `CatalogSnapshot` from `CatalogStore` and swap it in.
/// Every dataset/source write goes through this so the live catalog never
/// drifts from what's persisted.
pub async fn reload_catalog_from_store(state: &AppState) -> Result<(), GatewayError> {
    let (stored_sources, datasets) = state.catalog_store.load_all().await?;

    let mut builder = CatalogBuilder::new();
    for stored in &stored_sources {
        builder = builder.with_source(stored.source.clone());
    }
    for dataset in datasets {
        builder = builder.with_dataset(dataset);
    }

    let next_generation = state.catalog.current().await.generation + 1;
    let snapshot = builder.build(next_generation)?;
    state.catalog.reload(snapshot).await;
    Ok(())
}
