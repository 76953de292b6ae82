//! Application state: every dependency a route handler needs, bundled into
//! one cheap-to-clone struct the way `r2e-core`'s generated `AppState`
//! bundles a controller's injected services. Every field is already an
//! `Arc`/handle-style type from its owning crate, so `Clone` is shallow.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use chrono::{DateTime, Utc};
use serde::Serialize;

use setu_analytics::{AnalyticsRecorder, AnalyticsStore};
use setu_batch::BatchOrchestrator;
use setu_cache::{ResultCache, SingleFlightGroup};
use setu_catalog::{CatalogHandle, CatalogStore};
use setu_compiler::Fingerprint;
use setu_executor::QueryExecutor;
use setu_rate_limit::RateLimitRegistry;
use setu_security::ApiKeyStore;
use setu_sources::{QueryResult, SourcePoolRegistry};
use setu_vault::VaultKey;

use crate::config::GatewayConfig;

/// A cached query result plus the metadata `stats.cached`/`stats.cached_at`
/// needs, per spec.md §8's byte-equal-modulo-stats cache hit property.
#[derive(Debug, Clone, Serialize)]
pub struct CachedResult {
    pub result: QueryResult,
    pub cached_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogHandle,
    pub catalog_store: Arc<CatalogStore>,
    pub api_keys: ApiKeyStore,
    pub rate_limits: RateLimitRegistry,
    pub vault_key: Arc<VaultKey>,
    pub sources: SourcePoolRegistry,
    pub executor: Arc<QueryExecutor>,
    pub result_cache: Arc<ResultCache<Fingerprint, CachedResult>>,
    pub single_flight: Arc<SingleFlightGroup<Fingerprint>>,
    pub analytics: AnalyticsRecorder,
    pub analytics_store: Arc<dyn AnalyticsStore>,
    pub batch_orchestrator: Arc<BatchOrchestrator>,
    pub config: Arc<GatewayConfig>,
}

impl AppState {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.config.query_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.config.batch_deadline_secs)
    }
}

impl FromRef<AppState> for ApiKeyStore {
    fn from_ref(state: &AppState) -> Self {
        state.api_keys.clone()
    }
}

impl FromRef<AppState> for RateLimitRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.rate_limits.clone()
    }
}
