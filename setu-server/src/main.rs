//! Entrypoint: load config, connect every dependency, build the router,
//! serve. Composed by hand rather than through `quarlus_core`'s
//! `AppBuilder`/controller-registration DI — see DESIGN.md for why; the
//! pieces it would wire (tracing init, CORS, trace layer, panic catch) are
//! still the teacher's own `setu_core::layers` free functions.

mod catalog_admin;
mod config;
mod error;
mod ids;
mod routes;
mod state;
mod util;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use setu_analytics::SqliteAnalyticsStore;
use setu_batch::{BatchConfig, BatchOrchestrator};
use setu_cache::{ResultCache, SingleFlightGroup, Sweepable};
use setu_catalog::{CatalogBuilder, CatalogHandle, CatalogStore};
use setu_core::layers::{catch_panic_layer, default_cors, default_trace, init_tracing};
use setu_executor::{ExecutorConfig, QueryExecutor};
use setu_rate_limit::{InMemoryRateLimiter, RateLimitRegistry};
use setu_scheduler::{Scheduler, SchedulerConfig};
use setu_security::ApiKeyStore;
use setu_sources::SourcePoolRegistry;
use setu_vault::VaultConfig;

use crate::catalog_admin::connect_adapter;
use crate::config::GatewayConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let profile = std::env::var("SETU_PROFILE").unwrap_or_else(|_| "dev".to_string());
    let config = setu_core::config::SetuConfig::load(&profile)?.with_typed::<GatewayConfig>()?;
    let config: Arc<GatewayConfig> = Arc::new((*config).clone());

    let vault_key = Arc::new(VaultConfig::from_env()?.key().clone());

    let catalog_store = Arc::new(CatalogStore::connect(&config.catalog_store_dsn, config.sqlite_pool_size).await?);
    let (stored_sources, datasets) = catalog_store.load_all().await?;

    let sources = SourcePoolRegistry::new();
    let mut builder = CatalogBuilder::new();
    for stored in &stored_sources {
        let secret = setu_vault::unseal(&vault_key, &setu_vault::EncryptedBlob::new(stored.encrypted_credential.clone()))?;
        let adapter = connect_adapter(
            &stored.source,
            secret.reveal(),
            config.sqlite_pool_size,
            Duration::from_secs(config.query_timeout_secs),
        )
        .await?;
        sources.register(stored.source.id.clone(), adapter);
        builder = builder.with_source(stored.source.clone());
    }
    for dataset in datasets {
        builder = builder.with_dataset(dataset);
    }
    let snapshot = builder.build(1)?;
    let catalog = CatalogHandle::new(snapshot);

    let api_keys = ApiKeyStore::new();
    let rate_limits = RateLimitRegistry::new(InMemoryRateLimiter::new());

    let executor = Arc::new(QueryExecutor::new(sources.clone(), ExecutorConfig::default()));
    let batch_orchestrator = Arc::new(BatchOrchestrator::new(
        catalog.clone(),
        executor.clone(),
        BatchConfig {
            default_max_parallel: config.batch_default_max_parallel,
            max_rows: config.guards.max_rows as usize,
            query_timeout: Duration::from_secs(config.query_timeout_secs),
            batch_deadline: Duration::from_secs(config.batch_deadline_secs),
            guards: config.guards.clone(),
        },
    ));

    let result_cache = Arc::new(ResultCache::new(
        Duration::from_secs(config.cache_ttl_secs),
        config.cache_max_bytes,
    ));
    let single_flight = Arc::new(SingleFlightGroup::new());

    let analytics_store: Arc<dyn setu_analytics::AnalyticsStore> = Arc::new(
        SqliteAnalyticsStore::connect(&config.analytics_store_dsn, config.sqlite_pool_size).await?,
    );
    let (analytics, _analytics_writer) = setu_analytics::spawn(
        analytics_store.clone(),
        config.analytics_channel_capacity,
        Duration::from_secs(config.analytics_flush_interval_secs),
        config.analytics_flush_batch_size,
    );

    let scheduler = Scheduler::new();
    let _cache_sweep = scheduler.spawn_cache_sweep(
        vec![result_cache.clone() as Arc<dyn Sweepable>],
        SchedulerConfig::default().cache_sweep_interval,
    );
    let _analytics_compaction = scheduler.spawn_analytics_compaction(
        analytics_store.clone(),
        SchedulerConfig::default().analytics_compaction_interval,
        Duration::from_secs(config.analytics_retention_days * 24 * 3600),
    );
    let _pool_health = scheduler.spawn_pool_health(sources.clone(), SchedulerConfig::default().pool_health_interval);

    let state = AppState {
        catalog,
        catalog_store,
        api_keys,
        rate_limits,
        vault_key,
        sources,
        executor,
        result_cache,
        single_flight,
        analytics,
        analytics_store,
        batch_orchestrator,
        config,
    };

    let app: Router = routes::router()
        .layer(default_trace())
        .layer(default_cors())
        .layer(catch_panic_layer())
        .with_state(state.clone());

    let addr = format!("{}:{}", state.config.listen_host, state.config.listen_port);
    tracing::info!(%addr, "starting setu-server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    tracing::info!("setu-server stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl-C or SIGTERM on Unix), the same
/// combinator `quarlus_core`'s own `AppBuilder::serve` selects on.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to listen for Ctrl-C");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, starting graceful shutdown");
}
