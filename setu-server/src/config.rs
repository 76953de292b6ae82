//! Gateway configuration section, hand-implemented against
//! `setu_core::config::ConfigProperties` (no derive macro exists in this
//! workspace — every other `ConfigProperties` implementor in the teacher's
//! own tree is also hand-written, see `setu-core/src/config/typed.rs`'s doc
//! example being illustrative rather than load-bearing here).
//!
//! Maps every spec.md §6 configuration item except the vault key (which
//! `setu_vault::VaultConfig::from_env` loads directly — SPEC_FULL.md §2.3
//! notes it must never round-trip through a config dump) onto one
//! `setu.*`-prefixed section.

use setu_catalog::GuardConfig;
use setu_core::config::{ConfigError, ConfigProperties, PropertyMeta, SetuConfig};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_host: String,
    pub listen_port: u16,

    pub catalog_store_dsn: String,
    pub analytics_store_dsn: String,
    pub sqlite_pool_size: u32,

    pub query_timeout_secs: u64,
    pub batch_deadline_secs: u64,
    pub batch_default_max_parallel: usize,

    pub cache_ttl_secs: u64,
    pub cache_max_bytes: usize,

    pub stream_default_chunk_size: usize,
    pub stream_progress_interval: u64,
    pub stream_max_rows: Option<u64>,

    pub analytics_channel_capacity: usize,
    pub analytics_flush_interval_secs: u64,
    pub analytics_flush_batch_size: usize,
    pub analytics_retention_days: u64,

    pub rate_limit_default_max: u64,
    pub rate_limit_default_window_secs: u64,

    pub guards: GuardConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8080,
            catalog_store_dsn: "sqlite://setu-catalog.db".to_string(),
            analytics_store_dsn: "sqlite://setu-analytics.db".to_string(),
            sqlite_pool_size: 5,
            query_timeout_secs: 30,
            batch_deadline_secs: 120,
            batch_default_max_parallel: 4,
            cache_ttl_secs: 60,
            cache_max_bytes: 64 * 1024 * 1024,
            stream_default_chunk_size: 1000,
            stream_progress_interval: 5,
            stream_max_rows: None,
            analytics_channel_capacity: 4096,
            analytics_flush_interval_secs: 5,
            analytics_flush_batch_size: 200,
            analytics_retention_days: 30,
            rate_limit_default_max: 100,
            rate_limit_default_window_secs: 60,
            guards: GuardConfig::default(),
        }
    }
}

impl ConfigProperties for GatewayConfig {
    fn prefix() -> &'static str {
        "setu"
    }

    fn properties_metadata() -> Vec<PropertyMeta> {
        // Metadata is advisory (surfaced by `setu_core::config::registry` for
        // introspection/validation tooling); kept minimal rather than
        // exhaustive since nothing here is `#[config(required)]`.
        vec![PropertyMeta {
            key: "listen.port".to_string(),
            full_key: "setu.listen.port".to_string(),
            type_name: "i64",
            required: false,
            default_value: Some("8080".to_string()),
            description: Some("HTTP listen port".to_string()),
        }]
    }

    fn from_config(config: &SetuConfig) -> Result<Self, ConfigError> {
        let default = GatewayConfig::default();
        Ok(GatewayConfig {
            listen_host: config.get_or("setu.listen.host", default.listen_host),
            listen_port: config.get_or::<i64>("setu.listen.port", default.listen_port as i64) as u16,
            catalog_store_dsn: config.get_or("setu.catalog.store_dsn", default.catalog_store_dsn),
            analytics_store_dsn: config.get_or("setu.analytics.store_dsn", default.analytics_store_dsn),
            sqlite_pool_size: config.get_or::<i64>("setu.sqlite.pool_size", default.sqlite_pool_size as i64) as u32,
            query_timeout_secs: config.get_or::<i64>("setu.query.timeout_secs", default.query_timeout_secs as i64) as u64,
            batch_deadline_secs: config.get_or::<i64>("setu.batch.deadline_secs", default.batch_deadline_secs as i64) as u64,
            batch_default_max_parallel: config
                .get_or::<i64>("setu.batch.default_max_parallel", default.batch_default_max_parallel as i64)
                as usize,
            cache_ttl_secs: config.get_or::<i64>("setu.cache.ttl_secs", default.cache_ttl_secs as i64) as u64,
            cache_max_bytes: config.get_or::<i64>("setu.cache.max_bytes", default.cache_max_bytes as i64) as usize,
            stream_default_chunk_size: config
                .get_or::<i64>("setu.stream.default_chunk_size", default.stream_default_chunk_size as i64)
                as usize,
            stream_progress_interval: config
                .get_or::<i64>("setu.stream.progress_interval", default.stream_progress_interval as i64)
                as u64,
            stream_max_rows: config.get::<i64>("setu.stream.max_rows").ok().map(|v| v as u64),
            analytics_channel_capacity: config
                .get_or::<i64>("setu.analytics.channel_capacity", default.analytics_channel_capacity as i64)
                as usize,
            analytics_flush_interval_secs: config
                .get_or::<i64>("setu.analytics.flush_interval_secs", default.analytics_flush_interval_secs as i64)
                as u64,
            analytics_flush_batch_size: config
                .get_or::<i64>("setu.analytics.flush_batch_size", default.analytics_flush_batch_size as i64)
                as usize,
            analytics_retention_days: config
                .get_or::<i64>("setu.analytics.retention_days", default.analytics_retention_days as i64)
                as u64,
            rate_limit_default_max: config
                .get_or::<i64>("setu.rate_limit.default_max", default.rate_limit_default_max as i64)
                as u64,
            rate_limit_default_window_secs: config
                .get_or::<i64>(
                    "setu.rate_limit.default_window_secs",
                    default.rate_limit_default_window_secs as i64,
                ) as u64,
            guards: GuardConfig {
                max_dimensions: config.get_or::<i64>("setu.guards.max_dimensions", default.guards.max_dimensions as i64) as usize,
                max_metrics: config.get_or::<i64>("setu.guards.max_metrics", default.guards.max_metrics as i64) as usize,
                max_filters: config.get_or::<i64>("setu.guards.max_filters", default.guards.max_filters as i64) as usize,
                max_filter_depth: config
                    .get_or::<i64>("setu.guards.max_filter_depth", default.guards.max_filter_depth as i64)
                    as usize,
                max_rows: config.get_or::<i64>("setu.guards.max_rows", default.guards.max_rows as i64) as u64,
            },
        })
    }
}
