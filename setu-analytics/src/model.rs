use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit row for a single terminal request, spec.md §4 Data Model.
/// Append-only: nothing ever updates a written record, only
/// [`crate::AnalyticsStore::compact_before`] removes old ones.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRecord {
    pub id: String,
    pub dataset: String,
    pub tenant: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub duration_ms: i64,
    pub rows: u64,
    pub cache_hit: bool,
    pub success: bool,
    pub error_code: Option<String>,
    pub started_at: DateTime<Utc>,
    pub source_ip: String,
}

/// Range filter for the analytics readout endpoints (spec.md §6
/// `GET /v1/analytics`, `/v1/analytics/recent-queries`).
///
/// `tenant` is `None` only for an admin identity reading across every
/// tenant; a non-admin caller always has it set by the handler before the
/// query reaches the store.
#[derive(Debug, Clone)]
pub struct AnalyticsQuery {
    pub tenant: Option<String>,
    pub dataset: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: u32,
}

impl Default for AnalyticsQuery {
    fn default() -> Self {
        Self {
            tenant: None,
            dataset: None,
            since: None,
            until: None,
            limit: 100,
        }
    }
}
