use chrono::{DateTime, Utc};

use crate::error::AnalyticsError;
use crate::model::{AnalyticsQuery, QueryRecord};

/// Narrow interface the recorder and the readout handlers talk to, so the
/// embedded engine behind it (SQLite today) can be swapped per spec.md §9's
/// open question without touching either side.
#[async_trait::async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Append a batch of records in one write. Called by the single
    /// background writer task only — never concurrently.
    async fn record_batch(&self, records: &[QueryRecord]) -> Result<(), AnalyticsError>;

    /// Tenant-scoped (or, for an admin caller, cross-tenant) range read.
    async fn query_range(&self, query: &AnalyticsQuery) -> Result<Vec<QueryRecord>, AnalyticsError>;

    /// Delete every record older than `before`. Returns the number removed.
    async fn compact_before(&self, before: DateTime<Utc>) -> Result<u64, AnalyticsError>;
}
