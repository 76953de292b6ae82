use setu_catalog::SourceKind;

use crate::error::SourceError;
use crate::model::{ExecRequest, PoolStats, QueryResult, RawExecRequest};

/// One registered upstream connection. Generalizes `r2e-data-sqlx`'s
/// `HasPool`/`Tx` pair into a uniform surface covering both the three
/// sqlx-native kinds and the HTTP-driven warehouses (spec.md §4.7).
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Cheap liveness probe using the dialect's ping idiom. Called on
    /// checkout by pool-backed adapters; a failure means the connection (or
    /// endpoint) is discarded/replaced rather than reused.
    async fn ping(&self) -> Result<(), SourceError>;

    /// Execute `req.sql_text` with `req.bound_params`, honoring the
    /// statement timeout and aborting with `RowLimitExceeded` if the result
    /// would exceed `req.max_rows`.
    async fn execute(&self, req: ExecRequest<'_>) -> Result<QueryResult, SourceError>;

    /// Execute caller-supplied SQL whose column shape isn't known ahead of
    /// time (spec.md §4.5, `/v1/sql`). Adapters that can't reflect native
    /// row column names/values generically return `RawSqlUnsupported`.
    async fn execute_raw(&self, _req: RawExecRequest<'_>) -> Result<QueryResult, SourceError> {
        Err(SourceError::RawSqlUnsupported("this adapter".to_string()))
    }

    fn pool_stats(&self) -> PoolStats;

    /// Whether this adapter can hold one connection/session across several
    /// `execute` calls — a prerequisite for `batch.transaction=true`
    /// (spec.md §4.11). Pool-backed sqlx adapters can in principle; the
    /// HTTP-driven warehouse adapters submit each statement as an
    /// independent request and cannot.
    fn supports_sessions(&self) -> bool {
        false
    }
}
