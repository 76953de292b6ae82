//! Pool-backed adapter for the three sqlx-native kinds (Postgres, MySQL,
//! SQLite) plus the wire-compatible kinds that ride the Postgres driver
//! (CockroachDB, Redshift). Built on `sqlx::any` so one adapter body serves
//! every backend sqlx understands, decoding each column positionally
//! against `ExecRequest::expected_columns` rather than sqlx's own row
//! reflection — the canonical type is a catalog property, not a driver one.

use std::sync::Once;
use std::time::Duration;

use serde_json::Value as JsonValue;
use sqlx::any::{AnyPool, AnyPoolOptions, AnyRow};
use sqlx::{Column, Row};

use setu_catalog::SourceKind;
use setu_compiler::{ColumnType, DialectDescriptor};

use crate::adapter::SourceAdapter;
use crate::error::SourceError;
use crate::model::{ExecRequest, PoolStats, QueryResult};

pub struct SqlxAdapter {
    source_id: String,
    kind: SourceKind,
    dialect: DialectDescriptor,
    pool: AnyPool,
    checkout_deadline: Duration,
}

static INSTALL_DRIVERS: Once = Once::new();

impl SqlxAdapter {
    pub async fn connect(
        source_id: impl Into<String>,
        kind: SourceKind,
        dsn: &str,
        pool_size: u32,
        checkout_deadline: Duration,
    ) -> Result<Self, SourceError> {
        INSTALL_DRIVERS.call_once(|| {
            sqlx::any::install_default_drivers();
        });

        let source_id = source_id.into();
        let pool = AnyPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(checkout_deadline)
            .connect(dsn)
            .await
            .map_err(|e| SourceError::ConnectFailed(source_id.clone(), e.to_string()))?;

        Ok(Self {
            source_id,
            kind,
            dialect: setu_compiler::descriptor_for(kind),
            pool,
            checkout_deadline,
        })
    }

    fn bind<'q>(
        &self,
        mut query: sqlx::query::Query<'q, sqlx::any::Any, sqlx::any::AnyArguments<'q>>,
        params: &'q [JsonValue],
    ) -> sqlx::query::Query<'q, sqlx::any::Any, sqlx::any::AnyArguments<'q>> {
        for value in params {
            query = match value {
                JsonValue::Null => query.bind(None::<String>),
                JsonValue::Bool(b) => query.bind(*b),
                JsonValue::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        query.bind(i)
                    } else {
                        query.bind(n.as_f64().unwrap_or(0.0))
                    }
                }
                JsonValue::String(s) => query.bind(s.clone()),
                other => query.bind(other.to_string()),
            };
        }
        query
    }

    fn decode_row(row: &AnyRow, expected: &[setu_compiler::ColumnMeta]) -> Vec<JsonValue> {
        let mut values = Vec::with_capacity(expected.len());
        for (idx, meta) in expected.iter().enumerate() {
            if idx >= row.columns().len() {
                values.push(JsonValue::Null);
                continue;
            }
            let value = match meta.column_type {
                ColumnType::Number => row
                    .try_get::<f64, _>(idx)
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(JsonValue::Number)
                    .unwrap_or(JsonValue::Null),
                ColumnType::Boolean => row
                    .try_get::<bool, _>(idx)
                    .map(JsonValue::Bool)
                    .unwrap_or(JsonValue::Null),
                ColumnType::String | ColumnType::Date | ColumnType::DateTime => row
                    .try_get::<String, _>(idx)
                    .map(JsonValue::String)
                    .unwrap_or(JsonValue::Null),
            };
            values.push(value);
        }
        values
    }

    /// Decode a row with no pre-known column types (`/v1/sql`, raw
    /// statements): try each representation `sqlx::any` can reflect until
    /// one succeeds, falling back to `Null`.
    fn decode_row_dynamic(row: &AnyRow) -> Vec<JsonValue> {
        (0..row.columns().len())
            .map(|idx| {
                if let Ok(v) = row.try_get::<i64, _>(idx) {
                    return JsonValue::Number(v.into());
                }
                if let Ok(v) = row.try_get::<f64, _>(idx) {
                    return serde_json::Number::from_f64(v).map(JsonValue::Number).unwrap_or(JsonValue::Null);
                }
                if let Ok(v) = row.try_get::<bool, _>(idx) {
                    return JsonValue::Bool(v);
                }
                if let Ok(v) = row.try_get::<String, _>(idx) {
                    return JsonValue::String(v);
                }
                JsonValue::Null
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl SourceAdapter for SqlxAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn ping(&self) -> Result<(), SourceError> {
        sqlx::query(self.dialect.ping_query)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| SourceError::Unhealthy(format!("{}: {e}", self.source_id)))
    }

    async fn execute(&self, req: ExecRequest<'_>) -> Result<QueryResult, SourceError> {
        let mut conn = tokio::time::timeout(self.checkout_deadline, self.pool.acquire())
            .await
            .map_err(|_| SourceError::UpstreamBusy(self.source_id.clone()))?
            .map_err(|e| SourceError::ConnectFailed(self.source_id.clone(), e.to_string()))?;

        if let Some(prefix) = self.dialect.statement_timeout_prefix {
            let ms = req.statement_timeout.as_millis();
            let timeout_sql = prefix.replace("{ms}", &ms.to_string());
            sqlx::query(&timeout_sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| SourceError::QueryFailed(self.source_id.clone(), e.to_string()))?;
        }

        let query = self.bind(sqlx::query(req.sql_text), req.bound_params);

        let fetch = async {
            use futures_util::TryStreamExt;
            let mut stream = query.fetch(&mut *conn);
            let mut rows = Vec::new();
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| SourceError::QueryFailed(self.source_id.clone(), e.to_string()))?
            {
                if rows.len() >= req.max_rows {
                    return Err(SourceError::RowLimitExceeded(req.max_rows));
                }
                rows.push(Self::decode_row(&row, req.expected_columns));
            }
            Ok(rows)
        };

        let rows = tokio::time::timeout(req.statement_timeout, fetch)
            .await
            .map_err(|_| SourceError::UpstreamBusy(self.source_id.clone()))??;

        Ok(QueryResult {
            columns: req.expected_columns.to_vec(),
            rows,
            truncated: false,
        })
    }

    async fn execute_raw(&self, req: crate::model::RawExecRequest<'_>) -> Result<QueryResult, SourceError> {
        let mut conn = tokio::time::timeout(self.checkout_deadline, self.pool.acquire())
            .await
            .map_err(|_| SourceError::UpstreamBusy(self.source_id.clone()))?
            .map_err(|e| SourceError::ConnectFailed(self.source_id.clone(), e.to_string()))?;

        if let Some(prefix) = self.dialect.statement_timeout_prefix {
            let ms = req.statement_timeout.as_millis();
            let timeout_sql = prefix.replace("{ms}", &ms.to_string());
            sqlx::query(&timeout_sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| SourceError::QueryFailed(self.source_id.clone(), e.to_string()))?;
        }

        let query = self.bind(sqlx::query(req.sql_text), req.bound_params);

        let fetch = async {
            use futures_util::TryStreamExt;
            let mut stream = query.fetch(&mut *conn);
            let mut columns: Option<Vec<setu_compiler::ColumnMeta>> = None;
            let mut rows = Vec::new();
            while let Some(row) = stream
                .try_next()
                .await
                .map_err(|e| SourceError::QueryFailed(self.source_id.clone(), e.to_string()))?
            {
                if columns.is_none() {
                    columns = Some(
                        row.columns()
                            .iter()
                            .map(|c| setu_compiler::ColumnMeta {
                                name: c.name().to_string(),
                                column_type: ColumnType::String,
                            })
                            .collect(),
                    );
                }
                if rows.len() >= req.max_rows {
                    return Err(SourceError::RowLimitExceeded(req.max_rows));
                }
                rows.push(Self::decode_row_dynamic(&row));
            }
            Ok((columns.unwrap_or_default(), rows))
        };

        let (columns, rows) = tokio::time::timeout(req.statement_timeout, fetch)
            .await
            .map_err(|_| SourceError::UpstreamBusy(self.source_id.clone()))??;

        Ok(QueryResult { columns, rows, truncated: false })
    }

    fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
        }
    }

    fn supports_sessions(&self) -> bool {
        true
    }
}
