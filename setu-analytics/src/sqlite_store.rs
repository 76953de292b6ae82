//! SQLite-backed [`AnalyticsStore`], spec.md §9's pick for the "embedded
//! analytical store" the spec leaves as an interface. Plain `sqlx::SqlitePool`
//! rather than the `sqlx::any` pool `setu-sources` uses for warehouses — this
//! store owns its schema and never needs to be dialect-generic.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::AnalyticsError;
use crate::model::{AnalyticsQuery, QueryRecord};
use crate::store::AnalyticsStore;

pub struct SqliteAnalyticsStore {
    pool: SqlitePool,
}

impl SqliteAnalyticsStore {
    pub async fn connect(dsn: &str, pool_size: u32) -> Result<Self, AnalyticsError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .connect(dsn)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), AnalyticsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS query_records (
                id          TEXT PRIMARY KEY,
                dataset     TEXT NOT NULL,
                tenant      TEXT NOT NULL,
                dimensions  TEXT NOT NULL,
                metrics     TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                rows        INTEGER NOT NULL,
                cache_hit   INTEGER NOT NULL,
                success     INTEGER NOT NULL,
                error_code  TEXT,
                started_at  TEXT NOT NULL,
                source_ip   TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_query_records_tenant_time \
             ON query_records (tenant, started_at)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<QueryRecord, AnalyticsError> {
    let dimensions: String = row.try_get("dimensions")?;
    let metrics: String = row.try_get("metrics")?;
    let started_at: String = row.try_get("started_at")?;
    Ok(QueryRecord {
        id: row.try_get("id")?,
        dataset: row.try_get("dataset")?,
        tenant: row.try_get("tenant")?,
        dimensions: serde_json::from_str(&dimensions).unwrap_or_default(),
        metrics: serde_json::from_str(&metrics).unwrap_or_default(),
        duration_ms: row.try_get("duration_ms")?,
        rows: {
            let rows: i64 = row.try_get("rows")?;
            rows as u64
        },
        cache_hit: row.try_get::<i64, _>("cache_hit")? != 0,
        success: row.try_get::<i64, _>("success")? != 0,
        error_code: row.try_get("error_code")?,
        started_at: DateTime::parse_from_rfc3339(&started_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        source_ip: row.try_get("source_ip")?,
    })
}

#[async_trait::async_trait]
impl AnalyticsStore for SqliteAnalyticsStore {
    async fn record_batch(&self, records: &[QueryRecord]) -> Result<(), AnalyticsError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for record in records {
            let dimensions = serde_json::to_string(&record.dimensions).unwrap_or_default();
            let metrics = serde_json::to_string(&record.metrics).unwrap_or_default();
            sqlx::query(
                "INSERT OR REPLACE INTO query_records \
                 (id, dataset, tenant, dimensions, metrics, duration_ms, rows, \
                  cache_hit, success, error_code, started_at, source_ip) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.id)
            .bind(&record.dataset)
            .bind(&record.tenant)
            .bind(dimensions)
            .bind(metrics)
            .bind(record.duration_ms)
            .bind(record.rows as i64)
            .bind(record.cache_hit as i64)
            .bind(record.success as i64)
            .bind(&record.error_code)
            .bind(record.started_at.to_rfc3339())
            .bind(&record.source_ip)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn query_range(&self, query: &AnalyticsQuery) -> Result<Vec<QueryRecord>, AnalyticsError> {
        let mut sql = String::from("SELECT * FROM query_records WHERE 1=1");
        if query.tenant.is_some() {
            sql.push_str(" AND tenant = ?");
        }
        if query.dataset.is_some() {
            sql.push_str(" AND dataset = ?");
        }
        if query.since.is_some() {
            sql.push_str(" AND started_at >= ?");
        }
        if query.until.is_some() {
            sql.push_str(" AND started_at <= ?");
        }
        sql.push_str(" ORDER BY started_at DESC LIMIT ?");

        let mut built = sqlx::query(&sql);
        if let Some(tenant) = &query.tenant {
            built = built.bind(tenant);
        }
        if let Some(dataset) = &query.dataset {
            built = built.bind(dataset);
        }
        if let Some(since) = &query.since {
            built = built.bind(since.to_rfc3339());
        }
        if let Some(until) = &query.until {
            built = built.bind(until.to_rfc3339());
        }
        built = built.bind(query.limit);

        let rows = built.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_record).collect()
    }

    async fn compact_before(&self, before: DateTime<Utc>) -> Result<u64, AnalyticsError> {
        let result = sqlx::query("DELETE FROM query_records WHERE started_at < ?")
            .bind(before.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
