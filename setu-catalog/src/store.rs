//! Persistence for the catalog and its encrypted source credentials.
//!
//! spec.md §6 configuration notes: "Catalog and sources persisted to a
//! local embedded store whose schema includes the encrypted credential
//! blob." Catalog *authoring* (a YAML-like DSL) is an explicit external
//! collaborator (spec.md §1 Out of scope); this store only persists the
//! already-validated `Source`/`Dataset` records `/v1/sources` writes, the
//! same SQLite-via-sqlx pattern `setu-analytics::SqliteAnalyticsStore` uses
//! for its own embedded store.

use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::error::CatalogError;
use crate::model::{Dataset, Source, SourceKind};

impl From<sqlx::Error> for CatalogError {
    fn from(err: sqlx::Error) -> Self {
        CatalogError::Storage(err.to_string())
    }
}

/// A [`Source`] as persisted, paired with its encrypted connection blob
/// (opaque here — `setu-vault` owns sealing/unsealing it).
pub struct StoredSource {
    pub source: Source,
    pub encrypted_credential: String,
}

pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub async fn connect(dsn: &str, pool_size: u32) -> Result<Self, CatalogError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .connect(dsn)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), CatalogError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_sources (
                id                   TEXT PRIMARY KEY,
                kind                 TEXT NOT NULL,
                display_name         TEXT,
                encrypted_credential TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS catalog_datasets (
                id        TEXT PRIMARY KEY,
                source_id TEXT NOT NULL,
                body      TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn put_source(&self, source: &Source, encrypted_credential: &str) -> Result<(), CatalogError> {
        let kind = serde_json::to_value(source.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        sqlx::query(
            "INSERT INTO catalog_sources (id, kind, display_name, encrypted_credential) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET kind = excluded.kind, \
                display_name = excluded.display_name, \
                encrypted_credential = excluded.encrypted_credential",
        )
        .bind(&source.id)
        .bind(kind)
        .bind(&source.display_name)
        .bind(encrypted_credential)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_source(&self, id: &str) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM catalog_datasets WHERE source_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM catalog_sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn put_dataset(&self, dataset: &Dataset) -> Result<(), CatalogError> {
        let body = serde_json::to_string(dataset)
            .map_err(|e| CatalogError::Storage(e.to_string()))?;
        sqlx::query(
            "INSERT INTO catalog_datasets (id, source_id, body) VALUES (?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET source_id = excluded.source_id, body = excluded.body",
        )
        .bind(&dataset.id)
        .bind(&dataset.source_id)
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn remove_dataset(&self, id: &str) -> Result<(), CatalogError> {
        sqlx::query("DELETE FROM catalog_datasets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Load every persisted source (with its still-encrypted credential
    /// blob) and dataset. Callers assemble these into a [`crate::CatalogBuilder`]
    /// and `unseal` credentials into live `SourceAdapter`s as needed.
    pub async fn load_all(&self) -> Result<(Vec<StoredSource>, Vec<Dataset>), CatalogError> {
        let source_rows = sqlx::query("SELECT id, kind, display_name, encrypted_credential FROM catalog_sources")
            .fetch_all(&self.pool)
            .await?;
        let mut sources = Vec::with_capacity(source_rows.len());
        for row in source_rows {
            let kind_str: String = row.try_get("kind")?;
            let kind: SourceKind = serde_json::from_value(JsonValue::String(kind_str))
                .map_err(|e| CatalogError::Storage(e.to_string()))?;
            sources.push(StoredSource {
                source: Source {
                    id: row.try_get("id")?,
                    kind,
                    display_name: row.try_get("display_name")?,
                },
                encrypted_credential: row.try_get("encrypted_credential")?,
            });
        }

        let dataset_rows = sqlx::query("SELECT body FROM catalog_datasets")
            .fetch_all(&self.pool)
            .await?;
        let mut datasets = Vec::with_capacity(dataset_rows.len());
        for row in dataset_rows {
            let body: String = row.try_get("body")?;
            datasets.push(serde_json::from_str(&body).map_err(|e| CatalogError::Storage(e.to_string()))?);
        }

        Ok((sources, datasets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;

    fn sample_source() -> Source {
        Source {
            id: "warehouse-1".into(),
            kind: SourceKind::Postgres,
            display_name: Some("Primary warehouse".into()),
        }
    }

    fn sample_dataset() -> Dataset {
        Dataset {
            id: "orders".into(),
            source_id: "warehouse-1".into(),
            table_expression: "orders".into(),
            dimensions: vec![crate::model::Dimension {
                name: "region".into(),
                expression: "region".into(),
                value_type: ValueType::String,
                label: None,
            }],
            metrics: vec![],
            rls: None,
            time_dimension: None,
            refresh_policy: None,
        }
    }

    #[tokio::test]
    async fn round_trips_sources_and_datasets() {
        let store = CatalogStore::connect("sqlite::memory:", 1).await.unwrap();
        store.put_source(&sample_source(), "cipher-text").await.unwrap();
        store.put_dataset(&sample_dataset()).await.unwrap();

        let (sources, datasets) = store.load_all().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source.id, "warehouse-1");
        assert_eq!(sources[0].encrypted_credential, "cipher-text");
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].id, "orders");
    }

    #[tokio::test]
    async fn remove_source_cascades_datasets() {
        let store = CatalogStore::connect("sqlite::memory:", 1).await.unwrap();
        store.put_source(&sample_source(), "cipher-text").await.unwrap();
        store.put_dataset(&sample_dataset()).await.unwrap();

        store.remove_source("warehouse-1").await.unwrap();
        let (sources, datasets) = store.load_all().await.unwrap();
        assert!(sources.is_empty());
        assert!(datasets.is_empty());
    }
}
