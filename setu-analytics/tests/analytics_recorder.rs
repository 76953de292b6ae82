//! spec.md §4.12: buffered single-writer recording, tenant-scoped reads,
//! and retention compaction.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use setu_analytics::{AnalyticsQuery, AnalyticsStore, QueryRecord, SqliteAnalyticsStore};

fn record(id: &str, tenant: &str, dataset: &str) -> QueryRecord {
    QueryRecord {
        id: id.to_string(),
        dataset: dataset.to_string(),
        tenant: tenant.to_string(),
        dimensions: vec!["region".into()],
        metrics: vec!["revenue".into()],
        duration_ms: 42,
        rows: 10,
        cache_hit: false,
        success: true,
        error_code: None,
        started_at: Utc::now(),
        source_ip: "127.0.0.1".into(),
    }
}

#[tokio::test]
async fn query_range_scopes_by_tenant() {
    let store = SqliteAnalyticsStore::connect("sqlite::memory:", 1).await.unwrap();
    store
        .record_batch(&[record("q1", "acme", "orders"), record("q2", "globex", "orders")])
        .await
        .unwrap();

    let acme_only = store
        .query_range(&AnalyticsQuery {
            tenant: Some("acme".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(acme_only.len(), 1);
    assert_eq!(acme_only[0].id, "q1");
}

#[tokio::test]
async fn compact_before_removes_old_records() {
    let store = SqliteAnalyticsStore::connect("sqlite::memory:", 1).await.unwrap();
    let mut old = record("old", "acme", "orders");
    old.started_at = Utc::now() - ChronoDuration::days(30);
    store.record_batch(&[old, record("new", "acme", "orders")]).await.unwrap();

    let deleted = store.compact_before(Utc::now() - ChronoDuration::days(1)).await.unwrap();
    assert_eq!(deleted, 1);

    let remaining = store.query_range(&AnalyticsQuery::default()).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, "new");
}

#[tokio::test]
async fn recorder_flushes_buffered_records_on_interval() {
    let store: Arc<dyn AnalyticsStore> =
        Arc::new(SqliteAnalyticsStore::connect("sqlite::memory:", 1).await.unwrap());
    let (recorder, _handle) = setu_analytics::spawn(Arc::clone(&store), 64, Duration::from_millis(20), 100);

    recorder.record(record("a", "acme", "orders"));
    recorder.record(record("b", "acme", "orders"));

    tokio::time::sleep(Duration::from_millis(100)).await;

    let rows = store.query_range(&AnalyticsQuery::default()).await.unwrap();
    assert_eq!(rows.len(), 2);
}
