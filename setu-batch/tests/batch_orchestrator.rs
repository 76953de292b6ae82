//! spec.md §8 scenario 7 ("Batch with dep") plus the stop_on_error/skip
//! state machine from §4.11, exercised end to end against a fake adapter.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value as JsonValue};
use tokio_util::sync::CancellationToken;

use setu_batch::{BatchConfig, BatchOrchestrator, BatchRequest, SubQuery, SubQueryStatus};
use setu_catalog::{
    CatalogBuilder, CatalogHandle, Dataset, Dimension, Filter, FilterOp, QueryRequest, Source,
    SourceKind, ValueType,
};
use setu_executor::{ExecutorConfig, QueryExecutor};
use setu_sources::{ExecRequest, PoolStats, QueryResult, SourceAdapter, SourceError, SourcePoolRegistry};

struct FakeAdapter {
    calls: Arc<Mutex<Vec<Vec<JsonValue>>>>,
    rows_per_call: Arc<Mutex<Vec<Vec<Vec<JsonValue>>>>>,
}

#[async_trait::async_trait]
impl SourceAdapter for FakeAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Postgres
    }

    async fn ping(&self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn execute(&self, req: ExecRequest<'_>) -> Result<QueryResult, SourceError> {
        self.calls.lock().unwrap().push(req.bound_params.to_vec());
        let rows = self.rows_per_call.lock().unwrap().remove(0);
        Ok(QueryResult {
            columns: req.expected_columns.to_vec(),
            rows,
            truncated: false,
        })
    }

    fn pool_stats(&self) -> PoolStats {
        PoolStats::default()
    }
}

fn catalog() -> CatalogHandle {
    let source = Source {
        id: "warehouse-1".into(),
        kind: SourceKind::Postgres,
        display_name: None,
    };
    let dataset = Dataset {
        id: "orders".into(),
        source_id: "warehouse-1".into(),
        table_expression: "orders".into(),
        dimensions: vec![Dimension {
            name: "region".into(),
            expression: "region".into(),
            value_type: ValueType::String,
            label: None,
        }],
        metrics: vec![],
        rls: None,
        time_dimension: None,
        refresh_policy: None,
    };
    let snapshot = CatalogBuilder::new()
        .with_source(source)
        .with_dataset(dataset)
        .build(1)
        .unwrap();
    CatalogHandle::new(snapshot)
}

fn sub_query(id: &str, depends_on: &[&str], region_filter: Option<JsonValue>) -> SubQuery {
    let filters = match region_filter {
        Some(value) => vec![Filter {
            field: "region".into(),
            op: FilterOp::Eq,
            value: Some(value),
        }],
        None => vec![],
    };
    SubQuery {
        id: Some(id.to_string()),
        depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
        request: QueryRequest {
            dataset: "orders".into(),
            dimensions: vec!["region".into()],
            metrics: vec![],
            filters,
            order_by: vec![],
            limit: None,
            offset: 0,
        },
    }
}

#[tokio::test]
async fn ref_token_binds_dependency_result_into_downstream_query() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rows_per_call = Arc::new(Mutex::new(vec![
        vec![vec![json!("US")]], // query A's result
        vec![vec![json!("US")]], // query B's result
    ]));
    let adapter = Arc::new(FakeAdapter {
        calls: Arc::clone(&calls),
        rows_per_call,
    });
    let sources = SourcePoolRegistry::new();
    sources.register("warehouse-1", adapter as Arc<dyn SourceAdapter>);
    let executor = Arc::new(QueryExecutor::new(sources, ExecutorConfig::default()));
    let orchestrator = BatchOrchestrator::new(catalog(), executor, BatchConfig::default());

    let request = BatchRequest {
        queries: vec![
            sub_query("A", &[], None),
            sub_query("B", &["A"], Some(json!("$ref:A[0].region"))),
        ],
        parallel: None,
        stop_on_error: false,
        transaction: false,
        include_metadata: false,
    };

    let result = orchestrator
        .run(request, "acme", false, CancellationToken::new())
        .await
        .expect("batch should run");

    assert_eq!(result.results.len(), 2);
    assert!(result.results.iter().all(|o| o.status == SubQueryStatus::Success));

    let second_call_params = &calls.lock().unwrap()[1];
    assert!(second_call_params.contains(&json!("US")));
}

#[tokio::test]
async fn failed_dependency_skips_downstream_query() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let rows_per_call = Arc::new(Mutex::new(vec![vec![vec![json!("US")]]]));
    let adapter = Arc::new(FakeAdapter { calls, rows_per_call });
    let sources = SourcePoolRegistry::new();
    sources.register("warehouse-1", adapter as Arc<dyn SourceAdapter>);
    let executor = Arc::new(QueryExecutor::new(sources, ExecutorConfig::default()));
    let orchestrator = BatchOrchestrator::new(catalog(), executor, BatchConfig::default());

    let request = BatchRequest {
        queries: vec![
            sub_query("A", &[], Some(json!("$ref:missing[0].region"))),
            sub_query("B", &["A"], None),
        ],
        parallel: None,
        stop_on_error: true,
        transaction: false,
        include_metadata: false,
    };

    let result = orchestrator
        .run(request, "acme", false, CancellationToken::new())
        .await
        .expect("batch should run");

    let a = result.results.iter().find(|o| o.id == "A").unwrap();
    let b = result.results.iter().find(|o| o.id == "B").unwrap();
    assert_eq!(a.status, SubQueryStatus::Failed);
    assert_eq!(b.status, SubQueryStatus::Skipped);
}
