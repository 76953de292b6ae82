//! Batch DAG walk, spec.md §4.11. Groups are executed strictly in
//! topological order; within a group, sub-queries run concurrently bounded
//! by `batch.max_parallel`. `$ref` tokens in a sub-query's filter values
//! are resolved against already-finished (earlier-group) outcomes before
//! compiling it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use setu_catalog::{CatalogHandle, GuardConfig};
use setu_compiler::TenantContext;
use setu_executor::QueryExecutor;

use crate::dag::{assign_ids, topological_groups};
use crate::error::BatchError;
use crate::model::{BatchRequest, BatchResult, SubQuery, SubQueryOutcome, SubQueryStatus};
use crate::refs::resolve_value;

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    pub default_max_parallel: usize,
    pub max_rows: usize,
    pub query_timeout: Duration,
    pub batch_deadline: Duration,
    pub guards: GuardConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            default_max_parallel: 4,
            max_rows: 100_000,
            query_timeout: Duration::from_secs(30),
            batch_deadline: Duration::from_secs(120),
            guards: GuardConfig::default(),
        }
    }
}

pub struct BatchOrchestrator {
    catalog: CatalogHandle,
    executor: Arc<QueryExecutor>,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(catalog: CatalogHandle, executor: Arc<QueryExecutor>, config: BatchConfig) -> Self {
        Self { catalog, executor, config }
    }

    pub async fn run(
        &self,
        request: BatchRequest,
        tenant_id: &str,
        is_admin: bool,
        cancellation: CancellationToken,
    ) -> Result<BatchResult, BatchError> {
        let ids = assign_ids(&request.queries)?;
        let groups = topological_groups(&ids, &request.queries)?;

        if request.transaction {
            self.check_transaction_eligibility(&request.queries).await?;
        }

        let max_parallel = request.parallel.unwrap_or(self.config.default_max_parallel).max(1);
        let deadline = Instant::now() + self.config.batch_deadline;
        let batch_cancel = cancellation.child_token();

        let mut outcomes: Vec<SubQueryOutcome> = ids
            .iter()
            .map(|id| SubQueryOutcome {
                id: id.clone(),
                status: SubQueryStatus::Pending,
                result: None,
                error: None,
            })
            .collect();
        let mut stop = false;

        for group in groups {
            if Instant::now() >= deadline {
                for &i in &group {
                    outcomes[i].status = SubQueryStatus::Skipped;
                    outcomes[i].error = Some(BatchError::DeadlineExceeded.to_string());
                }
                continue;
            }
            if stop {
                for &i in &group {
                    outcomes[i].status = SubQueryStatus::Skipped;
                }
                continue;
            }

            let semaphore = Arc::new(Semaphore::new(max_parallel));
            let finished_so_far = outcomes.clone();

            // spec.md §8: "any query with a failed dependency transitions
            // to skipped (not failed)" — independent of `stop_on_error`.
            let (runnable, auto_skipped): (Vec<usize>, Vec<usize>) =
                group.iter().copied().partition(|&i| {
                    !request.queries[i].depends_on.iter().any(|dep_id| {
                        finished_so_far
                            .iter()
                            .find(|o| &o.id == dep_id)
                            .map(|o| matches!(o.status, SubQueryStatus::Failed | SubQueryStatus::Skipped))
                            .unwrap_or(false)
                    })
                });
            for i in auto_skipped {
                outcomes[i].status = SubQueryStatus::Skipped;
            }

            let tasks = runnable.iter().map(|&i| {
                let semaphore = Arc::clone(&semaphore);
                let finished_so_far = finished_so_far.clone();
                let id = ids[i].clone();
                let query = request.queries[i].clone();
                let batch_cancel = batch_cancel.clone();
                async move {
                    let _permit = semaphore.acquire().await;
                    self.run_one(&id, &query, &finished_so_far, tenant_id, is_admin, deadline, batch_cancel)
                        .await
                }
            });
            let results = futures_util::future::join_all(tasks).await;

            for (&i, outcome) in runnable.iter().zip(results) {
                if outcome.status == SubQueryStatus::Failed && request.stop_on_error {
                    stop = true;
                    batch_cancel.cancel();
                }
                outcomes[i] = outcome;
            }
        }

        Ok(BatchResult { results: outcomes })
    }

    async fn run_one(
        &self,
        id: &str,
        query: &SubQuery,
        finished_so_far: &[SubQueryOutcome],
        tenant_id: &str,
        is_admin: bool,
        deadline: Instant,
        cancellation: CancellationToken,
    ) -> SubQueryOutcome {
        let mut request = query.request.clone();
        for filter in &mut request.filters {
            if let Some(value) = &filter.value {
                match resolve_value(value, finished_so_far) {
                    Ok(resolved) => filter.value = Some(resolved),
                    Err(err) => return failed(id, err.to_string()),
                }
            }
        }

        let snapshot = self.catalog.current().await;
        let dataset = match snapshot.dataset(&request.dataset) {
            Ok(d) => d,
            Err(err) => return failed(id, err.to_string()),
        };
        if let Err(err) = setu_catalog::check_request(&snapshot, &self.config.guards, &request) {
            return failed(id, err.to_string());
        }
        let source = match snapshot.source(&dataset.source_id) {
            Ok(s) => s,
            Err(err) => return failed(id, err.to_string()),
        };
        let dialect = setu_compiler::descriptor_for(source.kind);
        let tenant = TenantContext { tenant_id, is_admin };
        let compiled = match setu_compiler::compile(&request, dataset, tenant, &dialect, self.config.guards.max_rows) {
            Ok(c) => c,
            Err(err) => return failed(id, err.to_string()),
        };

        match self
            .executor
            .execute(
                &dataset.source_id,
                &compiled,
                deadline,
                self.config.query_timeout,
                self.config.max_rows,
                cancellation,
            )
            .await
        {
            Ok(result) => SubQueryOutcome {
                id: id.to_string(),
                status: SubQueryStatus::Success,
                result: Some(result),
                error: None,
            },
            Err(err) => failed(id, err.to_string()),
        }
    }

    /// spec.md §4.11: `transaction=true` is accepted only when every
    /// sub-query resolves to the same source and that source's adapter
    /// supports sessions. This checks eligibility only — running several
    /// sub-queries against one held connection (true session-scoped
    /// atomicity) is a follow-up; today an eligible transactional batch
    /// still executes each sub-query through the normal pooled path.
    async fn check_transaction_eligibility(&self, queries: &[SubQuery]) -> Result<(), BatchError> {
        let snapshot = self.catalog.current().await;
        let mut source_id: Option<String> = None;
        for query in queries {
            let dataset = snapshot
                .dataset(&query.request.dataset)
                .map_err(|_| BatchError::UnknownDataset(query.request.dataset.clone()))?;
            match &source_id {
                None => source_id = Some(dataset.source_id.clone()),
                Some(existing) if existing != &dataset.source_id => {
                    return Err(BatchError::TransactionCrossSource)
                }
                _ => {}
            }
        }
        let Some(source_id) = source_id else {
            return Ok(());
        };
        if !self.executor.supports_sessions(&source_id) {
            return Err(BatchError::TransactionUnsupported);
        }
        Ok(())
    }
}

fn failed(id: &str, message: String) -> SubQueryOutcome {
    SubQueryOutcome {
        id: id.to_string(),
        status: SubQueryStatus::Failed,
        result: None,
        error: Some(message),
    }
}
