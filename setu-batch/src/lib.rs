//! Multi-query batch orchestrator: DAG scheduling, `$ref` cross-query
//! references, and partial-failure reporting, spec.md §4.11.

mod dag;
mod error;
mod model;
mod orchestrator;
mod refs;

pub use error::BatchError;
pub use model::{BatchRequest, BatchResult, SubQuery, SubQueryOutcome, SubQueryStatus};
pub use orchestrator::{BatchConfig, BatchOrchestrator};
pub use refs::{parse_ref, referenced_ids, resolve_ref, resolve_value, RefToken};

pub mod prelude {
    pub use crate::{
        BatchConfig, BatchError, BatchOrchestrator, BatchRequest, BatchResult, SubQuery,
        SubQueryOutcome, SubQueryStatus,
    };
}
