//! Wire shapes for `POST /v1/batch`, spec.md §4.11/§6.

use serde::{Deserialize, Serialize};
use setu_catalog::QueryRequest;
use setu_sources::QueryResult;

#[derive(Debug, Clone, Deserialize)]
pub struct SubQuery {
    pub id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(flatten)]
    pub request: QueryRequest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub queries: Vec<SubQuery>,
    pub parallel: Option<usize>,
    #[serde(default)]
    pub stop_on_error: bool,
    #[serde(default)]
    pub transaction: bool,
    #[serde(default)]
    pub include_metadata: bool,
}

/// spec.md §4.11: pending → ready (deps satisfied) → running → (success |
/// failed | skipped).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubQueryStatus {
    Pending,
    Ready,
    Running,
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubQueryOutcome {
    pub id: String,
    pub status: SubQueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub results: Vec<SubQueryOutcome>,
}
