use serde::Serialize;
use serde_json::Value as JsonValue;
use setu_compiler::ColumnMeta;

/// Columnar result of a single query execution, shared by every adapter
/// family so the executor sees one shape regardless of upstream kind.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<JsonValue>>,
    /// True if the adapter stopped early because the row cap was reached.
    pub truncated: bool,
}

/// What to run and the per-call bounds the adapter must respect.
#[derive(Debug, Clone)]
pub struct ExecRequest<'a> {
    pub sql_text: &'a str,
    pub bound_params: &'a [JsonValue],
    /// Positional column types from `CompiledQuery::expected_columns`, used
    /// to decode each native column into the canonical JSON representation.
    pub expected_columns: &'a [ColumnMeta],
    pub statement_timeout: std::time::Duration,
    pub max_rows: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
}

/// Like [`ExecRequest`] but for `/v1/sql` raw statements, whose result
/// columns aren't known until the row comes back — there is no catalog
/// dimension/metric to supply an `expected_columns` list up front.
#[derive(Debug, Clone)]
pub struct RawExecRequest<'a> {
    pub sql_text: &'a str,
    pub bound_params: &'a [JsonValue],
    pub statement_timeout: std::time::Duration,
    pub max_rows: usize,
}
