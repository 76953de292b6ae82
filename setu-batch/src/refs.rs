//! `$ref:<id>[<n>].<field>` token parsing and resolution, spec.md §4.11.

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

use crate::error::BatchError;
use crate::model::{SubQueryOutcome, SubQueryStatus};

fn ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$ref:([^\[]+)\[(\d+)\]\.(.+)$").unwrap())
}

pub struct RefToken {
    pub id: String,
    pub row: usize,
    pub field: String,
}

pub fn parse_ref(token: &str) -> Option<RefToken> {
    let caps = ref_pattern().captures(token)?;
    Some(RefToken {
        id: caps[1].to_string(),
        row: caps[2].parse().ok()?,
        field: caps[3].to_string(),
    })
}

/// Resolve a `$ref:...` token against a completed dependency's result.
pub fn resolve_ref(token: &str, outcomes: &[SubQueryOutcome]) -> Result<JsonValue, BatchError> {
    let parsed = parse_ref(token).ok_or_else(|| BatchError::MalformedRef(token.to_string()))?;

    let dep = outcomes
        .iter()
        .find(|o| o.id == parsed.id)
        .ok_or_else(|| BatchError::MalformedRef(token.to_string()))?;

    if dep.status != SubQueryStatus::Success {
        return Err(BatchError::RefOnFailedDependency(token.to_string()));
    }
    let result = dep.result.as_ref().ok_or_else(|| BatchError::RefOnFailedDependency(token.to_string()))?;

    let row = result.rows.get(parsed.row).ok_or_else(|| BatchError::RefRowOutOfRange {
        token: token.to_string(),
        id: parsed.id.clone(),
        row: parsed.row,
        available: result.rows.len(),
    })?;

    let col_index = result
        .columns
        .iter()
        .position(|c| c.name == parsed.field)
        .ok_or_else(|| BatchError::RefFieldNotFound {
            token: token.to_string(),
            id: parsed.id.clone(),
            field: parsed.field.clone(),
        })?;

    Ok(row.get(col_index).cloned().unwrap_or(JsonValue::Null))
}

/// Walk a JSON value, replacing any `$ref:...` string (bare, or inside an
/// array) with its resolved value. Non-ref values pass through unchanged.
pub fn resolve_value(value: &JsonValue, outcomes: &[SubQueryOutcome]) -> Result<JsonValue, BatchError> {
    match value {
        JsonValue::String(s) if s.starts_with("$ref:") => resolve_ref(s, outcomes),
        JsonValue::Array(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_value(item, outcomes))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(JsonValue::Array(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Every `$ref:<id>...` dependency id referenced anywhere in `value`.
pub fn referenced_ids(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::String(s) if s.starts_with("$ref:") => {
            parse_ref(s).map(|r| vec![r.id]).unwrap_or_default()
        }
        JsonValue::Array(items) => items.iter().flat_map(referenced_ids).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_compiler::{ColumnMeta, ColumnType};
    use setu_sources::QueryResult;
    use serde_json::json;

    fn success_outcome(id: &str, rows: Vec<Vec<JsonValue>>) -> SubQueryOutcome {
        SubQueryOutcome {
            id: id.to_string(),
            status: SubQueryStatus::Success,
            result: Some(QueryResult {
                columns: vec![ColumnMeta { name: "region".into(), column_type: ColumnType::String }],
                rows,
                truncated: false,
            }),
            error: None,
        }
    }

    #[test]
    fn parses_well_formed_token() {
        let parsed = parse_ref("$ref:A[0].region").unwrap();
        assert_eq!(parsed.id, "A");
        assert_eq!(parsed.row, 0);
        assert_eq!(parsed.field, "region");
    }

    #[test]
    fn resolves_against_dependency_result() {
        let outcomes = vec![success_outcome("A", vec![vec![json!("US")]])];
        let resolved = resolve_ref("$ref:A[0].region", &outcomes).unwrap();
        assert_eq!(resolved, json!("US"));
    }

    #[test]
    fn rejects_row_out_of_range() {
        let outcomes = vec![success_outcome("A", vec![vec![json!("US")]])];
        let err = resolve_ref("$ref:A[5].region", &outcomes).unwrap_err();
        assert!(matches!(err, BatchError::RefRowOutOfRange { .. }));
    }

    #[test]
    fn rejects_ref_to_failed_dependency() {
        let outcomes = vec![SubQueryOutcome {
            id: "A".into(),
            status: SubQueryStatus::Failed,
            result: None,
            error: Some("boom".into()),
        }];
        let err = resolve_ref("$ref:A[0].region", &outcomes).unwrap_err();
        assert!(matches!(err, BatchError::RefOnFailedDependency(_)));
    }
}
