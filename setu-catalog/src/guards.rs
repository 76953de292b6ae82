//! Pre-compilation query guards: deterministic bound checks that never
//! touch the network, modeled on `setu_core::guards::Guard` but evaluated
//! synchronously before the semantic compiler runs.

use crate::error::CatalogError;
use crate::request::QueryRequest;
use crate::snapshot::CatalogSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GuardConfig {
    pub max_dimensions: usize,
    pub max_metrics: usize,
    pub max_filters: usize,
    pub max_filter_depth: usize,
    pub max_rows: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            max_dimensions: 20,
            max_metrics: 20,
            max_filters: 50,
            max_filter_depth: 4,
            max_rows: 100_000,
        }
    }
}

/// Runs every pre-compilation check, in the order a caller can act on them
/// deterministically: dataset existence first, then the request's own
/// shape, then per-field existence against the dataset.
pub fn check_request(
    snapshot: &CatalogSnapshot,
    config: &GuardConfig,
    request: &QueryRequest,
) -> Result<(), CatalogError> {
    let dataset = snapshot.dataset(&request.dataset)?;

    if request.dimensions.is_empty() && request.metrics.is_empty() {
        return Err(CatalogError::EmptySelection {
            dataset: dataset.id.clone(),
        });
    }
    if request.dimensions.len() > config.max_dimensions {
        return Err(CatalogError::TooManyFields {
            kind: "dimensions",
            max: config.max_dimensions,
        });
    }
    if request.metrics.len() > config.max_metrics {
        return Err(CatalogError::TooManyFields {
            kind: "metrics",
            max: config.max_metrics,
        });
    }
    if request.filters.len() > config.max_filters {
        return Err(CatalogError::TooManyFields {
            kind: "filters",
            max: config.max_filters,
        });
    }
    if let Some(limit) = request.limit {
        if limit == 0 || limit > config.max_rows {
            return Err(CatalogError::LimitOutOfRange {
                limit,
                max: config.max_rows,
            });
        }
    }

    for name in &request.dimensions {
        if dataset.dimension(name).is_none() {
            return Err(CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: name.clone(),
            });
        }
    }
    for name in &request.metrics {
        if dataset.metric(name).is_none() {
            return Err(CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: name.clone(),
            });
        }
    }
    for filter in &request.filters {
        if dataset.dimension(&filter.field).is_none() {
            return Err(CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: filter.field.clone(),
            });
        }
    }
    for order in &request.order_by {
        if !dataset.has_field(&order.field) {
            return Err(CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: order.field.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dataset, Dimension, Source, SourceKind, ValueType};
    use crate::snapshot::CatalogBuilder;

    fn snapshot() -> CatalogSnapshot {
        CatalogBuilder::new()
            .with_source(Source {
                id: "wh".into(),
                kind: SourceKind::Postgres,
                display_name: None,
            })
            .with_dataset(Dataset {
                id: "orders".into(),
                source_id: "wh".into(),
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
            })
            .build(1)
            .unwrap()
    }

    #[test]
    fn rejects_empty_selection() {
        let req = QueryRequest {
            dataset: "orders".into(),
            dimensions: vec![],
            metrics: vec![],
            filters: vec![],
            order_by: vec![],
            limit: None,
            offset: 0,
        };
        let err = check_request(&snapshot(), &GuardConfig::default(), &req).unwrap_err();
        assert!(matches!(err, CatalogError::EmptySelection { .. }));
    }

    #[test]
    fn rejects_unknown_dimension() {
        let req = QueryRequest {
            dataset: "orders".into(),
            dimensions: vec!["nonexistent".into()],
            metrics: vec![],
            filters: vec![],
            order_by: vec![],
            limit: None,
            offset: 0,
        };
        let err = check_request(&snapshot(), &GuardConfig::default(), &req).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownField { .. }));
    }

    #[test]
    fn accepts_valid_request() {
        let req = QueryRequest {
            dataset: "orders".into(),
            dimensions: vec!["region".into()],
            metrics: vec![],
            filters: vec![],
            order_by: vec![],
            limit: Some(10),
            offset: 0,
        };
        assert!(check_request(&snapshot(), &GuardConfig::default(), &req).is_ok());
    }
}
