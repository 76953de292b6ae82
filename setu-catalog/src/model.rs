//! Dataset/Dimension/Metric/RLS data model — in-memory, immutable once built.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nominal type of a dimension's underlying column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Date,
    DateTime,
    Boolean,
}

/// A selectable, groupable attribute of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    /// Physical SQL expression, often just a column name.
    pub expression: String,
    pub value_type: ValueType,
    pub label: Option<String>,
}

/// A selectable aggregate of a dataset. Always numeric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    /// Aggregate SQL expression, e.g. `SUM(amount)`, `COUNT(*)`.
    pub expression: String,
    pub format: Option<String>,
}

/// Row-level security policy. `TenantColumn` is the only mode implemented;
/// `Expression` is an extension point for a future predicate-expression mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RlsPolicy {
    TenantColumn { field: String },
}

impl RlsPolicy {
    pub fn field(&self) -> &str {
        match self {
            RlsPolicy::TenantColumn { field } => field,
        }
    }
}

/// The upstream warehouse kind a [`Source`] connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Postgres,
    MySql,
    Snowflake,
    BigQuery,
    Databricks,
    Redshift,
    ClickHouse,
    DuckDb,
    SqlServer,
    Oracle,
    CockroachDb,
}

/// Reference to a registered upstream source. The encrypted connection blob
/// itself lives in `setu-vault`; the catalog only tracks which source a
/// dataset is bound to and its kind (needed to pick a `DialectDescriptor`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
    pub display_name: Option<String>,
}

/// Advisory hint about how a dataset's time dimension behaves; informational
/// only, not enforced by the compiler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDimensionHint {
    pub dimension: String,
    pub grain: String,
}

/// A named logical view backed by a warehouse table or inline SQL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub source_id: String,
    /// Either a bare table identifier or a `(subquery)` SQL fragment.
    pub table_expression: String,
    pub dimensions: Vec<Dimension>,
    pub metrics: Vec<Metric>,
    pub rls: Option<RlsPolicy>,
    pub time_dimension: Option<TimeDimensionHint>,
    pub refresh_policy: Option<String>,
}

impl Dataset {
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// True if `name` names either a dimension or a metric.
    pub fn has_field(&self, name: &str) -> bool {
        self.dimension(name).is_some() || self.metric(name).is_some()
    }

    /// Validate the invariants from the data model: unique dimension/metric
    /// names, RLS field (if any) present as a dimension-backed column.
    pub fn validate(&self) -> Result<(), crate::error::CatalogError> {
        let mut seen = BTreeMap::new();
        for d in &self.dimensions {
            if seen.insert(d.name.as_str(), ()).is_some() {
                return Err(crate::error::CatalogError::DuplicateField {
                    dataset: self.id.clone(),
                    field: d.name.clone(),
                });
            }
        }
        for m in &self.metrics {
            if seen.insert(m.name.as_str(), ()).is_some() {
                return Err(crate::error::CatalogError::DuplicateField {
                    dataset: self.id.clone(),
                    field: m.name.clone(),
                });
            }
        }
        if let Some(rls) = &self.rls {
            let field = rls.field();
            if !self.dimensions.iter().any(|d| d.expression == field || d.name == field) {
                return Err(crate::error::CatalogError::MissingRlsColumn {
                    dataset: self.id.clone(),
                    field: field.to_string(),
                });
            }
        }
        Ok(())
    }
}
