//! Semantic compiler: `QueryRequest` + `Dataset` + tenant + dialect →
//! parameterized SQL. Spec.md §4.4.

use serde::Serialize;
use serde_json::Value as JsonValue;
use setu_catalog::{Dataset, Filter, FilterOp, QueryRequest, SortDirection, ValueType};

use crate::dialect::DialectDescriptor;
use crate::error::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Number,
    Date,
    DateTime,
    Boolean,
}

impl From<ValueType> for ColumnType {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::String => ColumnType::String,
            ValueType::Number => ColumnType::Number,
            ValueType::Date => ColumnType::Date,
            ValueType::DateTime => ColumnType::DateTime,
            ValueType::Boolean => ColumnType::Boolean,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

/// Result of compilation: ready-to-execute SQL text, its bound parameters
/// in placeholder order, and the columns the executor should expect back.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    pub sql_text: String,
    pub bound_params: Vec<JsonValue>,
    pub expected_columns: Vec<ColumnMeta>,
}

/// Tenant context the compiler needs: who's asking, and do they bypass RLS.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext<'a> {
    pub tenant_id: &'a str,
    pub is_admin: bool,
}

struct ParamBinder {
    values: Vec<JsonValue>,
}

impl ParamBinder {
    fn new() -> Self {
        Self { values: Vec::new() }
    }

    fn bind(&mut self, dialect: &DialectDescriptor, value: JsonValue) -> String {
        self.values.push(value);
        dialect.placeholder(self.values.len())
    }
}

fn render_filter(
    filter: &Filter,
    dimension_expr: &str,
    dimension_type: ValueType,
    dialect: &DialectDescriptor,
    binder: &mut ParamBinder,
) -> Result<String, CompileError> {
    let missing_value = || CompileError::MissingFilterValue {
        field: filter.field.clone(),
    };

    match filter.op {
        FilterOp::IsNull => return Ok(format!("{dimension_expr} IS NULL")),
        FilterOp::IsNotNull => return Ok(format!("{dimension_expr} IS NOT NULL")),
        _ => {}
    }

    let value = filter.value.clone().ok_or_else(missing_value)?;

    match filter.op {
        FilterOp::Like => {
            if dimension_type != ValueType::String {
                return Err(CompileError::LikeRequiresString {
                    field: filter.field.clone(),
                });
            }
            let ph = binder.bind(dialect, value);
            Ok(format!("{dimension_expr} LIKE {ph}"))
        }
        FilterOp::Between => {
            let items = value.as_array().cloned().ok_or_else(|| CompileError::BetweenArity {
                field: filter.field.clone(),
            })?;
            if items.len() != 2 {
                return Err(CompileError::BetweenArity {
                    field: filter.field.clone(),
                });
            }
            let lo = binder.bind(dialect, items[0].clone());
            let hi = binder.bind(dialect, items[1].clone());
            Ok(format!("{dimension_expr} BETWEEN {lo} AND {hi}"))
        }
        FilterOp::In | FilterOp::NotIn => {
            let items = value.as_array().cloned().unwrap_or_default();
            if items.is_empty() {
                // spec.md §4.4: `in` on an empty list evaluates to constant false.
                return Ok(match filter.op {
                    FilterOp::In => "1 = 0".to_string(),
                    _ => "1 = 1".to_string(),
                });
            }
            let placeholders: Vec<String> = items
                .into_iter()
                .map(|v| binder.bind(dialect, v))
                .collect();
            let joined = placeholders.join(", ");
            let op = if filter.op == FilterOp::In { "IN" } else { "NOT IN" };
            Ok(format!("{dimension_expr} {op} ({joined})"))
        }
        FilterOp::Eq | FilterOp::Ne | FilterOp::Gt | FilterOp::Ge | FilterOp::Lt | FilterOp::Le => {
            let sym = match filter.op {
                FilterOp::Eq => "=",
                FilterOp::Ne => "!=",
                FilterOp::Gt => ">",
                FilterOp::Ge => ">=",
                FilterOp::Lt => "<",
                FilterOp::Le => "<=",
                _ => unreachable!(),
            };
            let ph = binder.bind(dialect, value);
            Ok(format!("{dimension_expr} {sym} {ph}"))
        }
        FilterOp::IsNull | FilterOp::IsNotNull => unreachable!("handled above"),
    }
}

/// Compile a validated request (guards already run) into dialect SQL.
///
/// All user-provided values are bound parameters; identifiers and
/// expressions are sourced only from the catalog.
pub fn compile(
    request: &QueryRequest,
    dataset: &Dataset,
    tenant: TenantContext<'_>,
    dialect: &DialectDescriptor,
    max_rows: u64,
) -> Result<CompiledQuery, CompileError> {
    let mut binder = ParamBinder::new();

    // 1. SELECT list.
    let mut select_items = Vec::new();
    let mut expected_columns = Vec::new();
    for name in &request.dimensions {
        let dim = dataset
            .dimension(name)
            .ok_or_else(|| setu_catalog::CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: name.clone(),
            })?;
        select_items.push(format!("{} AS {}", dim.expression, dialect.quote_identifier(&dim.name)));
        expected_columns.push(ColumnMeta {
            name: dim.name.clone(),
            column_type: dim.value_type.into(),
        });
    }
    for name in &request.metrics {
        let metric = dataset
            .metric(name)
            .ok_or_else(|| setu_catalog::CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: name.clone(),
            })?;
        select_items.push(format!(
            "{} AS {}",
            metric.expression,
            dialect.quote_identifier(&metric.name)
        ));
        expected_columns.push(ColumnMeta {
            name: metric.name.clone(),
            column_type: ColumnType::Number,
        });
    }

    if request.dimensions.is_empty() && request.metrics.is_empty() {
        return Err(CompileError::NoAggregateNoGroup {
            dataset: dataset.id.clone(),
        });
    }
    // spec.md §4.4: a grouped query (non-empty dimensions) with no metric
    // has no aggregate to group toward and is rejected rather than silently
    // behaving like `SELECT DISTINCT`.
    if !request.dimensions.is_empty() && request.metrics.is_empty() {
        return Err(CompileError::NoAggregateNoGroup {
            dataset: dataset.id.clone(),
        });
    }

    // 2. FROM clause.
    let from_clause = if dataset.table_expression.trim_start().starts_with('(') {
        format!("{} AS base", dataset.table_expression)
    } else {
        dialect.quote_identifier(&dataset.table_expression)
    };

    // 3. WHERE: dimension filters + RLS predicate.
    let mut where_clauses = Vec::new();
    for filter in &request.filters {
        let dim = dataset
            .dimension(&filter.field)
            .ok_or_else(|| setu_catalog::CatalogError::UnknownField {
                dataset: dataset.id.clone(),
                field: filter.field.clone(),
            })?;
        where_clauses.push(render_filter(filter, &dim.expression, dim.value_type, dialect, &mut binder)?);
    }
    if let Some(rls) = &dataset.rls {
        if !tenant.is_admin {
            let field = rls.field();
            let ph = binder.bind(dialect, JsonValue::String(tenant.tenant_id.to_string()));
            where_clauses.push(format!("{field} = {ph}"));
        }
    }

    // 4. GROUP BY: all selected dimensions by expression.
    let group_by = if request.dimensions.is_empty() {
        None
    } else {
        let exprs: Vec<&str> = request
            .dimensions
            .iter()
            .map(|name| dataset.dimension(name).unwrap().expression.as_str())
            .collect();
        Some(exprs.join(", "))
    };

    // 5. ORDER BY.
    let selected: Vec<&str> = request
        .dimensions
        .iter()
        .chain(request.metrics.iter())
        .map(String::as_str)
        .collect();
    let mut order_clauses = Vec::new();
    for order in &request.order_by {
        if !selected.contains(&order.field.as_str()) {
            return Err(CompileError::OrderByNotSelected {
                field: order.field.clone(),
            });
        }
        let dir = match order.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        order_clauses.push(format!("{} {}", dialect.quote_identifier(&order.field), dir));
    }

    // 6. LIMIT/OFFSET.
    let limit = request.limit.unwrap_or(max_rows).min(max_rows).max(1);
    let offset = request.offset;

    let mut sql = format!("SELECT {} FROM {}", select_items.join(", "), from_clause);
    if !where_clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_clauses.join(" AND "));
    }
    if let Some(group_by) = group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_by);
    }
    if !order_clauses.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_clauses.join(", "));
    }
    sql.push(' ');
    sql.push_str(&dialect.render_limit_offset(limit, offset));

    Ok(CompiledQuery {
        sql_text: sql,
        bound_params: binder.values,
        expected_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::descriptor_for;
    use setu_catalog::{Dimension, Metric, RlsPolicy, SourceKind};

    fn dataset() -> Dataset {
        Dataset {
            id: "orders".into(),
            source_id: "wh".into(),
            table_expression: "orders".into(),
            dimensions: vec![Dimension {
                name: "region".into(),
                expression: "region".into(),
                value_type: ValueType::String,
                label: None,
            }],
            metrics: vec![Metric {
                name: "revenue".into(),
                expression: "SUM(amount)".into(),
                format: None,
            }],
            rls: Some(RlsPolicy::TenantColumn {
                field: "region".into(),
            }),
            time_dimension: None,
            refresh_policy: None,
        }
    }

    fn request() -> QueryRequest {
        QueryRequest {
            dataset: "orders".into(),
            dimensions: vec!["region".into()],
            metrics: vec!["revenue".into()],
            filters: vec![],
            order_by: vec![],
            limit: Some(50),
            offset: 0,
        }
    }

    #[test]
    fn non_admin_gets_rls_predicate() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let tenant = TenantContext {
            tenant_id: "acme",
            is_admin: false,
        };
        let compiled = compile(&request(), &dataset(), tenant, &dialect, 1000).unwrap();
        assert!(compiled.sql_text.contains("WHERE"));
        assert_eq!(compiled.bound_params, vec![JsonValue::String("acme".into())]);
    }

    #[test]
    fn admin_skips_rls_predicate() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let tenant = TenantContext {
            tenant_id: "acme",
            is_admin: true,
        };
        let compiled = compile(&request(), &dataset(), tenant, &dialect, 1000).unwrap();
        assert!(!compiled.sql_text.contains("WHERE"));
    }

    #[test]
    fn empty_in_list_is_constant_false() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let tenant = TenantContext {
            tenant_id: "acme",
            is_admin: true,
        };
        let mut req = request();
        req.filters.push(Filter {
            field: "region".into(),
            op: FilterOp::In,
            value: Some(serde_json::json!([])),
        });
        let compiled = compile(&req, &dataset(), tenant, &dialect, 1000).unwrap();
        assert!(compiled.sql_text.contains("1 = 0"));
    }

    #[test]
    fn limit_is_capped_by_max_rows() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let tenant = TenantContext {
            tenant_id: "acme",
            is_admin: true,
        };
        let mut req = request();
        req.limit = Some(10_000);
        let compiled = compile(&req, &dataset(), tenant, &dialect, 100).unwrap();
        assert!(compiled.sql_text.contains("LIMIT 100"));
    }

    #[test]
    fn order_by_must_be_selected() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let tenant = TenantContext {
            tenant_id: "acme",
            is_admin: true,
        };
        let mut req = request();
        req.order_by.push(setu_catalog::OrderBy {
            field: "not_selected".into(),
            direction: SortDirection::Asc,
        });
        let err = compile(&req, &dataset(), tenant, &dialect, 1000).unwrap_err();
        assert!(matches!(err, CompileError::OrderByNotSelected { .. }));
    }
}
