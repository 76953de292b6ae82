//! RLS wrapping for raw, caller-supplied SQL (`/v1/sql`). Spec.md §4.5.

use crate::compile::TenantContext;
use crate::dialect::DialectDescriptor;
use setu_catalog::RlsPolicy;

/// Wrap `raw_sql` with the dataset's tenant predicate, unless the caller is
/// admin. The wrapped SQL must still pass the safety gate before execution;
/// admin identities skip wrapping but never skip the gate — enforced by the
/// caller, not here.
///
/// `caller_param_count` is the number of bound parameters already used by
/// `raw_sql` itself (assumed numbered `1..=caller_param_count` for
/// numbered-placeholder dialects). The RLS predicate's own placeholder is
/// rendered at `caller_param_count + 1` so it never collides with one of
/// the caller's own placeholders — `?`-style dialects ignore the index
/// entirely and are unaffected either way.
pub fn wrap_raw_sql(
    raw_sql: &str,
    rls: Option<&RlsPolicy>,
    tenant: TenantContext<'_>,
    dialect: &DialectDescriptor,
    caller_param_count: usize,
) -> (String, Vec<serde_json::Value>) {
    let Some(rls) = rls else {
        return (raw_sql.to_string(), Vec::new());
    };
    if tenant.is_admin {
        return (raw_sql.to_string(), Vec::new());
    }

    let field = rls.field();
    let placeholder = dialect.placeholder(caller_param_count + 1);
    let wrapped = format!(
        "SELECT * FROM ({raw_sql}) AS u WHERE u.{field} = {placeholder}"
    );
    (wrapped, vec![serde_json::Value::String(tenant.tenant_id.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::descriptor_for;
    use setu_catalog::SourceKind;

    #[test]
    fn non_admin_gets_wrapped() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let rls = RlsPolicy::TenantColumn { field: "tenant_id".into() };
        let tenant = TenantContext { tenant_id: "acme", is_admin: false };
        let (sql, params) = wrap_raw_sql("SELECT * FROM orders", Some(&rls), tenant, &dialect, 0);
        assert!(sql.starts_with("SELECT * FROM (SELECT * FROM orders) AS u WHERE u.tenant_id = $1"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn admin_is_not_wrapped() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let rls = RlsPolicy::TenantColumn { field: "tenant_id".into() };
        let tenant = TenantContext { tenant_id: "acme", is_admin: true };
        let (sql, params) = wrap_raw_sql("SELECT * FROM orders", Some(&rls), tenant, &dialect, 0);
        assert_eq!(sql, "SELECT * FROM orders");
        assert!(params.is_empty());
    }

    #[test]
    fn rls_placeholder_is_numbered_after_the_callers_own_params() {
        let dialect = descriptor_for(SourceKind::Postgres);
        let rls = RlsPolicy::TenantColumn { field: "tenant_id".into() };
        let tenant = TenantContext { tenant_id: "acme", is_admin: false };
        let (sql, params) =
            wrap_raw_sql("SELECT * FROM orders WHERE region = $1 AND status = $2", Some(&rls), tenant, &dialect, 2);
        assert!(sql.contains("WHERE u.tenant_id = $3"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn question_mark_dialects_ignore_the_index() {
        let dialect = descriptor_for(SourceKind::MySql);
        let rls = RlsPolicy::TenantColumn { field: "tenant_id".into() };
        let tenant = TenantContext { tenant_id: "acme", is_admin: false };
        let (sql, params) =
            wrap_raw_sql("SELECT * FROM orders WHERE region = ?", Some(&rls), tenant, &dialect, 1);
        assert!(sql.ends_with("WHERE u.tenant_id = ?"));
        assert_eq!(params.len(), 1);
    }
}
