//! Source registry and connection pools: spec.md §4.7. `SourceAdapter` is
//! the uniform surface the executor calls; `SqlxAdapter` backs the three
//! sqlx-native kinds (and the Postgres-wire-compatible CockroachDB and
//! Redshift), `HttpWarehouseAdapter` backs the statement/job-API kinds.

pub mod adapter;
pub mod error;
pub mod http_adapter;
pub mod model;
pub mod registry;
pub mod sqlx_adapter;

pub use adapter::SourceAdapter;
pub use error::SourceError;
pub use http_adapter::HttpWarehouseAdapter;
pub use model::{ExecRequest, PoolStats, QueryResult, RawExecRequest};
pub use registry::SourcePoolRegistry;
pub use sqlx_adapter::SqlxAdapter;

/// True if `kind` is driven over a plain SQL wire protocol sqlx speaks
/// natively (directly or via wire compatibility), false if it needs the
/// HTTP statement-API adapter instead.
pub fn is_sqlx_native(kind: setu_catalog::SourceKind) -> bool {
    use setu_catalog::SourceKind::*;
    matches!(kind, Postgres | MySql | CockroachDb | Redshift)
}

pub mod prelude {
    pub use crate::{
        is_sqlx_native, ExecRequest, HttpWarehouseAdapter, PoolStats, QueryResult, RawExecRequest,
        SourceAdapter, SourceError, SourcePoolRegistry, SqlxAdapter,
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_catalog::SourceKind;

    #[test]
    fn sqlx_native_covers_wire_compatible_kinds() {
        assert!(is_sqlx_native(SourceKind::Postgres));
        assert!(is_sqlx_native(SourceKind::CockroachDb));
        assert!(is_sqlx_native(SourceKind::Redshift));
        assert!(is_sqlx_native(SourceKind::MySql));
        assert!(!is_sqlx_native(SourceKind::Snowflake));
        assert!(!is_sqlx_native(SourceKind::DuckDb));
    }

    #[test]
    fn registry_reports_not_found_for_unregistered_source() {
        let registry = SourcePoolRegistry::new();
        let err = registry.get("missing").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(id) if id == "missing"));
    }
}
