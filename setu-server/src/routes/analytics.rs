//! `GET /v1/analytics`, `/v1/analytics/recent-queries` — recorder readout,
//! spec.md §6.
//!
//! Non-admin callers are always scoped to their own tenant regardless of
//! what (if anything) they pass in `tenant`; only an admin key can read
//! across tenants.

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use setu_analytics::AnalyticsQuery;
use setu_security::Principal;

use crate::error::GatewayError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub dataset: Option<String>,
    pub tenant: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

fn scoped_query(params: AnalyticsParams, principal: &Principal) -> AnalyticsQuery {
    let tenant = if principal.role.is_admin() {
        params.tenant
    } else {
        Some(principal.tenant_id.clone())
    };
    AnalyticsQuery {
        tenant,
        dataset: params.dataset,
        since: params.since,
        until: params.until,
        limit: params.limit,
    }
}

pub async fn analytics(
    State(state): State<AppState>,
    principal: Principal,
    Query(params): Query<AnalyticsParams>,
) -> Result<Response, GatewayError> {
    let query = scoped_query(params, &principal);
    let records = state.analytics_store.query_range(&query).await?;
    Ok(Json(records).into_response())
}

pub async fn recent_queries(
    State(state): State<AppState>,
    principal: Principal,
    Query(mut params): Query<AnalyticsParams>,
) -> Result<Response, GatewayError> {
    params.limit = params.limit.min(100);
    let query = scoped_query(params, &principal);
    let records = state.analytics_store.query_range(&query).await?;
    Ok(Json(records).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_security::Role;

    fn principal(role: Role, tenant_id: &str) -> Principal {
        Principal {
            key_id: "key-1".to_string(),
            tenant_id: tenant_id.to_string(),
            role,
            rate_class: "default".to_string(),
        }
    }

    fn params(tenant: Option<&str>) -> AnalyticsParams {
        AnalyticsParams {
            dataset: None,
            tenant: tenant.map(str::to_string),
            since: None,
            until: None,
            limit: default_limit(),
        }
    }

    #[test]
    fn non_admin_is_always_scoped_to_their_own_tenant() {
        let p = principal(Role::Analyst, "tenant-a");
        let query = scoped_query(params(Some("tenant-b")), &p);
        assert_eq!(query.tenant.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn non_admin_with_no_tenant_filter_is_still_scoped() {
        let p = principal(Role::Reader, "tenant-a");
        let query = scoped_query(params(None), &p);
        assert_eq!(query.tenant.as_deref(), Some("tenant-a"));
    }

    #[test]
    fn admin_may_query_across_tenants() {
        let p = principal(Role::Admin, "tenant-a");
        let query = scoped_query(params(Some("tenant-b")), &p);
        assert_eq!(query.tenant.as_deref(), Some("tenant-b"));
    }

    #[test]
    fn admin_with_no_tenant_filter_sees_every_tenant() {
        let p = principal(Role::Admin, "tenant-a");
        let query = scoped_query(params(None), &p);
        assert_eq!(query.tenant, None);
    }
}
