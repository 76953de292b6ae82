//! `POST /admin/cache/clear` — whole-cache or per-dataset invalidation,
//! spec.md §6. Admin-only: cache invalidation is a non-idempotent write
//! (spec.md §7), never retried, so it gets the same role gate as source
//! and dataset mutation.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use setu_security::Principal;

use crate::error::GatewayError;
use crate::state::AppState;

fn require_admin(principal: &Principal) -> Result<(), GatewayError> {
    if principal.role.is_admin() {
        Ok(())
    } else {
        Err(GatewayError(setu_core::AppError::Forbidden(
            "cache invalidation requires the admin role".to_string(),
        )))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClearCacheRequest {
    /// Invalidate only entries tagged with this dataset; omit to clear
    /// everything.
    pub dataset: Option<String>,
}

pub async fn clear_cache(
    State(state): State<AppState>,
    principal: Principal,
    Json(request): Json<ClearCacheRequest>,
) -> Result<Response, GatewayError> {
    require_admin(&principal)?;

    match &request.dataset {
        Some(dataset) => state.result_cache.invalidate_dataset(dataset),
        None => {
            let snapshot = state.catalog.current().await;
            for dataset in snapshot.datasets() {
                state.result_cache.invalidate_dataset(&dataset.id);
            }
        }
    }

    Ok(setu_core::http::StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use setu_security::Role;

    fn principal(role: Role) -> Principal {
        Principal {
            key_id: "key-1".to_string(),
            tenant_id: "tenant-a".to_string(),
            role,
            rate_class: "default".to_string(),
        }
    }

    #[test]
    fn admin_passes_the_gate() {
        assert!(require_admin(&principal(Role::Admin)).is_ok());
    }

    #[test]
    fn reader_and_analyst_are_forbidden() {
        assert!(require_admin(&principal(Role::Reader)).is_err());
        assert!(require_admin(&principal(Role::Analyst)).is_err());
    }
}
