use setu_core::guards::{Guard, GuardContext, Identity};
use setu_core::http::response::{IntoResponse, Response};

use crate::identity::Role;

/// Extension of [`Identity`] for role-based access control.
///
/// `Principal` implements this directly; it is split out so `RoleGuard`
/// can be generic over identity types without depending on `Principal`.
pub trait RoleBasedIdentity: Identity {
    fn role(&self) -> Role;
}

/// Guard that checks the identity holds at least the required role.
/// `Role::Admin` always satisfies the check. Returns 403 if not.
pub struct RoleGuard {
    pub required: Role,
}

impl RoleGuard {
    pub fn new(required: Role) -> Self {
        Self { required }
    }
}

impl<S: Send + Sync, I: RoleBasedIdentity> Guard<S, I> for RoleGuard {
    fn check(
        &self,
        _state: &S,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send {
        let result = (|| {
            let identity = ctx.identity.ok_or_else(|| {
                setu_core::AppError::Forbidden("no identity available for role check".into())
                    .into_response()
            })?;
            let role = identity.role();
            if role == self.required || role.is_admin() {
                Ok(())
            } else {
                Err(setu_core::AppError::Forbidden("insufficient role".into()).into_response())
            }
        })();
        std::future::ready(result)
    }
}

/// Guard that restricts access to the tenant named in the route's
/// `tenant_id` path parameter, unless the identity is `Role::Admin`.
///
/// Mirrors the tenant-scoping pattern of multi-tenant `r2e` apps: the
/// route carries the tenant in its path, and the guard rejects any
/// request whose authenticated tenant does not match.
pub struct TenantGuard;

impl<S: Send + Sync> Guard<S, crate::identity::Principal> for TenantGuard {
    fn check(
        &self,
        _state: &S,
        ctx: &GuardContext<'_, crate::identity::Principal>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send {
        let result = (|| {
            let principal = ctx.identity.ok_or_else(|| {
                setu_core::AppError::Unauthorized("missing principal".into()).into_response()
            })?;
            if principal.role.is_admin() {
                return Ok(());
            }
            match ctx.path_param("tenant_id") {
                Some(path_tenant) if path_tenant == principal.tenant_id => Ok(()),
                Some(_) => {
                    Err(setu_core::AppError::Forbidden("tenant mismatch".into()).into_response())
                }
                None => Ok(()),
            }
        })();
        std::future::ready(result)
    }
}
