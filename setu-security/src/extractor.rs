use setu_core::http::extract::{FromRef, FromRequestParts, OptionalFromRequestParts};
use setu_core::http::header::Parts;
use tracing::{debug, warn};

use crate::api_key::ApiKeyStore;
use crate::error::SecurityError;
use crate::identity::Principal;

const API_KEY_HEADER: &str = "x-api-key";

fn extract_raw_key(parts: &Parts) -> Result<&str, SecurityError> {
    parts
        .headers
        .get(API_KEY_HEADER)
        .ok_or_else(|| {
            warn!(uri = %parts.uri, "missing X-API-Key header");
            SecurityError::MissingApiKey
        })?
        .to_str()
        .map_err(|_| SecurityError::InvalidApiKey)
}

/// Resolve a `Principal` from request parts given an `ApiKeyStore` reachable
/// via `FromRef<S>`. Shared by `Principal`'s own extractor impls and by any
/// custom identity type built on top of the same store.
pub async fn resolve_principal<S>(
    parts: &Parts,
    state: &S,
) -> Result<Principal, setu_core::AppError>
where
    S: Send + Sync,
    ApiKeyStore: FromRef<S>,
{
    let raw = extract_raw_key(parts)?;
    let store = ApiKeyStore::from_ref(state);
    let principal = store.resolve(raw).ok_or_else(|| {
        warn!(uri = %parts.uri, "unknown or revoked API key");
        SecurityError::InvalidApiKey
    })?;
    debug!(uri = %parts.uri, tenant = %principal.tenant_id, "authenticated request");
    Ok(principal)
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    ApiKeyStore: FromRef<S>,
{
    type Rejection = setu_core::AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        resolve_principal(parts, state).await
    }
}

/// Enables `Option<Principal>` as a handler parameter for endpoints that
/// work both with and without authentication.
impl<S> OptionalFromRequestParts<S> for Principal
where
    S: Send + Sync,
    ApiKeyStore: FromRef<S>,
{
    type Rejection = setu_core::AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(API_KEY_HEADER) {
            return Ok(None);
        }
        resolve_principal(parts, state).await.map(Some)
    }
}
