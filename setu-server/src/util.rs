//! Small helpers shared across route handlers: rate-limit header
//! stamping and tenant-scoped `$ref`-free filter resolution live in their
//! owning crates already, so all that's left here is the glue spec.md §6
//! requires on every rate-limited response.

use std::time::SystemTime;

use axum::response::{IntoResponse, Response};
use axum::Json;
use setu_core::http::header::{HeaderName, HeaderValue};
use setu_core::http::StatusCode;
use setu_rate_limit::RateLimitDecision;

use crate::state::AppState;

fn epoch_secs(at: SystemTime) -> u64 {
    at.duration_since(SystemTime::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn stamp(response: &mut Response, decision: &RateLimitDecision) {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(epoch_secs(decision.reset_at)),
    );
}

/// Check-and-decide a rate-limit rule for `key`. On success, returns a
/// closure-like stamp function the caller applies to its eventual success
/// response; on rejection, returns a ready-to-return 429 response with
/// `X-RateLimit-*` and `Retry-After` already set (spec.md §8 scenario 8).
pub fn check_rate_limit(state: &AppState, key: &str, max: u64, window_secs: u64) -> Result<RateLimitDecision, Response> {
    let decision = state.rate_limits.decide(key, max, window_secs);
    if decision.allowed {
        Ok(decision)
    } else {
        let retry_after = decision
            .reset_at
            .duration_since(SystemTime::now())
            .unwrap_or_default()
            .as_secs()
            .max(1);
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": { "code": "ERR_RATE_LIMITED", "message": "rate limit exceeded" }
            })),
        )
            .into_response();
        stamp(&mut response, &decision);
        response
            .headers_mut()
            .insert(HeaderName::from_static("retry-after"), HeaderValue::from(retry_after));
        Err(response)
    }
}

/// Stamp `X-RateLimit-*` headers from an already-made decision onto a
/// successful response.
pub fn stamp_rate_limit(mut response: Response, decision: &RateLimitDecision) -> Response {
    stamp(&mut response, decision);
    response
}

/// Per-identity bucket key: `{route}:{subject}`. Anonymous callers (there
/// are none on authenticated routes, but the health endpoint is exempt
/// from rate limiting entirely) are never passed through here.
pub fn bucket_key(route: &str, subject: &str) -> String {
    format!("{route}:{subject}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_key_combines_route_and_subject() {
        assert_eq!(bucket_key("/v1/query", "tenant-a:key-1"), "/v1/query:tenant-a:key-1");
    }

    #[test]
    fn stamp_rate_limit_sets_headers_from_decision() {
        let decision = RateLimitDecision {
            allowed: true,
            limit: 100,
            remaining: 37,
            reset_at: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000),
        };
        let response = stamp_rate_limit(StatusCode::OK.into_response(), &decision);
        let headers = response.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "37");
        assert_eq!(headers.get("x-ratelimit-reset").unwrap(), "1700000000");
    }
}
