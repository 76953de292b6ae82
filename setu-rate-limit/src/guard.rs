use axum::extract::FromRef;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use setu_core::guards::{Guard, GuardContext, Identity, PreAuthGuard, PreAuthGuardContext};

/// Which part of the request a rate-limit bucket is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitKeyKind {
    /// One shared bucket for the whole route, regardless of caller.
    Global,
    /// One bucket per authenticated identity (falls back to "anonymous").
    User,
    /// One bucket per source IP (`x-forwarded-for`, first hop).
    Ip,
}

/// A rate limit rule: `max` requests per `window_secs`, keyed by `key`.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max: u64,
    pub window_secs: u64,
    pub key: RateLimitKeyKind,
}

impl RateLimit {
    pub const fn new(max: u64, window_secs: u64, key: RateLimitKeyKind) -> Self {
        Self {
            max,
            window_secs,
            key,
        }
    }

    fn bucket_key(&self, method_name: &str, headers: &axum::http::HeaderMap, sub: Option<&str>) -> String {
        match self.key {
            RateLimitKeyKind::Global => format!("{method_name}:global"),
            RateLimitKeyKind::User => {
                let sub = sub.unwrap_or("anonymous");
                format!("{method_name}:user:{sub}")
            }
            RateLimitKeyKind::Ip => {
                let ip = headers
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.split(',').next())
                    .map(|s| s.trim())
                    .unwrap_or("unknown");
                format!("{method_name}:ip:{ip}")
            }
        }
    }

    fn reject() -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({ "error": "rate limit exceeded" })),
        )
            .into_response()
    }
}

/// Post-authentication rate-limit guard. Keys its bucket on the caller's
/// identity when `key == RateLimitKeyKind::User`.
pub struct RateLimitGuard {
    pub rule: RateLimit,
}

impl RateLimitGuard {
    pub fn new(rule: RateLimit) -> Self {
        Self { rule }
    }
}

impl<S, I> Guard<S, I> for RateLimitGuard
where
    S: Send + Sync,
    I: Identity,
    crate::RateLimitRegistry: FromRef<S>,
{
    fn check(
        &self,
        state: &S,
        ctx: &GuardContext<'_, I>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send {
        let registry = <crate::RateLimitRegistry as FromRef<S>>::from_ref(state);
        let key = self
            .rule
            .bucket_key(ctx.method_name, ctx.headers, ctx.identity_sub());
        let result = if registry.try_acquire(&key, self.rule.max, self.rule.window_secs) {
            Ok(())
        } else {
            Err(RateLimit::reject())
        };
        std::future::ready(result)
    }
}

/// Pre-authentication rate-limit guard, for `RateLimitKeyKind::Global`/`Ip`
/// rules that should reject a request before spending effort on API-key
/// resolution.
pub struct PreAuthRateLimitGuard {
    pub rule: RateLimit,
}

impl PreAuthRateLimitGuard {
    pub fn new(rule: RateLimit) -> Self {
        Self { rule }
    }
}

impl<S> PreAuthGuard<S> for PreAuthRateLimitGuard
where
    S: Send + Sync,
    crate::RateLimitRegistry: FromRef<S>,
{
    fn check(
        &self,
        state: &S,
        ctx: &PreAuthGuardContext<'_>,
    ) -> impl std::future::Future<Output = Result<(), Response>> + Send {
        let registry = <crate::RateLimitRegistry as FromRef<S>>::from_ref(state);
        let key = self.rule.bucket_key(ctx.method_name, ctx.headers, None);
        let result = if registry.try_acquire(&key, self.rule.max, self.rule.window_secs) {
            Ok(())
        } else {
            Err(RateLimit::reject())
        };
        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryRateLimiter, RateLimitRegistry};
    use axum::extract::FromRef;
    use setu_core::guards::NoIdentity;
    use std::time::Duration;

    #[derive(Clone)]
    struct TestState {
        limiter: RateLimitRegistry,
    }

    impl FromRef<TestState> for RateLimitRegistry {
        fn from_ref(state: &TestState) -> Self {
            state.limiter.clone()
        }
    }

    #[tokio::test]
    async fn global_rule_blocks_after_max() {
        let state = TestState {
            limiter: RateLimitRegistry::new(InMemoryRateLimiter::new()),
        };
        let guard = RateLimitGuard::new(RateLimit::new(1, 60, RateLimitKeyKind::Global));
        let headers = axum::http::HeaderMap::new();
        let uri: axum::http::Uri = "/datasets".parse().unwrap();
        let ctx = GuardContext::<NoIdentity> {
            method_name: "list_datasets",
            controller_name: "datasets",
            headers: &headers,
            uri: &uri,
            path_params: setu_core::guards::PathParams::EMPTY,
            identity: None,
        };

        assert!(guard.check(&state, &ctx).await.is_ok());
        assert!(guard.check(&state, &ctx).await.is_err());
        let _ = Duration::from_secs(0);
    }
}
