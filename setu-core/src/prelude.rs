//! Gateway prelude — import common request/response plumbing with a single `use`.
//!
//! ```ignore
//! use setu_core::prelude::*;
//!
//! async fn list_datasets(State(state): State<AppState>) -> JsonResult<Vec<Dataset>> {
//!     Ok(Json(state.catalog.datasets()))
//! }
//! ```

// ── Core types ───────────────────────────────────────────────────────────

pub use crate::config::{ConfigError, ConfigValue, FromConfigValue, SetuConfig};
pub use crate::error::AppError;
pub use crate::guards::{Guard, GuardContext, Identity, PreAuthGuard, PreAuthGuardContext};
pub use crate::interceptors::{Cacheable, Interceptor, InterceptorContext};
pub use crate::secure_headers::{secure_headers_middleware, SecureHeaders};
pub use crate::service::ServiceComponent;
pub use crate::state::SetuState;

// ── Type aliases ───────────────────────────────────────────────────────────

pub use crate::types::{ApiResult, JsonResult, StatusResult};

// ── HTTP re-exports ────────────────────────────────────────────────────────

pub use crate::http::extract::{Form, FromRef, Path, Query, State};
pub use crate::http::response::{IntoResponse, Redirect, Response};
pub use crate::http::{HeaderMap, Json, Router, StatusCode};

#[cfg(feature = "validation")]
pub use crate::validation::validate;
