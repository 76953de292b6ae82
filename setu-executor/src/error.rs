use setu_core::AppError;
use setu_sources::SourceError;

/// Error kinds from spec.md §7, restricted to the ones the executor itself
/// can raise (auth/rate-limit/guard/gate/RLS kinds live in their own
/// crates and bridge into `AppError` directly).
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("upstream source is busy")]
    UpstreamBusy,

    #[error("upstream query timed out")]
    UpstreamTimeout,

    #[error("upstream error: {0}")]
    UpstreamError(String),

    #[error("request was cancelled")]
    Cancelled,

    #[error("result exceeded the row cap of {0}")]
    RowLimit(usize),
}

impl From<SourceError> for ExecutorError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::UpstreamBusy(_) => ExecutorError::UpstreamBusy,
            SourceError::RowLimitExceeded(max) => ExecutorError::RowLimit(max),
            other => ExecutorError::UpstreamError(other.to_string()),
        }
    }
}

impl From<ExecutorError> for AppError {
    fn from(err: ExecutorError) -> Self {
        let (code, status) = match &err {
            ExecutorError::UpstreamBusy => {
                ("ERR_UPSTREAM_BUSY", setu_core::http::StatusCode::SERVICE_UNAVAILABLE)
            }
            ExecutorError::UpstreamTimeout => {
                ("ERR_UPSTREAM_TIMEOUT", setu_core::http::StatusCode::GATEWAY_TIMEOUT)
            }
            ExecutorError::UpstreamError(_) => {
                ("ERR_UPSTREAM_ERROR", setu_core::http::StatusCode::BAD_GATEWAY)
            }
            ExecutorError::Cancelled => {
                ("ERR_CANCELLED", setu_core::http::StatusCode::from_u16(499).unwrap())
            }
            ExecutorError::RowLimit(_) => {
                ("ERR_ROW_LIMIT", setu_core::http::StatusCode::UNPROCESSABLE_ENTITY)
            }
        };
        AppError::Custom {
            status,
            body: serde_json::json!({ "error": { "code": code, "message": err.to_string() } }),
        }
    }
}
