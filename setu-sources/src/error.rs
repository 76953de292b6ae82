use setu_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source '{0}' is not registered")]
    NotFound(String),

    #[error("pool checkout timed out for source '{0}'")]
    UpstreamBusy(String),

    #[error("connection to source '{0}' failed: {1}")]
    ConnectFailed(String, String),

    #[error("query against source '{0}' failed: {1}")]
    QueryFailed(String, String),

    #[error("result exceeded row cap of {0}")]
    RowLimitExceeded(usize),

    #[error("health check failed for source '{0}'")]
    Unhealthy(String),

    #[error("source '{0}' does not support raw SQL execution")]
    RawSqlUnsupported(String),
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        match &err {
            SourceError::NotFound(_) => AppError::NotFound(err.to_string()),
            SourceError::UpstreamBusy(_) => {
                AppError::Custom {
                    status: setu_core::http::StatusCode::SERVICE_UNAVAILABLE,
                    body: serde_json::json!({
                        "error": { "code": "ERR_UPSTREAM_BUSY", "message": err.to_string() }
                    }),
                }
            }
            SourceError::RowLimitExceeded(_) => AppError::Custom {
                status: setu_core::http::StatusCode::UNPROCESSABLE_ENTITY,
                body: serde_json::json!({
                    "error": { "code": "ERR_ROW_LIMIT", "message": err.to_string() }
                }),
            },
            SourceError::ConnectFailed(..) | SourceError::Unhealthy(_) => {
                AppError::Internal(err.to_string())
            }
            SourceError::QueryFailed(..) => AppError::BadRequest(err.to_string()),
            SourceError::RawSqlUnsupported(_) => AppError::BadRequest(err.to_string()),
        }
    }
}
