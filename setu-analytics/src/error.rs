use setu_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("analytics store error: {0}")]
    Store(#[from] sqlx::Error),
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        AppError::Internal(err.to_string())
    }
}
