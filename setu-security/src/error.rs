use setu_core::http::response::{IntoResponse, Response};
use setu_core::http::StatusCode;

/// Security-related errors for API key authentication.
#[derive(Debug)]
pub enum SecurityError {
    /// The `X-API-Key` header is missing from the request.
    MissingApiKey,

    /// The key does not resolve to a known, non-revoked record.
    InvalidApiKey,
}

impl std::fmt::Display for SecurityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityError::MissingApiKey => write!(f, "Missing X-API-Key header"),
            SecurityError::InvalidApiKey => write!(f, "Invalid or revoked API key"),
        }
    }
}

impl std::error::Error for SecurityError {}

impl SecurityError {
    pub fn public_message(&self) -> &'static str {
        "Unauthorized"
    }
}

impl IntoResponse for SecurityError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.public_message() });
        (StatusCode::UNAUTHORIZED, setu_core::http::Json(body)).into_response()
    }
}

impl From<SecurityError> for setu_core::AppError {
    fn from(err: SecurityError) -> Self {
        setu_core::AppError::Unauthorized(err.public_message().to_string())
    }
}
