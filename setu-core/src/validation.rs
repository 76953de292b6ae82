use crate::http::response::{IntoResponse, Response};
use crate::http::{Json, StatusCode};
use serde::Serialize;

// ── Error types ────────────────────────────────────────────

/// A field-level validation error.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

/// Container for validation errors, used as the payload of `AppError::Validation`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationErrorResponse {
    pub errors: Vec<FieldError>,
}

// ── Direct validation entry point ───────────────────────────

/// Validate a value against its `garde::Validate` rules.
///
/// Returns a ready-made 400 response with field-level detail on failure,
/// suitable for returning straight from an extractor or handler.
pub fn validate<T>(value: &T) -> Result<(), Response>
where
    T: garde::Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| convert_garde_report(&report))
}

fn convert_garde_report(report: &garde::Report) -> Response {
    let mut field_errors = Vec::new();

    for (path, error) in report.iter() {
        let field = {
            let s = path.to_string();
            if s.is_empty() { "value".to_string() } else { s }
        };
        field_errors.push(FieldError {
            field,
            message: error.message().to_string(),
            code: "validation".to_string(),
        });
    }

    let resp = ValidationErrorResponse {
        errors: field_errors,
    };

    let body = serde_json::json!({
        "error": "Validation failed",
        "details": resp.errors,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

// Re-export garde::Validate for convenience.
pub use garde::Validate;
