//! Normalizes every `AppError` into spec.md §6's error body shape at the
//! HTTP boundary: `{error: {code, message, suggestion?, docs?}}`.
//!
//! Most component crates already bridge their own error enum into
//! `AppError::Custom` with this exact nested shape (`setu-executor`,
//! `setu-sources`, `setu-batch`); the plain `AppError` variants
//! (`NotFound`/`Unauthorized`/`Forbidden`/`BadRequest`/`Internal`) render a
//! flat `{"error": "message"}` body instead. `GatewayError` is the one
//! place that reconciles the two into a single consistent shape so every
//! route handler in this crate can just return `Result<_, GatewayError>`
//! and use `?`.

use axum::response::{IntoResponse, Response};
use axum::Json;
use setu_core::http::StatusCode;
use setu_core::AppError;

pub struct GatewayError(pub AppError);

impl<E> From<E> for GatewayError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        GatewayError(err.into())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self.0 {
            AppError::Custom { status, body } => (status, Json(body)).into_response(),
            AppError::NotFound(message) => envelope(StatusCode::NOT_FOUND, "ERR_NOT_FOUND", message),
            AppError::Unauthorized(message) => envelope(StatusCode::UNAUTHORIZED, "ERR_UNAUTHENTICATED", message),
            AppError::Forbidden(message) => envelope(StatusCode::FORBIDDEN, "ERR_FORBIDDEN", message),
            AppError::BadRequest(message) => envelope(StatusCode::BAD_REQUEST, "ERR_BAD_REQUEST", message),
            AppError::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ERR_INTERNAL",
                    "an internal error occurred".to_string(),
                )
            }
            #[cfg(feature = "validation")]
            AppError::Validation(details) => envelope(
                StatusCode::UNPROCESSABLE_ENTITY,
                "ERR_VALIDATION",
                format!("{details:?}"),
            ),
        }
    }
}

fn envelope(status: StatusCode, code: &'static str, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": { "code": code, "message": message } }))).into_response()
}

/// `setu-sql-gate` has no dependency on `setu-core` (it's a pure parser
/// crate used by other consumers too), so the `AppError` bridge for its
/// error type lives here instead of alongside the other component error
/// bridges that each crate defines for itself.
impl From<setu_sql_gate::GateError> for GatewayError {
    fn from(err: setu_sql_gate::GateError) -> Self {
        GatewayError(AppError::Custom {
            status: StatusCode::BAD_REQUEST,
            body: serde_json::json!({
                "error": { "code": "ERR_SQL_REJECTED", "message": err.to_string() }
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn not_found_renders_nested_envelope() {
        let response = GatewayError(AppError::NotFound("no such dataset".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ERR_NOT_FOUND");
        assert_eq!(body["error"]["message"], "no such dataset");
    }

    #[tokio::test]
    async fn internal_errors_redact_the_message() {
        let response = GatewayError(AppError::Internal("pool exhausted: dsn=postgres://...".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ERR_INTERNAL");
        assert_eq!(body["error"]["message"], "an internal error occurred");
    }

    #[tokio::test]
    async fn custom_errors_pass_their_body_through_unchanged() {
        let custom_body = serde_json::json!({"error": {"code": "ERR_UPSTREAM_BUSY", "message": "try again"}});
        let response = GatewayError(AppError::Custom { status: StatusCode::SERVICE_UNAVAILABLE, body: custom_body.clone() })
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await, custom_body);
    }

    #[tokio::test]
    async fn sql_gate_rejection_maps_to_400_with_stable_code() {
        let gate_err = setu_sql_gate::GateError::NotReadOnlySelect;
        let response: Response = GatewayError::from(gate_err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "ERR_SQL_REJECTED");
    }
}
