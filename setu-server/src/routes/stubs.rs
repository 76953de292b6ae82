//! External-shaper endpoints, spec.md §6 and §9's NLQ open question.
//!
//! `/v1/graphql`, `/v1/odata/*`, and `/v1/tableau/wdc` are shapers that live
//! outside this gateway and call back into `/v1/query`/`/v1/sql`; there is no
//! GraphQL/OData/WDC crate anywhere in this workspace to ground an
//! implementation on, so each responds `501 Not Implemented` with a pointer
//! at the stable surface a shaper should target instead. `/v1/nlq` is the
//! same shape of gap — spec.md §9 fixes the *interface* (translator returns
//! a semantic query or an error with suggestions) without prescribing a
//! provider, so `provider` selects nothing here and every request 501s.

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use setu_security::Principal;

use crate::error::GatewayError;

fn not_implemented(hint: &str) -> Response {
    (
        setu_core::http::StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "error": {
                "code": "ERR_NOT_IMPLEMENTED",
                "message": "this shaper is not implemented by the gateway itself",
                "suggestion": hint,
            }
        })),
    )
        .into_response()
}

pub async fn graphql(_principal: Principal, Json(_body): Json<JsonValue>) -> Result<Response, GatewayError> {
    Ok(not_implemented("call POST /v1/query or /v1/batch directly; a GraphQL shaper sits in front of those"))
}

pub async fn odata(_principal: Principal) -> Result<Response, GatewayError> {
    Ok(not_implemented("call GET /v1/datasets for catalog metadata and POST /v1/query for data"))
}

pub async fn tableau_wdc(_principal: Principal) -> Result<Response, GatewayError> {
    Ok(not_implemented("a WDC connector should translate its schema discovery into GET /v1/datasets and rows into POST /v1/query"))
}

#[derive(Debug, Deserialize)]
pub struct NlqRequest {
    pub question: String,
    pub dataset: String,
    pub provider: Option<String>,
    #[serde(default)]
    pub execute: bool,
}

#[derive(Debug, Serialize)]
struct NlqError {
    code: &'static str,
    message: String,
    suggestions: Vec<String>,
}

pub async fn nlq(_principal: Principal, Json(request): Json<NlqRequest>) -> Result<Response, GatewayError> {
    Ok((
        setu_core::http::StatusCode::NOT_IMPLEMENTED,
        Json(NlqError {
            code: "ERR_NLQ_UNAVAILABLE",
            message: format!(
                "no natural-language translator is configured for dataset `{}`{}",
                request.dataset,
                request
                    .provider
                    .as_ref()
                    .map(|p| format!(" (provider `{p}` requested)"))
                    .unwrap_or_default()
            ),
            suggestions: vec![format!(
                "translate \"{}\" into a QueryRequest yourself and call POST /v1/query",
                request.question
            )],
        }),
    )
        .into_response())
}
