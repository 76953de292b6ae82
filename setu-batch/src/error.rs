use setu_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("dependency graph has a cycle")]
    CycleDetected,

    #[error("sub-query {0:?} depends on unknown id {1:?}")]
    UnknownDependency(String, String),

    #[error("sub-query ids must be unique, duplicate: {0:?}")]
    DuplicateId(String),

    #[error("$ref token {0:?} is malformed")]
    MalformedRef(String),

    #[error("$ref token {token:?} references row {row} of {id:?}, which has only {available} rows")]
    RefRowOutOfRange {
        token: String,
        id: String,
        row: usize,
        available: usize,
    },

    #[error("$ref token {token:?} references unknown field {field:?} on {id:?}")]
    RefFieldNotFound { token: String, id: String, field: String },

    #[error("$ref token {0:?} references a dependency that did not succeed")]
    RefOnFailedDependency(String),

    #[error("transaction=true requires every sub-query to target the same source")]
    TransactionCrossSource,

    #[error("unknown dataset {0:?}")]
    UnknownDataset(String),

    #[error("transaction=true is not supported by this source's adapter")]
    TransactionUnsupported,

    #[error("batch deadline exceeded")]
    DeadlineExceeded,
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        let code = match &err {
            BatchError::CycleDetected => "ERR_BATCH_CYCLE",
            BatchError::UnknownDependency(..) => "ERR_BATCH_UNKNOWN_DEPENDENCY",
            BatchError::DuplicateId(_) => "ERR_BATCH_DUPLICATE_ID",
            BatchError::MalformedRef(_) => "ERR_BATCH_BAD_REF",
            BatchError::RefRowOutOfRange { .. } => "ERR_BATCH_REF_RANGE",
            BatchError::RefFieldNotFound { .. } => "ERR_BATCH_REF_FIELD",
            BatchError::RefOnFailedDependency(_) => "ERR_BATCH_REF_FAILED_DEP",
            BatchError::TransactionCrossSource => "ERR_BATCH_TRANSACTION_CROSS_SOURCE",
            BatchError::UnknownDataset(_) => "ERR_BATCH_UNKNOWN_DATASET",
            BatchError::TransactionUnsupported => "ERR_BATCH_TRANSACTION_UNSUPPORTED",
            BatchError::DeadlineExceeded => "ERR_BATCH_DEADLINE",
        };
        AppError::Custom {
            status: setu_core::http::StatusCode::BAD_REQUEST,
            body: serde_json::json!({ "error": { "code": code, "message": err.to_string() } }),
        }
    }
}
