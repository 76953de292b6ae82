//! Catalog errors, bridged into `setu_core::AppError` the way `r2e-data`'s
//! `DataError` bridges into the teacher's `AppError`.

use setu_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("source not found: {0}")]
    SourceNotFound(String),

    #[error("dataset {dataset} references unknown source {source}")]
    UnknownSource { dataset: String, source: String },

    #[error("dataset {dataset} has a duplicate dimension/metric name: {field}")]
    DuplicateField { dataset: String, field: String },

    #[error("dataset {dataset} has an RLS policy referencing missing column {field}")]
    MissingRlsColumn { dataset: String, field: String },

    #[error("dataset {dataset} requires at least one dimension or metric")]
    EmptySelection { dataset: String },

    #[error("too many {kind} requested (max {max})")]
    TooManyFields { kind: &'static str, max: usize },

    #[error("limit {limit} out of range (max {max})")]
    LimitOutOfRange { limit: u64, max: u64 },

    #[error("dataset {dataset} has no field named {field}")]
    UnknownField { dataset: String, field: String },

    #[error("catalog storage error: {0}")]
    Storage(String),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::DatasetNotFound(ref id) => AppError::NotFound(format!("dataset '{id}'")),
            CatalogError::SourceNotFound(ref id) => AppError::NotFound(format!("source '{id}'")),
            CatalogError::Storage(ref msg) => AppError::Internal(msg.clone()),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
