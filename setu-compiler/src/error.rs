use setu_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Catalog(#[from] setu_catalog::CatalogError),

    #[error("`like` filter on {field} requires a string-typed dimension")]
    LikeRequiresString { field: String },

    #[error("`between` filter on {field} requires a 2-element array")]
    BetweenArity { field: String },

    #[error("grouped query on {dataset} has no metric and no dimension; provide at least one metric")]
    NoAggregateNoGroup { dataset: String },

    #[error("filter on {field} is missing a value")]
    MissingFilterValue { field: String },

    #[error("order_by field {field} is neither a selected dimension nor metric")]
    OrderByNotSelected { field: String },
}

impl From<CompileError> for AppError {
    fn from(err: CompileError) -> Self {
        match err {
            CompileError::Catalog(catalog_err) => catalog_err.into(),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
