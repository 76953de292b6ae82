pub mod error;
pub mod guards;
pub mod model;
pub mod request;
pub mod snapshot;
pub mod store;

pub use error::CatalogError;
pub use guards::{check_request, GuardConfig};
pub use model::{
    Dataset, Dimension, Metric, RlsPolicy, Source, SourceKind, TimeDimensionHint, ValueType,
};
pub use request::{Filter, FilterOp, OrderBy, QueryRequest, SortDirection};
pub use snapshot::{CatalogBuilder, CatalogHandle, CatalogSnapshot};
pub use store::{CatalogStore, StoredSource};

pub mod prelude {
    pub use crate::{
        CatalogBuilder, CatalogError, CatalogHandle, CatalogSnapshot, CatalogStore, Dataset,
        Dimension, Filter, FilterOp, GuardConfig, Metric, OrderBy, QueryRequest, RlsPolicy,
        Source, SourceKind, SortDirection, StoredSource, TimeDimensionHint, ValueType,
        check_request,
    };
}
