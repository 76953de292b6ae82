mod error;
mod model;
mod recorder;
mod sqlite_store;
mod store;

pub use error::AnalyticsError;
pub use model::{AnalyticsQuery, QueryRecord};
pub use recorder::{spawn, AnalyticsRecorder};
pub use sqlite_store::SqliteAnalyticsStore;
pub use store::AnalyticsStore;

pub mod prelude {
    pub use crate::{spawn, AnalyticsError, AnalyticsQuery, AnalyticsRecorder, AnalyticsStore, QueryRecord, SqliteAnalyticsStore};
}
