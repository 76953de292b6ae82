pub use axum::extract::{
    ConnectInfo, DefaultBodyLimit, FromRef, FromRequest, FromRequestParts, MatchedPath,
    OptionalFromRequestParts, OriginalUri, Path, Query, RawPathParams, Request, State,
};
pub use axum::Form;
