pub use axum::middleware::{from_fn, from_fn_with_state, FromFnLayer, Next};
