pub use axum::response::sse::{Event as SseEvent, KeepAlive as SseKeepAlive, Sse};
pub use axum::response::{Html, IntoResponse, Redirect, Response};
