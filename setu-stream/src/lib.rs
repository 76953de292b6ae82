//! Wire-protocol framing for streamed query results: SSE, WebSocket, and
//! plain chunked HTTP bodies (NDJSON/CSV/JSON-array) all render the same
//! `StreamFrame`/`RowChunkSource` pair, per spec.md §4.10.

mod chunked;
mod frame;
mod sse;
mod source;
mod ws;

pub use chunked::{chunked_response, ChunkedFormat};
pub use frame::{FrameColumn, StreamFrame};
pub use sse::{dispatch_sse, keep_alive, HEARTBEAT_INTERVAL};
pub use source::{MaterializedRowSource, RowChunkSource};
pub use ws::dispatch_ws;

pub mod prelude {
    pub use crate::{
        chunked_response, dispatch_sse, dispatch_ws, keep_alive, ChunkedFormat, FrameColumn,
        MaterializedRowSource, RowChunkSource, StreamFrame, HEARTBEAT_INTERVAL,
    };
}
