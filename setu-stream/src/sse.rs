//! SSE framing. Built on `futures_util::stream::unfold` rather than a
//! pre-computed `Vec` so that `source.next_chunk()` can be raced against a
//! heartbeat tick per step — axum's `Sse` response stays pull-driven, and a
//! slow (genuinely incremental) `RowChunkSource` still gets heartbeats
//! between chunks rather than only relying on axum's own `KeepAlive` timer.
//! `KeepAlive` is kept as a belt-and-suspenders idle guard (see
//! `keep_alive()`) in case a consumer wires this stream up without ever
//! polling our heartbeat branch.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive};
use futures_util::stream::{self, Stream};
use setu_compiler::ColumnMeta;

use crate::frame::StreamFrame;
use crate::source::RowChunkSource;

/// spec.md §4.10: heartbeat every 15s when no data is pending.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

pub fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")
}

struct StreamState<S> {
    source: S,
    pending: VecDeque<StreamFrame>,
    heartbeat: tokio::time::Interval,
    chunks_sent: u64,
    rows_sent: u64,
    total_hint: Option<u64>,
    progress_interval: u64,
    stream_max_rows: Option<u64>,
    done: bool,
}

/// Build the SSE event stream for one query stream: one `metadata` frame,
/// one `data` frame per chunk with a `progress` frame every
/// `progress_interval` chunks (or on an idle heartbeat tick), then one
/// `complete` frame.
pub fn dispatch_sse<S: RowChunkSource>(
    stream_id: &str,
    dataset: &str,
    chunk_size: usize,
    columns: &[ColumnMeta],
    source: S,
    progress_interval: u64,
    stream_max_rows: Option<u64>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let mut pending = VecDeque::new();
    pending.push_back(StreamFrame::metadata(stream_id, dataset, chunk_size, columns));

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    let total_hint = source.total_rows_hint();
    let state = StreamState {
        source,
        pending,
        heartbeat,
        chunks_sent: 0,
        rows_sent: 0,
        total_hint,
        progress_interval: progress_interval.max(1),
        stream_max_rows,
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                let event = Event::default().event(frame.kind()).data(frame.to_json());
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            tokio::select! {
                biased;
                chunk = state.source.next_chunk() => {
                    match chunk {
                        Some(rows) => {
                            let row_count = rows.len() as u64;
                            if let Some(cap) = state.stream_max_rows {
                                if state.rows_sent + row_count > cap {
                                    state.done = true;
                                    state.pending.push_back(StreamFrame::Complete {
                                        total_chunks: state.chunks_sent,
                                        total_rows: state.rows_sent,
                                        truncated: true,
                                    });
                                    continue;
                                }
                            }
                            state.rows_sent += row_count;
                            state.chunks_sent += 1;
                            state.pending.push_back(StreamFrame::Data { rows });
                            if state.chunks_sent % state.progress_interval == 0 {
                                state.pending.push_back(progress_frame(&state));
                            }
                            state.heartbeat.reset();
                        }
                        None => {
                            state.done = true;
                            state.pending.push_back(StreamFrame::Complete {
                                total_chunks: state.chunks_sent,
                                total_rows: state.rows_sent,
                                truncated: false,
                            });
                        }
                    }
                }
                _ = state.heartbeat.tick() => {
                    state.pending.push_back(progress_frame(&state));
                }
            }
        }
    })
}

fn progress_frame<S>(state: &StreamState<S>) -> StreamFrame {
    let percent = state.total_hint.map(|total| {
        if total == 0 {
            100.0
        } else {
            (state.rows_sent as f64 / total as f64) * 100.0
        }
    });
    StreamFrame::Progress {
        chunks_sent: state.chunks_sent,
        rows_sent: state.rows_sent,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MaterializedRowSource;
    use futures_util::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn emits_metadata_then_data_then_complete() {
        let rows = vec![vec![json!(1)], vec![json!(2)]];
        let source = MaterializedRowSource::new(rows, 1);
        let columns = vec![ColumnMeta {
            name: "id".into(),
            column_type: setu_compiler::ColumnType::Number,
        }];
        let events: Vec<_> = dispatch_sse("s1", "orders", 1, &columns, source, 10, None)
            .collect()
            .await;
        assert_eq!(events.len(), 4); // metadata + 2 data + complete
    }

    #[tokio::test]
    async fn truncates_at_stream_max_rows() {
        let rows = vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]];
        let source = MaterializedRowSource::new(rows, 1);
        let events: Vec<_> = dispatch_sse("s1", "orders", 1, &[], source, 10, Some(1))
            .collect()
            .await;
        // metadata + 1 data + complete
        assert_eq!(events.len(), 3);
    }
}
