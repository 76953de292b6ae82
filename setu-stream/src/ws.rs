//! WebSocket framing atop `setu_core::ws::WsStream`. Each `send_json` call
//! awaits the underlying socket write, so the loop blocks on backpressure
//! exactly as spec.md §4.10 requires. `source.next_chunk()` is raced against
//! the heartbeat interval and the cancellation token with `tokio::select!`,
//! so a slow (genuinely incremental) source still gets heartbeats in the
//! gaps between chunks rather than only between sends.
//!
//! Cancellation: (a) a send error is treated as client disconnect and stops
//! the loop, (c) the supplied `CancellationToken` stops it on deadline or
//! explicit cancel. In-band WebSocket cancel frames (spec.md §4.10 (b))
//! require reading concurrently with writing — a follow-up to split
//! `WsStream` into sink/stream halves; until then callers that need (b)
//! should cancel the token from their own receive loop instead.

use setu_compiler::ColumnMeta;
use setu_core::ws::{WsError, WsStream};
use tokio_util::sync::CancellationToken;

use crate::frame::StreamFrame;
use crate::sse::HEARTBEAT_INTERVAL;
use crate::source::RowChunkSource;

pub async fn dispatch_ws<S: RowChunkSource>(
    ws: &mut WsStream,
    cancellation: CancellationToken,
    stream_id: &str,
    dataset: &str,
    chunk_size: usize,
    columns: &[ColumnMeta],
    mut source: S,
    progress_interval: u64,
    stream_max_rows: Option<u64>,
) -> Result<(), WsError> {
    ws.send_json(&StreamFrame::metadata(stream_id, dataset, chunk_size, columns))
        .await?;

    let mut chunks_sent = 0u64;
    let mut rows_sent = 0u64;
    let mut truncated = false;
    let total_hint = source.total_rows_hint();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately, discard it

    'outer: loop {
        let rows = loop {
            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(WsError::Closed),
                chunk = source.next_chunk() => break chunk,
                _ = heartbeat.tick() => {
                    ws.send_json(&StreamFrame::Progress {
                        chunks_sent,
                        rows_sent,
                        percent: None,
                    })
                    .await?;
                    continue;
                }
            }
        };
        let Some(rows) = rows else { break 'outer };

        let row_count = rows.len() as u64;
        if let Some(cap) = stream_max_rows {
            if rows_sent + row_count > cap {
                truncated = true;
                break 'outer;
            }
        }
        rows_sent += row_count;
        chunks_sent += 1;

        tokio::select! {
            res = ws.send_json(&StreamFrame::Data { rows }) => res?,
            _ = cancellation.cancelled() => return Err(WsError::Closed),
        }
        heartbeat.reset();

        if chunks_sent % progress_interval.max(1) == 0 {
            let percent = total_hint.map(|total| {
                if total == 0 {
                    100.0
                } else {
                    (rows_sent as f64 / total as f64) * 100.0
                }
            });
            ws.send_json(&StreamFrame::Progress {
                chunks_sent,
                rows_sent,
                percent,
            })
            .await?;
        }
    }

    ws.send_json(&StreamFrame::Complete {
        total_chunks: chunks_sent,
        total_rows: rows_sent,
        truncated,
    })
    .await
}
