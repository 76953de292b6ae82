//! Chunked HTTP body framing for clients that want a plain streaming
//! response instead of SSE or WebSocket: newline-delimited JSON, CSV, or a
//! single streamed JSON array. All three reuse `RowChunkSource` and are
//! built on `stream::unfold` the same way `sse::dispatch_sse` is, so a
//! slow/incremental source still yields bytes to the body as soon as each
//! chunk is ready rather than buffering the whole response.

use std::collections::VecDeque;
use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::Value as JsonValue;
use setu_compiler::ColumnMeta;

use crate::frame::StreamFrame;
use crate::sse::HEARTBEAT_INTERVAL;
use crate::source::RowChunkSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkedFormat {
    Ndjson,
    Csv,
    JsonArray,
}

impl ChunkedFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ChunkedFormat::Ndjson => "application/x-ndjson",
            ChunkedFormat::Csv => "text/csv; charset=utf-8",
            ChunkedFormat::JsonArray => "application/json",
        }
    }
}

/// Drive `source` to completion and stream it as `format`, returning a
/// ready-to-serve response with the right `Content-Type`. `stream_id`/
/// `dataset`/`progress_interval`/`stream_max_rows` only matter for
/// `Ndjson`, which frames `metadata`/`progress`/`complete` lines the same
/// way `dispatch_sse`/`dispatch_ws` do (spec.md §4.10); `Csv`/`JsonArray`
/// are plain row data with no frame envelope and ignore them.
#[allow(clippy::too_many_arguments)]
pub fn chunked_response<S: RowChunkSource + 'static>(
    format: ChunkedFormat,
    stream_id: &str,
    dataset: &str,
    chunk_size: usize,
    columns: Vec<ColumnMeta>,
    source: S,
    progress_interval: u64,
    stream_max_rows: Option<u64>,
) -> Response {
    let body_stream = match format {
        ChunkedFormat::Ndjson => ndjson_stream(
            stream_id,
            dataset,
            chunk_size,
            &columns,
            source,
            progress_interval,
            stream_max_rows,
        )
        .boxed(),
        ChunkedFormat::Csv => csv_stream(columns, source).boxed(),
        ChunkedFormat::JsonArray => json_array_stream(source).boxed(),
    };
    let mut response = Response::new(Body::from_stream(body_stream));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, format.content_type().parse().unwrap());
    response.into_response()
}

struct NdjsonState<S> {
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

/// NDJSON framing: one `metadata` line, one `data` line per row with a
/// `progress` line every `progress_interval` chunks (or on an idle
/// heartbeat), then one `complete` line — the same frame sequence
/// `dispatch_sse` renders as SSE events, re-tagged via
/// `StreamFrame::to_ndjson_lines`.
fn ndjson_stream<S: RowChunkSource + 'static>(
    stream_id: &str,
    dataset: &str,
    chunk_size: usize,
    columns: &[ColumnMeta],
    source: S,
    progress_interval: u64,
    stream_max_rows: Option<u64>,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let mut pending = VecDeque::new();
    pending.push_back(StreamFrame::metadata(stream_id, dataset, chunk_size, columns));

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.reset();

    let total_hint = source.total_rows_hint();
    let state = NdjsonState {
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
                return Some((Ok(Bytes::from(frame.to_ndjson_lines())), state));
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
                                state.pending.push_back(ndjson_progress_frame(&state));
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
                    state.pending.push_back(ndjson_progress_frame(&state));
                }
            }
        }
    })
}

fn ndjson_progress_frame<S>(state: &NdjsonState<S>) -> StreamFrame {
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

fn csv_stream<S: RowChunkSource + 'static>(
    columns: Vec<ColumnMeta>,
    source: S,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let header = {
        let mut line = columns
            .iter()
            .map(|c| csv_escape(&c.name))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    };
    let header_chunk = stream::once(async move { Ok(Bytes::from(header)) });
    let rows_chunk = stream::unfold(source, |mut source| async move {
        let rows = source.next_chunk().await?;
        let mut buf = String::new();
        for row in rows {
            let line = row.iter().map(csv_cell).collect::<Vec<_>>().join(",");
            buf.push_str(&line);
            buf.push('\n');
        }
        Some((Ok(Bytes::from(buf)), source))
    });
    header_chunk.chain(rows_chunk)
}

fn json_array_stream<S: RowChunkSource + 'static>(
    source: S,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let open = stream::once(async { Ok(Bytes::from_static(b"[")) });
    let rows_chunk = stream::unfold(
        (source, true),
        |(mut source, first)| async move {
            let rows = source.next_chunk().await?;
            let mut buf = String::new();
            let mut first = first;
            for row in rows {
                if !first {
                    buf.push(',');
                }
                first = false;
                buf.push_str(&serde_json::to_string(&row).unwrap_or_else(|_| "[]".to_string()));
            }
            Some((Ok(Bytes::from(buf)), (source, first)))
        },
    );
    let close = stream::once(async { Ok(Bytes::from_static(b"]")) });
    open.chain(rows_chunk).chain(close)
}

fn csv_cell(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => csv_escape(s),
        other => csv_escape(&other.to_string()),
    }
}

fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MaterializedRowSource;
    use serde_json::json;

    async fn collect_body(stream: impl Stream<Item = Result<Bytes, Infallible>>) -> String {
        futures_util::pin_mut!(stream);
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(std::str::from_utf8(&chunk.unwrap()).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn ndjson_emits_metadata_data_and_complete_lines() {
        let rows = vec![vec![json!(1)], vec![json!(2)]];
        let source = MaterializedRowSource::new(rows, 1);
        let columns = vec![ColumnMeta {
            name: "id".into(),
            column_type: setu_compiler::ColumnType::Number,
        }];
        let out = collect_body(ndjson_stream("s1", "orders", 1, &columns, source, 10, None)).await;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4); // metadata + 2 bare data rows + complete
        assert!(lines[0].contains(r#""_kind":"metadata""#));
        assert_eq!(lines[1], "[1]");
        assert_eq!(lines[2], "[2]");
        assert!(lines[3].contains(r#""_kind":"complete""#));
        assert!(lines[3].contains(r#""total_rows":2"#));
    }

    #[tokio::test]
    async fn ndjson_emits_at_least_one_progress_line_before_completing() {
        // 3523 rows at chunk_size 1000 => data chunks (1000,1000,1000,523),
        // a progress line every chunk (progress_interval=1), then complete.
        let rows: Vec<Vec<JsonValue>> = (0..3523).map(|i| vec![json!(i)]).collect();
        let source = MaterializedRowSource::new(rows, 1000);
        let out = collect_body(ndjson_stream("s1", "orders", 1000, &[], source, 1, None)).await;
        let lines: Vec<&str> = out.lines().collect();
        let progress_lines = lines.iter().filter(|l| l.contains(r#""_kind":"progress""#)).count();
        let complete_lines: Vec<&&str> = lines.iter().filter(|l| l.contains(r#""_kind":"complete""#)).collect();
        assert!(progress_lines >= 1);
        assert_eq!(complete_lines.len(), 1);
        assert!(complete_lines[0].contains(r#""total_rows":3523"#));
    }

    #[tokio::test]
    async fn csv_includes_header_and_escapes_commas() {
        let rows = vec![vec![json!("a,b")]];
        let source = MaterializedRowSource::new(rows, 10);
        let columns = vec![ColumnMeta {
            name: "note".into(),
            column_type: setu_compiler::ColumnType::String,
        }];
        let out = collect_body(csv_stream(columns, source)).await;
        assert_eq!(out, "note\n\"a,b\"\n");
    }

    #[tokio::test]
    async fn json_array_joins_rows_with_commas() {
        let rows = vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]];
        let source = MaterializedRowSource::new(rows, 1);
        let out = collect_body(json_array_stream(source)).await;
        assert_eq!(out, "[[1],[2],[3]]");
    }
}
