//! One internal frame model rendered into each wire protocol, per spec.md
//! §4.10's four mandatory frame kinds.

use serde::Serialize;
use serde_json::Value as JsonValue;
use setu_compiler::ColumnMeta;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum StreamFrame {
    Metadata {
        stream_id: String,
        dataset: String,
        chunk_size: usize,
        columns: Vec<FrameColumn>,
    },
    Data {
        rows: Vec<Vec<JsonValue>>,
    },
    Progress {
        chunks_sent: u64,
        rows_sent: u64,
        percent: Option<f64>,
    },
    Complete {
        total_chunks: u64,
        total_rows: u64,
        truncated: bool,
    },
    Error {
        code: String,
        message: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameColumn {
    pub name: String,
}

impl From<&ColumnMeta> for FrameColumn {
    fn from(meta: &ColumnMeta) -> Self {
        FrameColumn { name: meta.name.clone() }
    }
}

impl StreamFrame {
    pub fn metadata(stream_id: &str, dataset: &str, chunk_size: usize, columns: &[ColumnMeta]) -> Self {
        StreamFrame::Metadata {
            stream_id: stream_id.to_string(),
            dataset: dataset.to_string(),
            chunk_size,
            columns: columns.iter().map(FrameColumn::from).collect(),
        }
    }

    /// The SSE `event:` name for this frame, per spec.md §6: `event:
    /// <metadata|data|progress|complete|error>`.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamFrame::Metadata { .. } => "metadata",
            StreamFrame::Data { .. } => "data",
            StreamFrame::Progress { .. } => "progress",
            StreamFrame::Complete { .. } => "complete",
            StreamFrame::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"frame":"error","code":"ERR_INTERNAL","message":"frame serialization failed"}"#
                .to_string()
        })
    }

    /// Render this frame as NDJSON line(s), per spec.md §6: "metadata/
    /// progress/complete lines carry a `_kind` sentinel" — `Data` frames
    /// are the one exception, rendered as one bare row per line with no
    /// sentinel, matching the plain-row NDJSON consumers expect. Every
    /// other frame is re-tagged from SSE's `frame` field to `_kind`.
    pub fn to_ndjson_lines(&self) -> String {
        match self {
            StreamFrame::Data { rows } => {
                let mut buf = String::new();
                for row in rows {
                    buf.push_str(&serde_json::to_string(row).unwrap_or_else(|_| "[]".to_string()));
                    buf.push('\n');
                }
                buf
            }
            other => {
                let mut value = serde_json::to_value(other).unwrap_or_else(|_| serde_json::json!({}));
                if let Some(obj) = value.as_object_mut() {
                    if let Some(tag) = obj.remove("frame") {
                        obj.insert("_kind".to_string(), tag);
                    }
                }
                format!("{value}\n")
            }
        }
    }
}
