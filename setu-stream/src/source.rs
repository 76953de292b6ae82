use serde_json::Value as JsonValue;

/// Incremental supplier of row chunks. `next_chunk` is `async` so the
/// dispatch loops can race it against a heartbeat interval with
/// `tokio::select!` — a source backed by genuine upstream I/O resolves
/// slowly and lets heartbeats fire in the gaps; `MaterializedRowSource`
/// (what `setu-executor` feeds today, since it materializes the full
/// result before streaming starts) resolves immediately every time.
pub trait RowChunkSource: Send {
    fn next_chunk(
        &mut self,
    ) -> impl std::future::Future<Output = Option<Vec<Vec<JsonValue>>>> + Send;

    fn total_rows_hint(&self) -> Option<u64> {
        None
    }
}

pub struct MaterializedRowSource {
    rows: std::vec::IntoIter<Vec<JsonValue>>,
    chunk_size: usize,
    total: u64,
}

impl MaterializedRowSource {
    pub fn new(rows: Vec<Vec<JsonValue>>, chunk_size: usize) -> Self {
        let total = rows.len() as u64;
        Self {
            rows: rows.into_iter(),
            chunk_size: chunk_size.max(1),
            total,
        }
    }
}

impl RowChunkSource for MaterializedRowSource {
    async fn next_chunk(&mut self) -> Option<Vec<Vec<JsonValue>>> {
        let chunk: Vec<_> = (&mut self.rows).take(self.chunk_size).collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    fn total_rows_hint(&self) -> Option<u64> {
        Some(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chunks_rows_by_size() {
        let rows: Vec<Vec<JsonValue>> = (0..5).map(|i| vec![JsonValue::from(i)]).collect();
        let mut source = MaterializedRowSource::new(rows, 2);
        assert_eq!(source.next_chunk().await.unwrap().len(), 2);
        assert_eq!(source.next_chunk().await.unwrap().len(), 2);
        assert_eq!(source.next_chunk().await.unwrap().len(), 1);
        assert!(source.next_chunk().await.is_none());
    }
}
