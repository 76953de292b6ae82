//! Single-writer recorder, spec.md §4.12: "Writes are buffered and flushed
//! periodically... Recorder failure never blocks the request path." Request
//! handlers hold a cheap `AnalyticsRecorder` clone and call
//! [`AnalyticsRecorder::record`], which never awaits the store — it only
//! pushes onto an `mpsc` channel that one background task drains.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::QueryRecord;
use crate::store::AnalyticsStore;

#[derive(Clone)]
pub struct AnalyticsRecorder {
    tx: mpsc::Sender<QueryRecord>,
}

impl AnalyticsRecorder {
    /// Queue `record` for the background writer. Drops and logs on a full
    /// channel rather than applying backpressure to the request path.
    pub fn record(&self, record: QueryRecord) {
        if let Err(err) = self.tx.try_send(record) {
            tracing::warn!(error = %err, "analytics recorder channel full, dropping record");
        }
    }
}

/// Spawns the single background writer task and returns a handle to it
/// alongside the cheap-to-clone [`AnalyticsRecorder`] front used by request
/// handlers. The task batches records arriving between flush ticks and
/// writes them in one transaction via [`AnalyticsStore::record_batch`].
pub fn spawn(
    store: Arc<dyn AnalyticsStore>,
    channel_capacity: usize,
    flush_interval: Duration,
    flush_batch_size: usize,
) -> (AnalyticsRecorder, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(channel_capacity);

    let handle = tokio::spawn(async move {
        let mut buffer: Vec<QueryRecord> = Vec::with_capacity(flush_batch_size);
        let mut interval = tokio::time::interval(flush_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                maybe_record = rx.recv() => {
                    match maybe_record {
                        Some(record) => {
                            buffer.push(record);
                            if buffer.len() >= flush_batch_size {
                                flush(&store, &mut buffer).await;
                            }
                        }
                        None => {
                            flush(&store, &mut buffer).await;
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    flush(&store, &mut buffer).await;
                }
            }
        }
    });

    (AnalyticsRecorder { tx }, handle)
}

async fn flush(store: &Arc<dyn AnalyticsStore>, buffer: &mut Vec<QueryRecord>) {
    if buffer.is_empty() {
        return;
    }
    if let Err(err) = store.record_batch(buffer).await {
        tracing::warn!(error = %err, dropped = buffer.len(), "analytics flush failed");
    }
    buffer.clear();
}
