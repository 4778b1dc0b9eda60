//! Training queue processing.
//!
//! Items are fetched in batches and ingested one at a time. One item's
//! failure is recorded on that item and never stops the batch.

use connector_core::error::Result;
use connector_core::ports::TrainingQueuePort;
use connector_core::training::{TrainingMessage, TrainingQueueItem};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::orchestrator::InferenceOrchestrator;

/// Outcome counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub fetched: usize,
    pub done: usize,
    pub failed: usize,
}

pub struct TrainingQueueProcessor {
    queue: Arc<dyn TrainingQueuePort>,
    orchestrator: Arc<InferenceOrchestrator>,
}

impl TrainingQueueProcessor {
    pub fn new(queue: Arc<dyn TrainingQueuePort>, orchestrator: Arc<InferenceOrchestrator>) -> Self {
        Self { queue, orchestrator }
    }

    /// Validate and persist a message as a `PENDING` item.
    pub async fn enqueue(&self, message: &TrainingMessage) -> Result<i64> {
        message.validate()?;
        let id = self.queue.enqueue(message).await?;
        info!(
            id,
            data_type = %message.data_type,
            characteristic = %message.data_characteristic,
            "Training item queued"
        );
        Ok(id)
    }

    /// Process up to `batch_size` pending items.
    ///
    /// Only the fetch can fail the whole call.
    pub async fn run_batch(&self, batch_size: usize) -> Result<BatchReport> {
        let items = self.queue.fetch_pending(batch_size).await?;
        let mut report = BatchReport {
            fetched: items.len(),
            ..BatchReport::default()
        };
        if items.is_empty() {
            debug!("No pending training items");
            return Ok(report);
        }

        for item in &items {
            if self.process(item).await {
                report.done += 1;
            } else {
                report.failed += 1;
            }
        }

        info!(
            fetched = report.fetched,
            done = report.done,
            failed = report.failed,
            "Training batch finished"
        );
        Ok(report)
    }

    /// Ingest one item and settle its status. Returns whether it is `DONE`.
    async fn process(&self, item: &TrainingQueueItem) -> bool {
        let outcome = match self.orchestrator.ingest_training_item(item).await {
            Ok(_) => self.queue.mark_done(item.id).await.map_err(Into::into),
            Err(e) => Err(e),
        };

        let Err(e) = outcome else {
            debug!(id = item.id, "Training item done");
            return true;
        };

        warn!(id = item.id, error = %e, "Training item failed");
        if let Err(mark_err) = self.queue.mark_failed(item.id, &e.to_string()).await {
            error!(id = item.id, error = %mark_err, "Could not mark training item as failed");
        }
        false
    }
}
