//! Inbound training messages from an external queue.
//!
//! The transport is a plain `mpsc` channel of raw JSON bodies; whatever
//! feeds it (a broker client, a file watcher, a test) owns the connection.

use connector_core::error::Result;
use connector_core::training::TrainingMessage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::training::TrainingQueueProcessor;

/// Counts for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct TrainingMessageConsumer {
    processor: Arc<TrainingQueueProcessor>,
}

impl TrainingMessageConsumer {
    pub fn new(processor: Arc<TrainingQueueProcessor>) -> Self {
        Self { processor }
    }

    /// Parse and enqueue one raw message.
    pub async fn handle(&self, raw: &str) -> Result<i64> {
        let message: TrainingMessage = serde_json::from_str(raw)?;
        self.processor.enqueue(&message).await
    }

    /// Drain the channel until every sender is dropped. Bad messages are
    /// logged and dropped; they never stop the loop.
    pub async fn run(self, mut rx: mpsc::Receiver<String>) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        while let Some(raw) = rx.recv().await {
            match self.handle(&raw).await {
                Ok(_) => stats.accepted += 1,
                Err(e) => {
                    warn!(error = %e, "Dropping training message");
                    stats.rejected += 1;
                }
            }
        }
        info!(accepted = stats.accepted, rejected = stats.rejected, "Training consumer stopped");
        stats
    }

    pub fn spawn(self, rx: mpsc::Receiver<String>) -> JoinHandle<ConsumerStats> {
        tokio::spawn(self.run(rx))
    }
}
