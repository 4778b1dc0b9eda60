//! Periodic training batches.

use connector_config::TrainingConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::training::TrainingQueueProcessor;

/// Runs [`TrainingQueueProcessor::run_batch`] on a fixed interval.
///
/// The first batch runs immediately. A batch that outlasts the interval
/// delays the next tick instead of stacking runs.
pub struct TrainingScheduler {
    processor: Arc<TrainingQueueProcessor>,
    batch_size: usize,
    every: Duration,
}

impl TrainingScheduler {
    pub fn new(processor: Arc<TrainingQueueProcessor>, batch_size: usize, every: Duration) -> Self {
        Self {
            processor,
            batch_size,
            every: every.max(Duration::from_secs(1)),
        }
    }

    pub fn from_config(processor: Arc<TrainingQueueProcessor>, config: &TrainingConfig) -> Self {
        Self::new(processor, config.batch_size, Duration::from_secs(config.every_secs))
    }

    /// Spawn the loop, or return `None` when training is disabled.
    pub fn spawn_if_enabled(processor: Arc<TrainingQueueProcessor>, config: &TrainingConfig) -> Option<JoinHandle<()>> {
        if !config.enabled {
            info!("Training scheduler disabled");
            return None;
        }
        Some(Self::from_config(processor, config).spawn())
    }

    /// Run forever on the current runtime. Abort the handle to stop.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            every_secs = self.every.as_secs(),
            batch_size = self.batch_size,
            "Training scheduler started"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.processor.run_batch(self.batch_size).await {
                    warn!(error = %e, "Training batch could not run");
                }
            }
        })
    }
}
