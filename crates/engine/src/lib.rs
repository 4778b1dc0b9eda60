//! # Connector Engine
//!
//! The inference pipeline and the training queue, written against the
//! ports in `connector_core`. Nothing here knows about HTTP or SQL.
//!
//! - [`InferenceOrchestrator`]: resolve, compile context, dispatch, record
//! - [`TrainingQueueProcessor`]: batch ingestion with per-item isolation
//! - [`TrainingScheduler`]: runs batches on an interval
//! - [`TrainingMessageConsumer`]: turns inbound JSON messages into queue items

pub mod consumer;
pub mod orchestrator;
pub mod resolver;
pub mod scheduler;
pub mod training;

#[cfg(test)]
mod test_helpers;

pub use consumer::{ConsumerStats, TrainingMessageConsumer};
pub use orchestrator::{InferenceOrchestrator, InferenceSettings, shrink};
pub use resolver::RouteResolver;
pub use scheduler::TrainingScheduler;
pub use training::{BatchReport, TrainingQueueProcessor};
