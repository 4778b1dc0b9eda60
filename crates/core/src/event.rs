//! Connector events: fire-and-forget audit signals.
//!
//! Events are published after an inference or a training item completes.
//! Publication is best-effort: callers log a failed publish and move on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    InferenceCompleted,
    TrainingItemProcessed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::InferenceCompleted => "INFERENCE_COMPLETED",
            EventType::TrainingItemProcessed => "TRAINING_ITEM_PROCESSED",
        }
    }
}

/// Status value carried by events emitted after a successful operation.
pub const STATUS_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorEvent {
    pub event_type: EventType,
    pub route_key: String,
    pub provider: String,
    pub model: String,
    pub status: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

impl ConnectorEvent {
    pub fn success(
        event_type: EventType,
        route_key: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            route_key: route_key.into(),
            provider: provider.into(),
            model: model.into(),
            status: STATUS_SUCCESS.into(),
            details: details.into(),
            created_at: Utc::now(),
        }
    }
}

/// Why an event could not be published.
#[derive(Debug, thiserror::Error)]
#[error("Event publication failed: {0}")]
pub struct PublishError(pub String);

/// Outbound event sink.
///
/// Implementations report failures through the result; the orchestrator
/// logs and discards them.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: ConnectorEvent) -> Result<(), PublishError>;
}

/// A broadcast-based, in-process event bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub. Publishing with
/// no subscribers is not an error.
pub struct EventBus {
    sender: broadcast::Sender<Arc<ConnectorEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ConnectorEvent>> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: ConnectorEvent) -> Result<(), PublishError> {
        // No subscribers = nothing to deliver, that's fine
        let _ = self.sender.send(Arc::new(event));
        Ok(())
    }
}
