//! Collaborator ports consumed by the engine.
//!
//! Storage adapters implement the async ports; the provider registry
//! implements [`ProviderCatalog`]. Everything is passed in as
//! `Arc<dyn Port>` at construction time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::provider::{ProviderClient, ProviderInfo};
use crate::route::RouteConfig;
use crate::training::{TrainingMessage, TrainingQueueItem};

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Route lookup and route-tier context.
#[async_trait]
pub trait RouteConfigPort: Send + Sync {
    /// Best enabled route for the pair, ranked exact-characteristic first,
    /// then by ascending priority.
    async fn resolve_route(&self, data_type: &str, characteristic: &str) -> StoreResult<Option<RouteConfig>>;

    /// Route-tier snippets, most recent first.
    async fn load_context_snippets(&self, route_id: i64, limit: usize) -> StoreResult<Vec<String>>;
}

/// Module- and profile-tier knowledge.
#[async_trait]
pub trait KnowledgeContextPort: Send + Sync {
    async fn load_module_context(&self, route_id: i64, module_key: &str, limit: usize) -> StoreResult<Vec<String>>;

    async fn load_profile_context(&self, profile_id: &str, module_key: &str, limit: usize) -> StoreResult<Vec<String>>;

    async fn save_module_context(
        &self,
        route_id: i64,
        module_key: &str,
        text: &str,
        source_type: &str,
    ) -> StoreResult<()>;

    async fn save_profile_context(
        &self,
        profile_id: &str,
        module_key: &str,
        text: &str,
        source_type: &str,
    ) -> StoreResult<()>;
}

/// One audit row written after a successful provider call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub route_key: String,
    pub provider: String,
    pub model: String,
    pub request_summary: String,
    pub response_summary: String,
}

#[async_trait]
pub trait RequestLogPort: Send + Sync {
    async fn save_request_log(&self, entry: &RequestLogEntry) -> StoreResult<()>;
}

#[async_trait]
pub trait TrainingQueuePort: Send + Sync {
    /// Up to `batch_size` `PENDING` items, oldest first.
    async fn fetch_pending(&self, batch_size: usize) -> StoreResult<Vec<TrainingQueueItem>>;

    async fn mark_done(&self, id: i64) -> StoreResult<()>;

    async fn mark_failed(&self, id: i64, reason: &str) -> StoreResult<()>;

    /// Persist a new `PENDING` item and return its id.
    async fn enqueue(&self, message: &TrainingMessage) -> StoreResult<i64>;
}

/// Name-keyed lookup of provider clients.
pub trait ProviderCatalog: Send + Sync {
    /// Case-insensitive lookup; `UnsupportedProvider` when absent.
    fn require(&self, name: &str) -> Result<Arc<dyn ProviderClient>>;

    /// Catalog entries sorted case-insensitively by name.
    fn list_providers(&self) -> Vec<ProviderInfo>;
}
