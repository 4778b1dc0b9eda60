//! Storage adapters for the connector.
//!
//! Both backends implement every collaborator port from `connector_core::ports`
//! plus the administrative [`RouteAdmin`] operations used for seeding and
//! inspection.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use connector_config::{RouteSeed, StorageBackend, StorageConfig};
use connector_core::error::StoreError;
use connector_core::ports::{KnowledgeContextPort, RequestLogPort, RouteConfigPort, TrainingQueuePort};
use connector_core::route::RouteRule;
use connector_core::training::TrainingQueueItem;
use std::sync::Arc;
use tracing::info;

/// Route management and queue inspection.
#[async_trait]
pub trait RouteAdmin: Send + Sync {
    /// Insert a route, or update the one with the same `route_key`. The
    /// stored route id is returned; the id inside `rule` is ignored.
    async fn add_route(&self, rule: &RouteRule) -> Result<i64, StoreError>;

    async fn add_route_context(&self, route_id: i64, text: &str) -> Result<(), StoreError>;

    async fn list_routes(&self) -> Result<Vec<RouteRule>, StoreError>;

    async fn training_item(&self, id: i64) -> Result<Option<TrainingQueueItem>, StoreError>;
}

/// Everything a backend provides.
pub trait Store: RouteConfigPort + KnowledgeContextPort + RequestLogPort + TrainingQueuePort + RouteAdmin {}

impl<T> Store for T where T: RouteConfigPort + KnowledgeContextPort + RequestLogPort + TrainingQueuePort + RouteAdmin {}

/// Open the backend named in config.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StorageBackend::Sqlite => {
            if let Some(dir) = std::path::Path::new(&config.path).parent()
                && !dir.as_os_str().is_empty()
            {
                std::fs::create_dir_all(dir)
                    .map_err(|e| StoreError::Storage(format!("Cannot create {}: {e}", dir.display())))?;
            }
            let url = if config.path.starts_with("sqlite:") {
                config.path.clone()
            } else {
                format!("sqlite://{}", config.path)
            };
            Ok(Arc::new(SqliteStore::new(&url).await?))
        }
    }
}

/// Upsert the configured routes and add any route-tier snippets that are
/// not already stored. Returns the number of routes seeded.
///
/// Snippets load most-recent-first, so they are written last-to-first to
/// keep the configured order in compiled prompts.
pub async fn seed_routes(store: &dyn Store, seeds: &[RouteSeed]) -> Result<usize, StoreError> {
    for seed in seeds {
        let route_id = store.add_route(&seed.to_rule(0)).await?;
        let existing = store.load_context_snippets(route_id, usize::MAX).await?;
        for text in seed.context.iter().rev().filter(|t| !existing.contains(t)) {
            store.add_route_context(route_id, text).await?;
        }
        info!(route_key = %seed.route_key, route_id, "Seeded route");
    }
    Ok(seeds.len())
}
