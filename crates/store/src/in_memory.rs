//! In-memory store: useful for testing and ephemeral deployments.
//!
//! All tables live behind one `RwLock`. Rows are appended in write order, so
//! "most recent first" is simply reverse insertion order.

use async_trait::async_trait;
use connector_core::error::StoreError;
use connector_core::ports::{
    KnowledgeContextPort, RequestLogEntry, RequestLogPort, RouteConfigPort, TrainingQueuePort,
};
use connector_core::route::{RouteConfig, RouteRule, select_route};
use connector_core::training::{TrainingMessage, TrainingQueueItem, TrainingStatus};
use tokio::sync::RwLock;

use crate::RouteAdmin;

/// A module- or profile-tier row written by training ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedContext {
    pub scope: Scope,
    pub module_key: String,
    pub text: String,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Module(i64),
    Profile(String),
}

#[derive(Default)]
struct Tables {
    routes: Vec<RouteRule>,
    route_context: Vec<(i64, String)>,
    knowledge: Vec<LearnedContext>,
    request_logs: Vec<RequestLogEntry>,
    queue: Vec<TrainingQueueItem>,
    next_route_id: i64,
    next_item_id: i64,
}

/// A store that keeps every table in process memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every audit row written so far, oldest first.
    pub async fn request_logs(&self) -> Vec<RequestLogEntry> {
        self.tables.read().await.request_logs.clone()
    }

    /// Every learned module/profile row, oldest first.
    pub async fn learned_context(&self) -> Vec<LearnedContext> {
        self.tables.read().await.knowledge.clone()
    }

    /// Every queued item, in enqueue order.
    pub async fn training_items(&self) -> Vec<TrainingQueueItem> {
        self.tables.read().await.queue.clone()
    }

    async fn set_status(&self, id: i64, status: TrainingStatus, reason: Option<&str>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let item = tables
            .queue
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| StoreError::QueryFailed(format!("training item {id} not found")))?;
        item.status = status;
        item.last_error = reason.map(str::to_string);
        Ok(())
    }

    async fn recent(&self, scope: Scope, module_key: &str, limit: usize) -> Vec<String> {
        self.tables
            .read()
            .await
            .knowledge
            .iter()
            .rev()
            .filter(|row| row.scope == scope && row.module_key == module_key)
            .take(limit)
            .map(|row| row.text.clone())
            .collect()
    }

    async fn push_knowledge(&self, scope: Scope, module_key: &str, text: &str, source_type: &str) {
        self.tables.write().await.knowledge.push(LearnedContext {
            scope,
            module_key: module_key.to_string(),
            text: text.to_string(),
            source_type: source_type.to_string(),
        });
    }
}

#[async_trait]
impl RouteConfigPort for InMemoryStore {
    async fn resolve_route(&self, data_type: &str, characteristic: &str) -> Result<Option<RouteConfig>, StoreError> {
        let tables = self.tables.read().await;
        Ok(select_route(&tables.routes, data_type, characteristic).cloned())
    }

    async fn load_context_snippets(&self, route_id: i64, limit: usize) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .route_context
            .iter()
            .rev()
            .filter(|(id, _)| *id == route_id)
            .take(limit)
            .map(|(_, text)| text.clone())
            .collect())
    }
}

#[async_trait]
impl KnowledgeContextPort for InMemoryStore {
    async fn load_module_context(&self, route_id: i64, module_key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self.recent(Scope::Module(route_id), module_key, limit).await)
    }

    async fn load_profile_context(&self, profile_id: &str, module_key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(self.recent(Scope::Profile(profile_id.to_string()), module_key, limit).await)
    }

    async fn save_module_context(&self, route_id: i64, module_key: &str, text: &str, source_type: &str) -> Result<(), StoreError> {
        self.push_knowledge(Scope::Module(route_id), module_key, text, source_type).await;
        Ok(())
    }

    async fn save_profile_context(
        &self,
        profile_id: &str,
        module_key: &str,
        text: &str,
        source_type: &str,
    ) -> Result<(), StoreError> {
        self.push_knowledge(Scope::Profile(profile_id.to_string()), module_key, text, source_type)
            .await;
        Ok(())
    }
}

#[async_trait]
impl RequestLogPort for InMemoryStore {
    async fn save_request_log(&self, entry: &RequestLogEntry) -> Result<(), StoreError> {
        self.tables.write().await.request_logs.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl TrainingQueuePort for InMemoryStore {
    async fn fetch_pending(&self, batch_size: usize) -> Result<Vec<TrainingQueueItem>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .queue
            .iter()
            .filter(|item| item.status == TrainingStatus::Pending)
            .take(batch_size)
            .cloned()
            .collect())
    }

    async fn mark_done(&self, id: i64) -> Result<(), StoreError> {
        self.set_status(id, TrainingStatus::Done, None).await
    }

    async fn mark_failed(&self, id: i64, reason: &str) -> Result<(), StoreError> {
        self.set_status(id, TrainingStatus::Failed, Some(reason)).await
    }

    async fn enqueue(&self, message: &TrainingMessage) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_item_id += 1;
        let id = tables.next_item_id;
        tables.queue.push(TrainingQueueItem::pending(id, message));
        Ok(id)
    }
}

#[async_trait]
impl RouteAdmin for InMemoryStore {
    async fn add_route(&self, rule: &RouteRule) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        let key = &rule.route.route_key;
        if let Some(existing) = tables.routes.iter_mut().find(|r| &r.route.route_key == key) {
            let id = existing.route.route_id;
            *existing = rule.clone();
            existing.route.route_id = id;
            return Ok(id);
        }

        tables.next_route_id += 1;
        let id = tables.next_route_id;
        let mut rule = rule.clone();
        rule.route.route_id = id;
        tables.routes.push(rule);
        Ok(id)
    }

    async fn add_route_context(&self, route_id: i64, text: &str) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .route_context
            .push((route_id, text.to_string()));
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<RouteRule>, StoreError> {
        Ok(self.tables.read().await.routes.clone())
    }

    async fn training_item(&self, id: i64) -> Result<Option<TrainingQueueItem>, StoreError> {
        Ok(self.tables.read().await.queue.iter().find(|i| i.id == id).cloned())
    }
}
