//! SQLite store.
//!
//! Uses a single SQLite database file with six tables:
//! - `llm_route_config`: routing rows
//! - `llm_route_context`, `llm_module_context`, `llm_profile_context`: the three context tiers
//! - `llm_request_log`: audit trail
//! - `llm_training_queue`: pending/done/failed training items
//!
//! Timestamps are fixed-width RFC 3339 strings so text ordering is time ordering.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use connector_core::error::StoreError;
use connector_core::ports::{
    KnowledgeContextPort, RequestLogEntry, RequestLogPort, RouteConfigPort, TrainingQueuePort,
};
use connector_core::route::{RouteConfig, RouteRule};
use connector_core::training::{TrainingMessage, TrainingQueueItem, TrainingStatus};
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

use crate::RouteAdmin;

const ROUTE_COLUMNS: &str =
    "route_id, route_key, provider, model_name, system_prompt, temperature, max_tokens";

const QUEUE_COLUMNS: &str = "id, data_type, data_characteristic, content, route_key, module_key, \
     profile_id, source_type, status, last_error";

/// A SQLite-backed implementation of every storage port.
pub struct SqliteStore {
    pool: SqlitePool,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn limit(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl SqliteStore {
    /// Open (and create if needed) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful
    /// for tests). In-memory databases use a single connection so every query
    /// sees the same data.
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let in_memory = path.contains(":memory:");
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .synchronous(SqliteSynchronous::Normal);
        let options = if in_memory {
            options
        } else {
            options.journal_mode(SqliteJournalMode::Wal)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations: creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 8] = [
            (
                "llm_route_config table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_route_config (
                    route_id            INTEGER PRIMARY KEY AUTOINCREMENT,
                    route_key           TEXT UNIQUE NOT NULL,
                    data_type           TEXT NOT NULL,
                    data_characteristic TEXT NOT NULL,
                    provider            TEXT NOT NULL,
                    model_name          TEXT,
                    system_prompt       TEXT,
                    temperature         REAL,
                    max_tokens          INTEGER,
                    priority            INTEGER NOT NULL DEFAULT 0,
                    enabled             INTEGER NOT NULL DEFAULT 1
                )
                "#,
            ),
            (
                "llm_route_context table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_route_context (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    route_id     INTEGER NOT NULL,
                    context_text TEXT NOT NULL,
                    updated_at   TEXT NOT NULL
                )
                "#,
            ),
            (
                "llm_module_context table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_module_context (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    route_id     INTEGER NOT NULL,
                    module_key   TEXT NOT NULL,
                    source_type  TEXT NOT NULL,
                    context_text TEXT NOT NULL,
                    updated_at   TEXT NOT NULL
                )
                "#,
            ),
            (
                "llm_profile_context table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_profile_context (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    profile_id   TEXT NOT NULL,
                    module_key   TEXT NOT NULL,
                    source_type  TEXT NOT NULL,
                    context_text TEXT NOT NULL,
                    updated_at   TEXT NOT NULL
                )
                "#,
            ),
            (
                "llm_request_log table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_request_log (
                    id               INTEGER PRIMARY KEY AUTOINCREMENT,
                    route_key        TEXT NOT NULL,
                    provider         TEXT NOT NULL,
                    model_name       TEXT NOT NULL,
                    request_summary  TEXT NOT NULL,
                    response_summary TEXT NOT NULL,
                    created_at       TEXT NOT NULL
                )
                "#,
            ),
            (
                "llm_training_queue table",
                r#"
                CREATE TABLE IF NOT EXISTS llm_training_queue (
                    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                    data_type           TEXT NOT NULL,
                    data_characteristic TEXT NOT NULL,
                    content             TEXT NOT NULL,
                    route_key           TEXT,
                    module_key          TEXT,
                    profile_id          TEXT,
                    source_type         TEXT,
                    status              TEXT NOT NULL DEFAULT 'PENDING',
                    last_error          TEXT,
                    next_run_at         TEXT,
                    created_at          TEXT NOT NULL,
                    updated_at          TEXT NOT NULL
                )
                "#,
            ),
            (
                "route lookup index",
                "CREATE INDEX IF NOT EXISTS idx_route_lookup ON llm_route_config(data_type, data_characteristic)",
            ),
            (
                "queue status index",
                "CREATE INDEX IF NOT EXISTS idx_queue_status ON llm_training_queue(status, created_at)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_route(row: &SqliteRow) -> Result<RouteConfig, StoreError> {
        let col = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let temperature: Option<f64> = row.try_get("temperature").map_err(|e| col("temperature", e))?;
        let max_tokens: Option<i64> = row.try_get("max_tokens").map_err(|e| col("max_tokens", e))?;

        Ok(RouteConfig {
            route_id: row.try_get("route_id").map_err(|e| col("route_id", e))?,
            route_key: row.try_get("route_key").map_err(|e| col("route_key", e))?,
            provider: row.try_get("provider").map_err(|e| col("provider", e))?,
            model: row.try_get("model_name").map_err(|e| col("model_name", e))?,
            system_prompt: row.try_get("system_prompt").map_err(|e| col("system_prompt", e))?,
            temperature: temperature.map(|t| t as f32),
            max_tokens: max_tokens.and_then(|n| u32::try_from(n).ok()),
        })
    }

    fn row_to_item(row: &SqliteRow) -> Result<TrainingQueueItem, StoreError> {
        let col = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        let status: String = row.try_get("status").map_err(|e| col("status", e))?;
        let status = TrainingStatus::from_str(&status).map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(TrainingQueueItem {
            id: row.try_get("id").map_err(|e| col("id", e))?,
            data_type: row.try_get("data_type").map_err(|e| col("data_type", e))?,
            data_characteristic: row
                .try_get("data_characteristic")
                .map_err(|e| col("data_characteristic", e))?,
            content: row.try_get("content").map_err(|e| col("content", e))?,
            route_key: row.try_get("route_key").map_err(|e| col("route_key", e))?,
            module_key: row.try_get("module_key").map_err(|e| col("module_key", e))?,
            profile_id: row.try_get("profile_id").map_err(|e| col("profile_id", e))?,
            source_type: row.try_get("source_type").map_err(|e| col("source_type", e))?,
            status,
            last_error: row.try_get("last_error").map_err(|e| col("last_error", e))?,
        })
    }

    async fn texts<'q>(&self, query: Query<'q, Sqlite, SqliteArguments<'q>>, what: &str) -> Result<Vec<String>, StoreError> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("{what}: {e}")))?;
        rows.iter()
            .map(|row| {
                row.try_get("context_text")
                    .map_err(|e| StoreError::QueryFailed(format!("context_text column: {e}")))
            })
            .collect()
    }

    async fn update_status(&self, id: i64, status: TrainingStatus, reason: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE llm_training_queue SET status = ?1, last_error = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(status.as_str())
        .bind(reason)
        .bind(now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE training status failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::QueryFailed(format!("training item {id} not found")));
        }
        Ok(())
    }
}

#[async_trait]
impl RouteConfigPort for SqliteStore {
    async fn resolve_route(&self, data_type: &str, characteristic: &str) -> Result<Option<RouteConfig>, StoreError> {
        let sql = format!(
            r#"
            SELECT {ROUTE_COLUMNS}
            FROM llm_route_config
            WHERE enabled = 1
              AND data_type = ?1
              AND (data_characteristic = ?2 OR data_characteristic = '*')
            ORDER BY CASE WHEN data_characteristic = ?2 THEN 0 ELSE 1 END, priority ASC, route_id ASC
            LIMIT 1
            "#
        );
        let row = sqlx::query(&sql)
            .bind(data_type)
            .bind(characteristic)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("resolve route: {e}")))?;

        row.as_ref().map(Self::row_to_route).transpose()
    }

    async fn load_context_snippets(&self, route_id: i64, limit_n: usize) -> Result<Vec<String>, StoreError> {
        let query = sqlx::query(
            "SELECT context_text FROM llm_route_context WHERE route_id = ?1 \
             ORDER BY updated_at DESC, id DESC LIMIT ?2",
        )
        .bind(route_id)
        .bind(limit(limit_n));
        self.texts(query, "route context").await
    }
}

#[async_trait]
impl KnowledgeContextPort for SqliteStore {
    async fn load_module_context(&self, route_id: i64, module_key: &str, limit_n: usize) -> Result<Vec<String>, StoreError> {
        let query = sqlx::query(
            "SELECT context_text FROM llm_module_context WHERE route_id = ?1 AND module_key = ?2 \
             ORDER BY updated_at DESC, id DESC LIMIT ?3",
        )
        .bind(route_id)
        .bind(module_key)
        .bind(limit(limit_n));
        self.texts(query, "module context").await
    }

    async fn load_profile_context(&self, profile_id: &str, module_key: &str, limit_n: usize) -> Result<Vec<String>, StoreError> {
        let query = sqlx::query(
            "SELECT context_text FROM llm_profile_context WHERE profile_id = ?1 AND module_key = ?2 \
             ORDER BY updated_at DESC, id DESC LIMIT ?3",
        )
        .bind(profile_id)
        .bind(module_key)
        .bind(limit(limit_n));
        self.texts(query, "profile context").await
    }

    async fn save_module_context(&self, route_id: i64, module_key: &str, text: &str, source_type: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO llm_module_context (route_id, module_key, source_type, context_text, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(route_id)
        .bind(module_key)
        .bind(source_type)
        .bind(text)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT module context failed: {e}")))?;
        Ok(())
    }

    async fn save_profile_context(
        &self,
        profile_id: &str,
        module_key: &str,
        text: &str,
        source_type: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO llm_profile_context (profile_id, module_key, source_type, context_text, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(profile_id)
        .bind(module_key)
        .bind(source_type)
        .bind(text)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT profile context failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl RequestLogPort for SqliteStore {
    async fn save_request_log(&self, entry: &RequestLogEntry) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO llm_request_log
                (route_key, provider, model_name, request_summary, response_summary, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&entry.route_key)
        .bind(&entry.provider)
        .bind(&entry.model)
        .bind(&entry.request_summary)
        .bind(&entry.response_summary)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT request log failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl TrainingQueuePort for SqliteStore {
    async fn fetch_pending(&self, batch_size: usize) -> Result<Vec<TrainingQueueItem>, StoreError> {
        let sql = format!(
            r#"
            SELECT {QUEUE_COLUMNS}
            FROM llm_training_queue
            WHERE status = 'PENDING'
              AND (next_run_at IS NULL OR next_run_at <= ?1)
            ORDER BY created_at, id
            LIMIT ?2
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(now())
            .bind(limit(batch_size))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("fetch pending: {e}")))?;

        rows.iter().map(Self::row_to_item).collect()
    }

    async fn mark_done(&self, id: i64) -> Result<(), StoreError> {
        self.update_status(id, TrainingStatus::Done, None).await
    }

    async fn mark_failed(&self, id: i64, reason: &str) -> Result<(), StoreError> {
        self.update_status(id, TrainingStatus::Failed, Some(reason)).await
    }

    async fn enqueue(&self, message: &TrainingMessage) -> Result<i64, StoreError> {
        let ts = now();
        let result = sqlx::query(
            r#"
            INSERT INTO llm_training_queue
                (data_type, data_characteristic, route_key, module_key, profile_id, source_type,
                 content, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'PENDING', ?8, ?8)
            "#,
        )
        .bind(&message.data_type)
        .bind(&message.data_characteristic)
        .bind(&message.route_key)
        .bind(&message.module_key)
        .bind(&message.profile_id)
        .bind(&message.source_type)
        .bind(&message.content)
        .bind(&ts)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT training item failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(item_id = id, "Enqueued training item");
        Ok(id)
    }
}

#[async_trait]
impl RouteAdmin for SqliteStore {
    async fn add_route(&self, rule: &RouteRule) -> Result<i64, StoreError> {
        let route = &rule.route;
        let row = sqlx::query(
            r#"
            INSERT INTO llm_route_config
                (route_key, data_type, data_characteristic, provider, model_name, system_prompt,
                 temperature, max_tokens, priority, enabled)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(route_key) DO UPDATE SET
                data_type = excluded.data_type,
                data_characteristic = excluded.data_characteristic,
                provider = excluded.provider,
                model_name = excluded.model_name,
                system_prompt = excluded.system_prompt,
                temperature = excluded.temperature,
                max_tokens = excluded.max_tokens,
                priority = excluded.priority,
                enabled = excluded.enabled
            RETURNING route_id
            "#,
        )
        .bind(&route.route_key)
        .bind(&rule.data_type)
        .bind(&rule.characteristic)
        .bind(&route.provider)
        .bind(&route.model)
        .bind(&route.system_prompt)
        .bind(route.temperature.map(f64::from))
        .bind(route.max_tokens.map(i64::from))
        .bind(rule.priority)
        .bind(rule.enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT route failed: {e}")))?;

        row.try_get("route_id")
            .map_err(|e| StoreError::QueryFailed(format!("route_id column: {e}")))
    }

    async fn add_route_context(&self, route_id: i64, text: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO llm_route_context (route_id, context_text, updated_at) VALUES (?1, ?2, ?3)")
            .bind(route_id)
            .bind(text)
            .bind(now())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("INSERT route context failed: {e}")))?;
        Ok(())
    }

    async fn list_routes(&self) -> Result<Vec<RouteRule>, StoreError> {
        let sql = format!(
            "SELECT {ROUTE_COLUMNS}, data_type, data_characteristic, priority, enabled \
             FROM llm_route_config ORDER BY data_type, priority, route_id"
        );
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list routes: {e}")))?;

        rows.iter()
            .map(|row| -> Result<RouteRule, StoreError> {
                let col = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));
                Ok(RouteRule {
                    data_type: row.try_get("data_type").map_err(|e| col("data_type", e))?,
                    characteristic: row
                        .try_get("data_characteristic")
                        .map_err(|e| col("data_characteristic", e))?,
                    priority: row.try_get("priority").map_err(|e| col("priority", e))?,
                    enabled: row.try_get("enabled").map_err(|e| col("enabled", e))?,
                    route: Self::row_to_route(row)?,
                })
            })
            .collect()
    }

    async fn training_item(&self, id: i64) -> Result<Option<TrainingQueueItem>, StoreError> {
        let sql = format!("SELECT {QUEUE_COLUMNS} FROM llm_training_queue WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("training item: {e}")))?;

        row.as_ref().map(Self::row_to_item).transpose()
    }
}
