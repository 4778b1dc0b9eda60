//! HTTP gateway for the connector.
//!
//! Exposes the inference pipeline, training intake, provider catalog and
//! event stream under `/v1/connector`. Built on Axum.

pub mod api_v1;

use axum::extract::{DefaultBodyLimit, State};
use axum::{
    Router,
    http::StatusCode,
    middleware::Next,
};
use std::sync::Arc;
use tracing::{info, warn};

use connector_config::AppConfig;
use connector_core::error::Error;
use connector_core::event::EventBus;
use connector_engine::{InferenceOrchestrator, TrainingQueueProcessor, TrainingScheduler};
use connector_store::Store;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-Connector-Key";

/// Uploads go through `/file`; everything else is small JSON.
const BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Everything a running connector needs, built once from config.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub events: Arc<EventBus>,
    pub orchestrator: Arc<InferenceOrchestrator>,
    pub training: Arc<TrainingQueueProcessor>,
}

impl Services {
    /// Open the store, seed configured routes, register providers and wire
    /// the engine together.
    pub async fn build(config: &AppConfig) -> Result<Self, Error> {
        let store = connector_store::open(&config.storage).await?;
        let seeded = connector_store::seed_routes(store.as_ref(), &config.routes).await?;
        let registry = Arc::new(connector_providers::build_from_config(config));
        let events = Arc::new(EventBus::default());

        let orchestrator = Arc::new(
            InferenceOrchestrator::new(
                store.clone(),
                store.clone(),
                store.clone(),
                registry,
                events.clone(),
            )
            .with_settings((&config.inference).into()),
        );
        let training = Arc::new(TrainingQueueProcessor::new(store.clone(), orchestrator.clone()));

        info!(
            backend = ?config.storage.backend,
            routes = seeded,
            providers = ?orchestrator.list_provider_names(),
            "Connector services ready"
        );
        Ok(Self {
            store,
            events,
            orchestrator,
            training,
        })
    }
}

/// Shared state for request handlers.
pub struct GatewayState {
    pub orchestrator: Arc<InferenceOrchestrator>,
    pub training: Arc<TrainingQueueProcessor>,
    pub events: Arc<EventBus>,
    /// When set, every call except health must present it.
    pub api_key: Option<String>,
}

impl GatewayState {
    pub fn new(services: &Services, api_key: Option<String>) -> Self {
        Self {
            orchestrator: services.orchestrator.clone(),
            training: services.training.clone(),
            events: services.events.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router: `/v1/connector/*` plus body limit and trace logging.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .nest("/v1/connector", api_v1::connector_router(state))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway and, when enabled, the training scheduler. Runs until
/// Ctrl-C.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let services = Services::build(&config).await?;
    let scheduler = TrainingScheduler::spawn_if_enabled(services.training.clone(), &config.training);

    let state = Arc::new(GatewayState::new(&services, config.gateway.api_key.clone()));
    if state.api_key.is_none() {
        warn!("No gateway api_key configured; the API is open");
    }
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    if let Some(handle) = scheduler {
        handle.abort();
    }
    Ok(())
}

/// Rejects requests without the configured `X-Connector-Key`.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let Some(expected) = state.api_key.as_deref() else {
        return Ok(next.run(req).await);
    };

    let provided = req.headers().get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if provided == Some(expected) {
        Ok(next.run(req).await)
    } else {
        warn!(path = %req.uri().path(), "Unauthorized request: missing or invalid api key");
        Err(StatusCode::UNAUTHORIZED)
    }
}
