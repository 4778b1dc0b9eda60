//! The inference pipeline.
//!
//! ```text
//! request + keys
//!   -> validate
//!   -> resolve route
//!   -> pick provider (catalog)
//!   -> fetch route / module / profile context
//!   -> compile prompt
//!   -> invoke provider
//!   -> audit log + event   (failures logged, never surfaced)
//!   -> response
//! ```
//!
//! Training ingestion reuses the same route + provider steps with a fixed
//! knowledge-extraction prompt and writes the output back as context.

use connector_config::InferenceConfig;
use connector_core::context::{ContextSnippets, effective_module_key};
use connector_core::error::Result;
use connector_core::event::{ConnectorEvent, EventPublisher, EventType};
use connector_core::inference::{InferenceRequest, InferenceResponse, RoutingKeys};
use connector_core::ports::{
    KnowledgeContextPort, ProviderCatalog, RequestLogEntry, RequestLogPort, RouteConfigPort,
};
use connector_core::provider::{ChunkStream, ProviderClient, ProviderInfo, ProviderPayload};
use connector_core::route::RouteConfig;
use connector_core::training::{TrainingQueueItem, non_blank};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::resolver::RouteResolver;

/// System prompt for knowledge-extraction calls.
pub const TRAINING_SYSTEM_PROMPT: &str =
    "You are receiving a domain knowledge update.\nExtract rules, concepts and facts useful for future answers.\n";

pub const TRAINING_TEMPERATURE: f32 = 0.1;

pub const TRAINING_MAX_TOKENS: u32 = 800;

const INFERENCE_DETAILS: &str = "Inference completed.";
const TRAINING_DETAILS: &str = "Training item processed.";

/// Tunables for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    /// Snippets fetched per context tier.
    pub context_limit: usize,
    /// Audit-log summaries are cut to this many characters.
    pub summary_max_chars: usize,
    pub default_system_prompt: String,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self::from(&InferenceConfig::default())
    }
}

impl From<&InferenceConfig> for InferenceSettings {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            context_limit: config.context_limit,
            summary_max_chars: config.summary_max_chars,
            default_system_prompt: config.default_system_prompt.clone(),
        }
    }
}

/// A resolved route with its provider and the payload about to be sent.
struct Dispatch {
    route: RouteConfig,
    provider: Arc<dyn ProviderClient>,
    payload: ProviderPayload,
}

/// Runs inference requests and training ingestion against the injected
/// ports. Holds no per-request state; share it behind an `Arc`.
pub struct InferenceOrchestrator {
    resolver: RouteResolver,
    routes: Arc<dyn RouteConfigPort>,
    knowledge: Arc<dyn KnowledgeContextPort>,
    request_log: Arc<dyn RequestLogPort>,
    catalog: Arc<dyn ProviderCatalog>,
    events: Arc<dyn EventPublisher>,
    settings: InferenceSettings,
}

impl InferenceOrchestrator {
    pub fn new(
        routes: Arc<dyn RouteConfigPort>,
        knowledge: Arc<dyn KnowledgeContextPort>,
        request_log: Arc<dyn RequestLogPort>,
        catalog: Arc<dyn ProviderCatalog>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            resolver: RouteResolver::new(routes.clone()),
            routes,
            knowledge,
            request_log,
            catalog,
            events,
            settings: InferenceSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: InferenceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Answer one request.
    pub async fn ask(&self, request: &InferenceRequest, keys: &RoutingKeys) -> Result<InferenceResponse> {
        let Dispatch { route, provider, payload } = self.prepare(request, keys).await?;

        info!(
            route_key = %route.route_key,
            provider = %payload.provider,
            model = %payload.model,
            "Dispatching inference"
        );
        let output = provider.invoke(&payload).await?;

        self.record(
            &route,
            &payload,
            &request.prompt,
            &output,
            EventType::InferenceCompleted,
            INFERENCE_DETAILS,
        )
        .await;

        Ok(InferenceResponse {
            provider: payload.provider,
            model: payload.model,
            output,
            route_key: route.route_key,
        })
    }

    /// Same pipeline as [`ask`](Self::ask) but hands back the provider's
    /// chunk stream. No audit row or event is written for streamed answers.
    pub async fn ask_stream(&self, request: &InferenceRequest, keys: &RoutingKeys) -> Result<ChunkStream> {
        let Dispatch { route, provider, payload } = self.prepare(request, keys).await?;
        info!(
            route_key = %route.route_key,
            provider = %payload.provider,
            model = %payload.model,
            "Dispatching streamed inference"
        );
        Ok(provider.stream(&payload).await?)
    }

    /// Turn one queued item into stored knowledge and return the extracted
    /// text. Context writes are part of the outcome; the audit row and the
    /// event are best-effort.
    pub async fn ingest_training_item(&self, item: &TrainingQueueItem) -> Result<String> {
        let route = self
            .resolver
            .resolve(&item.data_type, &item.data_characteristic)
            .await?;
        let provider = self.catalog.require(&route.provider)?;

        let payload = ProviderPayload {
            provider: provider.name().to_string(),
            model: route.effective_model(provider.default_model()),
            system_prompt: TRAINING_SYSTEM_PROMPT.to_string(),
            user_prompt: item.content.clone(),
            temperature: Some(TRAINING_TEMPERATURE),
            max_tokens: Some(TRAINING_MAX_TOKENS),
        };

        debug!(item_id = item.id, route_key = %route.route_key, "Ingesting training item");
        let output = provider.invoke(&payload).await?;

        let module_key = effective_module_key(item.module_key.as_deref());
        let source_type = item.effective_source_type();
        self.knowledge
            .save_module_context(route.route_id, module_key, &output, source_type)
            .await?;
        if let Some(profile_id) = item.profile() {
            self.knowledge
                .save_profile_context(profile_id, module_key, &output, source_type)
                .await?;
        }

        self.record(
            &route,
            &payload,
            &item.content,
            &output,
            EventType::TrainingItemProcessed,
            TRAINING_DETAILS,
        )
        .await;

        Ok(output)
    }

    /// Names of every registered provider, sorted case-insensitively.
    pub fn list_provider_names(&self) -> Vec<String> {
        self.catalog.list_providers().into_iter().map(|p| p.name).collect()
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.catalog.list_providers()
    }

    async fn prepare(&self, request: &InferenceRequest, keys: &RoutingKeys) -> Result<Dispatch> {
        request.validate()?;
        keys.validate()?;

        let route = self.resolver.resolve(&keys.data_type, &keys.characteristic).await?;
        let provider = self.catalog.require(&route.provider)?;
        let snippets = self.load_context(route.route_id, keys).await?;

        let system_prompt = non_blank(route.system_prompt.as_deref())
            .unwrap_or(self.settings.default_system_prompt.as_str())
            .to_string();

        let payload = ProviderPayload {
            provider: provider.name().to_string(),
            model: route.effective_model(provider.default_model()),
            system_prompt,
            user_prompt: snippets.compile(&request.prompt),
            temperature: route.temperature,
            max_tokens: route.max_tokens,
        };

        Ok(Dispatch { route, provider, payload })
    }

    async fn load_context(&self, route_id: i64, keys: &RoutingKeys) -> Result<ContextSnippets> {
        let limit = self.settings.context_limit;
        let module_key = effective_module_key(keys.module_key.as_deref());

        let route = self.routes.load_context_snippets(route_id, limit).await?;
        let module = self.knowledge.load_module_context(route_id, module_key, limit).await?;
        let profile = match keys.profile_id() {
            Some(profile_id) => {
                self.knowledge
                    .load_profile_context(profile_id, module_key, limit)
                    .await?
            }
            None => Vec::new(),
        };

        debug!(
            route_id,
            module_key,
            route_snippets = route.len(),
            module_snippets = module.len(),
            profile_snippets = profile.len(),
            "Loaded context"
        );
        Ok(ContextSnippets { route, module, profile })
    }

    async fn record(
        &self,
        route: &RouteConfig,
        payload: &ProviderPayload,
        request: &str,
        response: &str,
        event_type: EventType,
        details: &str,
    ) {
        let entry = RequestLogEntry {
            route_key: route.route_key.clone(),
            provider: payload.provider.clone(),
            model: payload.model.clone(),
            request_summary: shrink(request, self.settings.summary_max_chars),
            response_summary: shrink(response, self.settings.summary_max_chars),
        };
        if let Err(e) = self.request_log.save_request_log(&entry).await {
            warn!(route_key = %route.route_key, error = %e, "Request log write failed");
        }

        let event = ConnectorEvent::success(
            event_type,
            route.route_key.as_str(),
            payload.provider.as_str(),
            payload.model.as_str(),
            details,
        );
        if let Err(e) = self.events.publish(event).await {
            warn!(route_key = %route.route_key, error = %e, "Event publish failed");
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn shrink(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
