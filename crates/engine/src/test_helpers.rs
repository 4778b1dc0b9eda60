//! Shared test doubles for engine tests.

use async_trait::async_trait;
use connector_core::error::{ProviderError, StoreError};
use connector_core::event::{ConnectorEvent, EventPublisher, PublishError};
use connector_core::ports::{KnowledgeContextPort, RequestLogEntry, RequestLogPort};
use connector_core::provider::{ProviderClient, ProviderPayload};
use connector_core::route::{RouteConfig, RouteRule};
use std::sync::Mutex;

pub fn route_rule(key: &str, data_type: &str, characteristic: &str, provider: &str, model: Option<&str>) -> RouteRule {
    RouteRule {
        data_type: data_type.into(),
        characteristic: characteristic.into(),
        priority: 0,
        enabled: true,
        route: RouteConfig {
            route_id: 0,
            route_key: key.into(),
            provider: provider.into(),
            model: model.map(str::to_string),
            system_prompt: None,
            temperature: None,
            max_tokens: None,
        },
    }
}

/// A provider that answers every call with a fixed text and records the
/// payloads it received. Prompts containing `fail_on` produce an API error.
pub struct ScriptedProvider {
    name: String,
    output: String,
    fail_on: Option<String>,
    payloads: Mutex<Vec<ProviderPayload>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.into(),
            output: output.into(),
            fail_on: None,
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.into());
        self
    }

    pub fn payloads(&self) -> Vec<ProviderPayload> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        "scripted-default"
    }

    async fn invoke(&self, payload: &ProviderPayload) -> Result<String, ProviderError> {
        self.payloads.lock().unwrap().push(payload.clone());
        if let Some(marker) = &self.fail_on
            && payload.user_prompt.contains(marker.as_str())
        {
            return Err(ProviderError::ApiError {
                status_code: 500,
                message: format!("scripted failure on {marker}"),
            });
        }
        Ok(self.output.clone())
    }
}

/// Collects every published event.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<ConnectorEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<ConnectorEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: ConnectorEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// A publisher whose every call fails.
pub struct BrokenPublisher;

#[async_trait]
impl EventPublisher for BrokenPublisher {
    async fn publish(&self, _event: ConnectorEvent) -> Result<(), PublishError> {
        Err(PublishError("broker unreachable".into()))
    }
}

/// A request log whose every write fails.
pub struct BrokenRequestLog;

#[async_trait]
impl RequestLogPort for BrokenRequestLog {
    async fn save_request_log(&self, _entry: &RequestLogEntry) -> Result<(), StoreError> {
        Err(StoreError::Storage("disk full".into()))
    }
}

/// Knowledge port returning fixed snippets and recording the keys it was
/// asked for.
pub struct FixedKnowledge {
    pub module: Vec<String>,
    pub profile: Vec<String>,
    pub module_calls: Mutex<Vec<(i64, String)>>,
    pub profile_calls: Mutex<Vec<(String, String)>>,
    pub fail_saves: bool,
}

impl FixedKnowledge {
    pub fn new(module: &[&str], profile: &[&str]) -> Self {
        Self {
            module: module.iter().map(|s| s.to_string()).collect(),
            profile: profile.iter().map(|s| s.to_string()).collect(),
            module_calls: Mutex::new(Vec::new()),
            profile_calls: Mutex::new(Vec::new()),
            fail_saves: false,
        }
    }
}

#[async_trait]
impl KnowledgeContextPort for FixedKnowledge {
    async fn load_module_context(&self, route_id: i64, module_key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.module_calls.lock().unwrap().push((route_id, module_key.into()));
        Ok(self.module.iter().take(limit).cloned().collect())
    }

    async fn load_profile_context(&self, profile_id: &str, module_key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        self.profile_calls
            .lock()
            .unwrap()
            .push((profile_id.into(), module_key.into()));
        Ok(self.profile.iter().take(limit).cloned().collect())
    }

    async fn save_module_context(&self, _: i64, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Storage("module context table locked".into()));
        }
        Ok(())
    }

    async fn save_profile_context(&self, _: &str, _: &str, _: &str, _: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
