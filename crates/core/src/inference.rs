//! Inbound inference request and the response returned to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::training::non_blank;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceRequest {
    #[serde(default)]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl InferenceRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::Validation("prompt is required".into()));
        }
        Ok(())
    }
}

/// Routing keys that travel next to the request (HTTP headers, CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingKeys {
    pub data_type: String,
    pub characteristic: String,
    #[serde(default)]
    pub module_key: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
}

impl RoutingKeys {
    pub fn new(data_type: impl Into<String>, characteristic: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            characteristic: characteristic.into(),
            module_key: None,
            profile_id: None,
        }
    }

    pub fn module(mut self, module_key: impl Into<String>) -> Self {
        self.module_key = Some(module_key.into());
        self
    }

    pub fn profile(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.data_type.trim().is_empty() {
            return Err(Error::Validation("dataType is required".into()));
        }
        if self.characteristic.trim().is_empty() {
            return Err(Error::Validation("characteristic is required".into()));
        }
        Ok(())
    }

    /// The non-blank profile id, if any.
    pub fn profile_id(&self) -> Option<&str> {
        non_blank(self.profile_id.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceResponse {
    pub provider: String,
    pub model: String,
    pub output: String,
    pub route_key: String,
}
