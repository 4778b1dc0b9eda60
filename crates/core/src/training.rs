//! Training queue items and the inbound training message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Source type recorded on learned context when the producer sent none.
pub const DEFAULT_SOURCE_TYPE: &str = "JOB";

/// Lifecycle of a queued training item.
///
/// Items start `Pending` and move to `Done` or `Failed` once per processing
/// attempt. Terminal items are never picked up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingStatus {
    Pending,
    Done,
    Failed,
}

impl TrainingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingStatus::Pending => "PENDING",
            TrainingStatus::Done => "DONE",
            TrainingStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrainingStatus::Pending)
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrainingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(TrainingStatus::Pending),
            "DONE" => Ok(TrainingStatus::Done),
            "FAILED" => Ok(TrainingStatus::Failed),
            other => Err(Error::Internal(format!("Unknown training status: {other}"))),
        }
    }
}

/// A training message as produced by API callers or queue producers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingMessage {
    #[serde(default)]
    pub data_type: String,
    #[serde(default)]
    pub data_characteristic: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
}

impl TrainingMessage {
    /// `dataType`, `dataCharacteristic` and `content` must all be non-blank.
    pub fn validate(&self) -> Result<()> {
        if is_blank(&self.data_type) || is_blank(&self.data_characteristic) || is_blank(&self.content) {
            return Err(Error::Validation("Training message is incomplete".into()));
        }
        Ok(())
    }
}

/// A persisted queue row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingQueueItem {
    pub id: i64,
    pub data_type: String,
    pub data_characteristic: String,
    pub content: String,
    #[serde(default)]
    pub route_key: Option<String>,
    #[serde(default)]
    pub module_key: Option<String>,
    #[serde(default)]
    pub profile_id: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    pub status: TrainingStatus,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl TrainingQueueItem {
    /// A fresh `Pending` row built from an accepted message.
    pub fn pending(id: i64, message: &TrainingMessage) -> Self {
        Self {
            id,
            data_type: message.data_type.clone(),
            data_characteristic: message.data_characteristic.clone(),
            content: message.content.clone(),
            route_key: message.route_key.clone(),
            module_key: message.module_key.clone(),
            profile_id: message.profile_id.clone(),
            source_type: message.source_type.clone(),
            status: TrainingStatus::Pending,
            last_error: None,
        }
    }

    /// The non-blank profile id, if any.
    pub fn profile(&self) -> Option<&str> {
        non_blank(self.profile_id.as_deref())
    }

    pub fn effective_source_type(&self) -> &str {
        non_blank(self.source_type.as_deref()).unwrap_or(DEFAULT_SOURCE_TYPE)
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// `Some(s)` only when `s` has visible content.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !is_blank(s))
}
