//! Routes: the binding from (dataType, characteristic) to a provider bundle.
//!
//! A route is resolved once per request and is immutable afterwards. The
//! ranking rule lives here so every store can apply the same ordering.

use serde::{Deserialize, Serialize};

/// Characteristic value that matches any characteristic of a data type.
pub const WILDCARD: &str = "*";

/// The provider/model/prompt bundle a request is dispatched with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub route_id: i64,

    /// Human-readable name (e.g. "SUPPORT_DEFAULT")
    pub route_key: String,

    /// Provider name as registered in the catalog (matched case-insensitively)
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl RouteConfig {
    /// The route's model when it is set and non-blank, otherwise `fallback`
    /// (normally the provider's default model).
    pub fn effective_model(&self, fallback: &str) -> String {
        match self.model.as_deref() {
            Some(model) if !model.trim().is_empty() => model.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// A stored routing row: the match keys plus the route it selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    pub data_type: String,

    /// Exact characteristic or [`WILDCARD`]
    pub characteristic: String,

    /// Lower value wins among rows of the same match class
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub route: RouteConfig,
}

fn default_enabled() -> bool {
    true
}

impl RouteRule {
    fn matches(&self, data_type: &str, characteristic: &str) -> bool {
        self.enabled
            && self.data_type == data_type
            && (self.characteristic == characteristic || self.characteristic == WILDCARD)
    }
}

/// Pick the route for `(data_type, characteristic)`.
///
/// Only enabled rows whose data type matches exactly and whose characteristic
/// matches exactly or is `*` are candidates. Exact-characteristic rows rank
/// before wildcard rows; within a class the lowest priority wins. Ties keep
/// insertion order.
pub fn select_route<'a, I>(rules: I, data_type: &str, characteristic: &str) -> Option<&'a RouteConfig>
where
    I: IntoIterator<Item = &'a RouteRule>,
{
    rules
        .into_iter()
        .filter(|rule| rule.matches(data_type, characteristic))
        .min_by_key(|rule| (rule.characteristic != characteristic, rule.priority))
        .map(|rule| &rule.route)
}
