//! # Connector Core
//!
//! Domain types, collaborator ports and error definitions for the LLM
//! connector. This crate has no transport or storage dependencies; it
//! defines the model that every other crate implements against.
//!
//! ## Layout
//!
//! - [`route`]: route rows and the ranking rule
//! - [`context`]: merging context tiers into a prompt
//! - [`provider`]: the `ProviderClient` trait and its payload
//! - [`ports`]: storage and catalog traits injected into the engine

pub mod context;
pub mod error;
pub mod event;
pub mod inference;
pub mod ports;
pub mod provider;
pub mod route;
pub mod training;

// Re-export key types at crate root for ergonomics
pub use context::{ContextSnippets, DEFAULT_MODULE_KEY, compile as compile_prompt, effective_module_key};
pub use error::{Error, ProviderError, Result, StoreError};
pub use event::{ConnectorEvent, EventBus, EventPublisher, EventType, PublishError};
pub use inference::{InferenceRequest, InferenceResponse, RoutingKeys};
pub use ports::{
    KnowledgeContextPort, ProviderCatalog, RequestLogEntry, RequestLogPort, RouteConfigPort, TrainingQueuePort,
};
pub use provider::{ChunkStream, LineChunks, ProviderClient, ProviderInfo, ProviderPayload};
pub use route::{RouteConfig, RouteRule, WILDCARD, select_route};
pub use training::{TrainingMessage, TrainingQueueItem, TrainingStatus};
