//! Operation-specific hooks for stage 5 of [`super::pipeline`] (spec §4.5:
//! "call ChatModel and/or ExternalCatalog").
//!
//! `OrchestratedOperation` itself never names a collaborator directly — it
//! only calls [`OperationProducer::produce`]. Each feature supplies the
//! adapter that fits it: [`ChatModelProducer`] for recipe generation,
//! nutrition advice, and pose analysis; [`CatalogProducer`] for recipe
//! search. This is what keeps `ExternalCatalog` reachable from the same
//! pipeline machinery instead of only `ChatModel`.

use std::sync::Arc;

use async_trait::async_trait;
use fitforge_error::CoreError;

use crate::collaborators::{ChatModel, ExternalCatalog};

use super::parsing::extract_json_object;

/// Produces the raw artifact payload for one orchestrated operation.
#[async_trait]
pub trait OperationProducer: Send + Sync {
    async fn produce(&self) -> Result<serde_json::Value, CoreError>;
}

/// Calls a [`ChatModel`] and tolerantly extracts a JSON object from its
/// response (spec §4.5 stage 5: "parse tolerantly ... parse failure is
/// treated as a model failure").
pub struct ChatModelProducer {
    pub model: Arc<dyn ChatModel>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
impl OperationProducer for ChatModelProducer {
    async fn produce(&self) -> Result<serde_json::Value, CoreError> {
        let raw = self
            .model
            .complete(&self.prompt, self.max_tokens, self.temperature)
            .await
            .map_err(|e| CoreError::ModelUnavailable { message: e.to_string() })?;

        extract_json_object(&raw).map_err(|e| CoreError::ModelMalformed { message: e.to_string() })
    }
}

/// Calls an [`ExternalCatalog`] search and wraps the results as a JSON array
/// (spec §1: `search` is one of the four orchestrated operation kinds).
pub struct CatalogProducer {
    pub catalog: Arc<dyn ExternalCatalog>,
    pub query: String,
    pub limit: u32,
}

#[async_trait]
impl OperationProducer for CatalogProducer {
    async fn produce(&self) -> Result<serde_json::Value, CoreError> {
        let items = self
            .catalog
            .search(&self.query, self.limit)
            .await
            .map_err(|e| CoreError::UpstreamUnavailable { message: e.to_string() })?;

        serde_json::to_value(&items).map_err(|e| CoreError::ModelMalformed { message: e.to_string() })
    }
}
