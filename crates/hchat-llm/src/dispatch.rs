//! Model-to-vendor resolution and call routing

use std::sync::Arc;

use hchat_config::UpstreamConfig;
use reqwest::Client;

use crate::catalog;
use crate::error::LlmError;
use crate::provider::{ChatProvider, ProviderKind};
use crate::transport::ChunkStream;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest};

/// Routes normalized requests to the vendor that serves the model
#[derive(Debug, Clone)]
pub struct Dispatcher {
    client: Client,
    upstream: UpstreamConfig,
}

impl Dispatcher {
    /// Dispatcher sharing `client` for every upstream call
    pub const fn new(client: Client, upstream: UpstreamConfig) -> Self {
        Self { client, upstream }
    }

    /// Vendor for a model: the catalog entry, else a guess from the name
    pub fn resolve(model: &str) -> ProviderKind {
        catalog::find(model).map_or_else(|| ProviderKind::infer(model), |caps| caps.provider)
    }

    fn provider(&self, kind: ProviderKind) -> Arc<dyn ChatProvider> {
        kind.build(self.client.clone(), &self.upstream)
    }

    /// Non-streaming completion
    pub async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let kind = Self::resolve(&request.model);
        tracing::debug!(model = %request.model, provider = %kind, "dispatching completion");

        self.provider(kind).complete(request).await
    }

    /// Streaming completion
    ///
    /// Empty vendor events are already filtered out of the returned stream.
    pub async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, LlmError> {
        let kind = Self::resolve(&request.model);
        tracing::debug!(model = %request.model, provider = %kind, "dispatching stream");

        self.provider(kind).stream(request).await
    }

    /// Embeddings from the catalog vendor, or `openai` for unknown models
    pub async fn embed(&self, request: &EmbeddingsRequest) -> Result<serde_json::Value, LlmError> {
        let kind = catalog::find(&request.model).map_or(ProviderKind::OpenAi, |caps| caps.provider);
        tracing::debug!(model = %request.model, provider = %kind, "dispatching embeddings");

        self.provider(kind).embed(request).await
    }
}
