//! Provider trait and vendor adapters

pub mod anthropic;
pub mod google;
pub mod openai;
pub mod passthrough;

use std::sync::Arc;

use async_trait::async_trait;
use hchat_config::UpstreamConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;
use crate::transport::ChunkStream;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest};

/// A vendor that serves normalized chat completions
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Vendor name used in logs and errors
    fn name(&self) -> &'static str;

    /// Send a non-streaming completion request
    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError>;

    /// Send a streaming completion request
    ///
    /// The upstream call is made before this returns, so a vendor refusal
    /// surfaces here rather than inside the stream.
    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, LlmError>;

    /// Create embeddings, returning the vendor's JSON unchanged
    async fn embed(&self, _request: &EmbeddingsRequest) -> Result<serde_json::Value, LlmError> {
        Err(LlmError::EmbeddingsNotSupported {
            provider: self.name().to_owned(),
        })
    }
}

/// Supported vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic Claude through the gateway's `claude/messages` route
    Anthropic,
    /// Google Gemini
    Google,
    /// Azure `OpenAI` deployments
    Azure,
    /// `OpenAI` chat completions
    OpenAi,
    /// Ollama's `OpenAI`-compatible API
    Ollama,
}

impl ProviderKind {
    /// Parse a provider name
    ///
    /// # Errors
    ///
    /// Returns `LlmError::UnsupportedProvider` for unknown names.
    pub fn from_name(name: &str) -> Result<Self, LlmError> {
        name.parse().map_err(|_| LlmError::UnsupportedProvider {
            provider: name.to_owned(),
        })
    }

    /// Infer the vendor from a model name that is not in the catalog
    pub fn infer(model: &str) -> Self {
        let model = model.to_lowercase();
        if model.contains("claude") {
            Self::Anthropic
        } else if model.contains("gemini") {
            Self::Google
        } else {
            // gpt, o1 and o3 models and anything unknown go to Azure
            Self::Azure
        }
    }

    /// Build the adapter for this vendor
    pub fn build(self, client: Client, upstream: &UpstreamConfig) -> Arc<dyn ChatProvider> {
        let endpoint = Endpoint::new(client, upstream);
        match self {
            Self::Anthropic => Arc::new(anthropic::AnthropicProvider::new(endpoint)),
            Self::Google => Arc::new(google::GoogleProvider::new(endpoint)),
            Self::Azure => Arc::new(openai::OpenAiProvider::new(openai::Flavor::Azure, endpoint)),
            Self::OpenAi => Arc::new(openai::OpenAiProvider::new(openai::Flavor::OpenAi, endpoint)),
            Self::Ollama => Arc::new(openai::OpenAiProvider::new(openai::Flavor::Ollama, endpoint)),
        }
    }
}

/// Client, base URL and key shared by every adapter
#[derive(Debug, Clone)]
pub struct Endpoint {
    client: Client,
    base: String,
    api_key: SecretString,
}

impl Endpoint {
    /// Endpoint for the configured gateway
    pub fn new(client: Client, upstream: &UpstreamConfig) -> Self {
        Self {
            client,
            base: upstream.normalized_base(),
            api_key: upstream.api_key.clone(),
        }
    }

    /// HTTP client
    pub fn client(&self) -> Client {
        self.client.clone()
    }

    /// Base URL ending with `/`
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Base URL with `segment/` appended unless the base already mentions it
    pub fn base_with(&self, segment: &str) -> String {
        if self.base.contains(segment) {
            self.base.clone()
        } else {
            format!("{}{segment}/", self.base)
        }
    }

    /// Raw API key
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}
