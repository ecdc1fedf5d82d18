//! `OpenAI`-family adapters: `OpenAI`, Azure `OpenAI` and Ollama
//!
//! The normalized request already is the `OpenAI` wire format, so these
//! adapters only adjust fields the individual backends reject.

use async_trait::async_trait;
use http::header::{AUTHORIZATION, HeaderName};
use serde_json::json;

use super::{ChatProvider, Endpoint};
use crate::error::LlmError;
use crate::transport::{CallDefaults, ChunkStream, Transport, chunk_from_event, normalize_stream};
use crate::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ContentPart, EmbeddingsRequest, MessageContent,
    NamedToolChoice, ReasoningEffort, StopSequences, ToolChoice, ToolChoiceMode,
};

/// Key Ollama uses when none is configured
const OLLAMA_UNSET_KEY: &str = "ollama";

/// Which `OpenAI`-compatible backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// `OpenAI` itself
    OpenAi,
    /// Azure `OpenAI` deployments
    Azure,
    /// Local Ollama
    Ollama,
}

impl Flavor {
    const fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
            Self::Ollama => "ollama",
        }
    }
}

/// Adapter for an `OpenAI`-compatible backend
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    flavor: Flavor,
    endpoint: Endpoint,
}

impl OpenAiProvider {
    /// Adapter for `flavor` on the configured gateway
    pub const fn new(flavor: Flavor, endpoint: Endpoint) -> Self {
        Self { flavor, endpoint }
    }

    fn url(&self, model: &str) -> String {
        match self.flavor {
            Flavor::OpenAi => format!("{}chat/completions", self.endpoint.base()),
            Flavor::Azure => format!("{}deployments/{model}/chat/completions", self.endpoint.base_with("openai")),
            Flavor::Ollama => format!("{}v1/chat/completions", self.endpoint.base()),
        }
    }

    fn transport(&self, url: String) -> Result<Transport, LlmError> {
        let transport = Transport::new(self.endpoint.client(), self.flavor.name(), url);
        let key = self.endpoint.api_key();
        match self.flavor {
            Flavor::Azure => transport.with_header(HeaderName::from_static("api-key"), key),
            Flavor::Ollama if key.is_empty() || key == OLLAMA_UNSET_KEY => Ok(transport),
            Flavor::OpenAi | Flavor::Ollama => transport.with_header(AUTHORIZATION, &format!("Bearer {key}")),
        }
    }

    /// Backend-specific copy of the request
    fn adjust(&self, request: &ChatCompletionRequest) -> ChatCompletionRequest {
        let mut request = request.clone();
        rename_developer(&mut request);
        if self.flavor == Flavor::Azure {
            adjust_for_azure(&mut request);
        }
        request
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        self.flavor.name()
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let mut body = self.adjust(request);
        body.stream = None;

        let mut response: ChatCompletionResponse = self.transport(self.url(&request.model))?.json(&body).await?;
        CallDefaults::new(&request.model).fill_response(&mut response);
        Ok(response)
    }

    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, LlmError> {
        let mut body = self.adjust(request);
        body.stream = Some(true);

        let events = self.transport(self.url(&request.model))?.events(&body).await?;
        Ok(normalize_stream(events, &request.model, (), chunk_from_event))
    }

    async fn embed(&self, request: &EmbeddingsRequest) -> Result<serde_json::Value, LlmError> {
        if self.flavor != Flavor::Azure {
            return Err(LlmError::EmbeddingsNotSupported {
                provider: self.name().to_owned(),
            });
        }

        let url = format!("{}deployments/{}/embeddings", self.endpoint.base_with("openai"), request.model);
        let mut body = json!({ "input": request.input });
        if let Some(dimensions) = request.dimensions {
            body["dimensions"] = json!(dimensions);
        }
        self.transport(url)?.json(&body).await
    }
}

fn rename_developer(request: &mut ChatCompletionRequest) {
    for message in &mut request.messages {
        if let ChatMessage::Developer(inner) = message {
            *message = ChatMessage::System(inner.clone());
        }
    }
}

/// Whether the model only accepts `max_completion_tokens` and temperature 1
fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("gpt-5")
}

fn adjust_for_azure(request: &mut ChatCompletionRequest) {
    if is_reasoning_model(&request.model) {
        if let Some(cap) = request.output_cap() {
            request.max_completion_tokens = Some(cap);
            request.max_tokens = None;
        }
        if request.temperature.is_some_and(|t| (t - 1.0).abs() > f64::EPSILON) {
            request.temperature = Some(1.0);
        }
    }

    if let Some(stop) = request.stop.take() {
        request.stop = Some(StopSequences::Many(stop.into_vec()));
    }

    for message in &mut request.messages {
        let content = match message {
            ChatMessage::System(m) | ChatMessage::Developer(m) => Some(&mut m.content),
            ChatMessage::User(m) => Some(&mut m.content),
            ChatMessage::Assistant(m) => m.content.as_mut(),
            ChatMessage::Tool(m) => Some(&mut m.content),
        };
        if let Some(MessageContent::Parts(parts)) = content {
            parts.retain(|part| !matches!(part, ContentPart::File { .. }));
        }
    }

    request.tool_choice = match request.tool_choice.take() {
        Some(ToolChoice::Named(NamedToolChoice::Function { .. }) | ToolChoice::Mode(ToolChoiceMode::Any)) => {
            Some(ToolChoice::Mode(ToolChoiceMode::Required))
        }
        Some(ToolChoice::Named(_)) => Some(ToolChoice::Mode(ToolChoiceMode::Auto)),
        other => other,
    };
    if request.tools.as_ref().is_none_or(Vec::is_empty) {
        request.tool_choice = None;
    }

    request.reasoning_effort = match request.reasoning_effort {
        Some(ReasoningEffort::None) => None,
        Some(ReasoningEffort::Minimal) => Some(ReasoningEffort::Low),
        Some(ReasoningEffort::Xhigh) => Some(ReasoningEffort::High),
        other => other,
    };
    request.stream_options = None;
}
