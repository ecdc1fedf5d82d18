//! Anthropic adapter over the gateway's `claude/messages` route

use async_trait::async_trait;
use http::header::AUTHORIZATION;

use super::{ChatProvider, Endpoint};
use crate::convert::anthropic::AnthropicStreamState;
use crate::error::LlmError;
use crate::protocol::anthropic::{AnthropicRequest, AnthropicResponse, AnthropicStreamEvent};
use crate::sse::JsonEvent;
use crate::transport::{CallDefaults, ChunkStream, Transport, normalize_stream};
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse};

/// Translating Anthropic adapter
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    endpoint: Endpoint,
}

impl AnthropicProvider {
    /// Adapter for the configured gateway
    pub const fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn transport(&self) -> Result<Transport, LlmError> {
        let url = format!("{}claude/messages", self.endpoint.base());
        Transport::new(self.endpoint.client(), "anthropic", url)
            .with_header(AUTHORIZATION, &format!("Bearer {}", self.endpoint.api_key()))
    }
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let mut body = AnthropicRequest::from(request);
        body.stream = None;

        let native: AnthropicResponse = self.transport()?.json(&body).await?;
        let mut response = ChatCompletionResponse::from(native);
        CallDefaults::new(&request.model).fill_response(&mut response);
        Ok(response)
    }

    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, LlmError> {
        let mut body = AnthropicRequest::from(request);
        body.stream = Some(true);

        let events = self.transport()?.events(&body).await?;
        Ok(normalize_stream(events, &request.model, AnthropicStreamState::new(), decode_event))
    }
}

fn decode_event(state: &mut AnthropicStreamState, event: JsonEvent) -> Result<Option<ChatCompletionChunk>, LlmError> {
    match serde_json::from_value::<AnthropicStreamEvent>(event.data) {
        Ok(event) => state.map_event(event),
        Err(e) => {
            tracing::warn!(provider = "anthropic", error = %e, "skipping unrecognized stream event");
            Ok(None)
        }
    }
}
