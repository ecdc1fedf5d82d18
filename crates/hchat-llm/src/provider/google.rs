//! Google Gemini adapter

use async_trait::async_trait;

use super::{ChatProvider, Endpoint};
use crate::convert::google::map_stream_item;
use crate::error::LlmError;
use crate::protocol::google::{EmbedContentRequest, GoogleContent, GooglePart, GoogleRequest, GoogleResponse};
use crate::sse::JsonEvent;
use crate::transport::{CallDefaults, ChunkStream, Transport, normalize_stream};
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, EmbeddingsRequest};

/// Translating Gemini adapter
#[derive(Debug, Clone)]
pub struct GoogleProvider {
    endpoint: Endpoint,
}

impl GoogleProvider {
    /// Adapter for the configured gateway
    pub const fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn url(&self, model: &str, method: &str, stream: bool) -> String {
        let mut url = format!("{}{model}:{method}?key={}", self.endpoint.base_with("models"), self.endpoint.api_key());
        if stream {
            url.push_str("&alt=sse");
        }
        url
    }

    fn transport(&self, url: String) -> Transport {
        Transport::new(self.endpoint.client(), "google", url)
    }
}

#[async_trait]
impl ChatProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse, LlmError> {
        let body = GoogleRequest::try_from(request)?;
        let url = self.url(&request.model, "generateContent", false);

        let native: GoogleResponse = self.transport(url).json(&body).await?;
        let mut response = ChatCompletionResponse::from(native);
        CallDefaults::new(&request.model).fill_response(&mut response);
        Ok(response)
    }

    async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream, LlmError> {
        let body = GoogleRequest::try_from(request)?;
        let url = self.url(&request.model, "streamGenerateContent", true);

        let events = self.transport(url).events(&body).await?;
        Ok(normalize_stream(events, &request.model, (), decode_event))
    }

    async fn embed(&self, request: &EmbeddingsRequest) -> Result<serde_json::Value, LlmError> {
        let body = EmbedContentRequest {
            content: GoogleContent {
                role: None,
                parts: request
                    .input
                    .texts()
                    .into_iter()
                    .map(|text| GooglePart::Text(text.to_owned()))
                    .collect(),
            },
            output_dimensionality: request.dimensions,
        };
        let url = self.url(&request.model, "embedContent", false);
        self.transport(url).json(&body).await
    }
}

fn decode_event(_: &mut (), event: JsonEvent) -> Result<Option<ChatCompletionChunk>, LlmError> {
    match serde_json::from_value::<GoogleResponse>(event.data) {
        Ok(item) => Ok(map_stream_item(item)),
        Err(e) => {
            tracing::warn!(provider = "google", error = %e, "skipping unrecognized stream item");
            Ok(None)
        }
    }
}
