//! Untranslated forwarding for the native Anthropic and Gemini endpoints
//!
//! Bodies and answers are forwarded as they are. No identity backfill or
//! finish-reason patching happens on this path.

use http::header::AUTHORIZATION;
use serde_json::Value;

use super::Endpoint;
use crate::error::LlmError;
use crate::transport::{EventStream, Transport};

/// Native Messages API forwarding
#[derive(Debug, Clone)]
pub struct AnthropicPassthrough {
    endpoint: Endpoint,
}

impl AnthropicPassthrough {
    /// Forwarder for the configured gateway
    pub const fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    fn transport(&self) -> Result<Transport, LlmError> {
        let url = format!("{}claude/messages", self.endpoint.base());
        // the gateway expects the raw key here, without a scheme
        Transport::new(self.endpoint.client(), "anthropic", url).with_header(AUTHORIZATION, self.endpoint.api_key())
    }

    /// Forward a non-streaming request
    ///
    /// # Errors
    ///
    /// Returns the classified vendor error for non-2xx answers.
    pub async fn complete(&self, body: &Value) -> Result<Value, LlmError> {
        self.transport()?.json(body).await
    }

    /// Forward a streaming request
    ///
    /// # Errors
    ///
    /// Returns the classified vendor error for non-2xx answers.
    pub async fn stream(&self, body: &Value) -> Result<EventStream, LlmError> {
        self.transport()?.events(body).await
    }
}

/// Native Gemini forwarding
#[derive(Debug, Clone)]
pub struct GooglePassthrough {
    endpoint: Endpoint,
}

impl GooglePassthrough {
    /// Forwarder for the configured gateway
    pub const fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    /// Whether an inbound path names a streaming method
    pub fn is_stream_path(path: &str) -> bool {
        path.contains("stream") || path.contains("sse")
    }

    /// Vendor URL for an inbound `/v1beta/models/{model}:{method}` path
    pub fn url(&self, path: &str, stream: bool) -> String {
        let path = match path.find("models/") {
            Some(start) => path[start..].to_owned(),
            None => {
                let mut rest = path.trim_start_matches('/');
                while let Some(stripped) = ["v1beta/", "v1/"].into_iter().find_map(|p| rest.strip_prefix(p)) {
                    rest = stripped.trim_start_matches('/');
                }
                if rest.starts_with("models/") {
                    rest.to_owned()
                } else {
                    format!("models/{rest}")
                }
            }
        };

        let separator = if path.contains('?') { '&' } else { '?' };
        let mut url = format!("{}{path}{separator}key={}", self.endpoint.base(), self.endpoint.api_key());
        if stream {
            url.push_str("&alt=sse");
        }
        url
    }

    fn transport(&self, path: &str, stream: bool) -> Transport {
        Transport::new(self.endpoint.client(), "google", self.url(path, stream))
    }

    /// Forward a non-streaming request
    ///
    /// # Errors
    ///
    /// Returns the classified vendor error for non-2xx answers.
    pub async fn complete(&self, path: &str, body: &Value) -> Result<Value, LlmError> {
        self.transport(path, false).json(body).await
    }

    /// Forward a streaming request
    ///
    /// # Errors
    ///
    /// Returns the classified vendor error for non-2xx answers.
    pub async fn stream(&self, path: &str, body: &Value) -> Result<EventStream, LlmError> {
        self.transport(path, true).events(body).await
    }
}
