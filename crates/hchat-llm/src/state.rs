//! Shared state for the LLM route handlers

use std::sync::Arc;

use hchat_config::UpstreamConfig;
use reqwest::Client;

use crate::dispatch::Dispatcher;
use crate::provider::Endpoint;
use crate::provider::passthrough::{AnthropicPassthrough, GooglePassthrough};

/// Cloneable handle passed to every handler
#[derive(Clone)]
pub struct LlmState {
    pub(crate) inner: Arc<LlmStateInner>,
}

pub(crate) struct LlmStateInner {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) anthropic: AnthropicPassthrough,
    pub(crate) google: GooglePassthrough,
}

impl LlmState {
    /// Build the state around one shared HTTP client
    pub fn new(client: Client, upstream: &UpstreamConfig) -> Self {
        let endpoint = Endpoint::new(client.clone(), upstream);

        Self {
            inner: Arc::new(LlmStateInner {
                dispatcher: Dispatcher::new(client, upstream.clone()),
                anthropic: AnthropicPassthrough::new(endpoint.clone()),
                google: GooglePassthrough::new(endpoint),
            }),
        }
    }

    /// Dispatcher for normalized requests
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }
}
