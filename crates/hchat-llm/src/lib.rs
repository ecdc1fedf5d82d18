//! Translation layer of the proxy
//!
//! Accepts `OpenAI`-style chat completions and serves them from Azure/`OpenAI`,
//! Anthropic, Google Gemini or Ollama, normalizing bodies, streams, usage and
//! finish reasons on the way back. Native Anthropic and Gemini requests are
//! forwarded untouched.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod catalog;
pub mod convert;
pub mod dispatch;
pub mod error;
#[cfg(feature = "http")]
mod handler;
pub mod protocol;
pub mod provider;
pub mod sse;
#[cfg(feature = "http")]
mod state;
pub mod transport;
pub mod types;

pub use dispatch::Dispatcher;
pub use error::LlmError;
#[cfg(feature = "http")]
pub use handler::{MODEL_CREATED, llm_router};
pub use provider::{ChatProvider, ProviderKind};
#[cfg(feature = "http")]
pub use state::LlmState;
