#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
mod loader;
pub mod server;
pub mod telemetry;
pub mod upstream;

use serde::Deserialize;

pub use cors::*;
pub use server::*;
pub use telemetry::*;
pub use upstream::*;

/// Top-level proxy configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Listener and HTTP surface settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Vendor gateway the proxy forwards to
    pub upstream: UpstreamConfig,
    /// Logging configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
