//! Programmatic configuration builder for integration tests

use std::net::SocketAddr;

use hchat_config::{Config, CorsConfig, ServerConfig, TelemetryConfig, UpstreamConfig};
use secrecy::SecretString;

/// API key every test config uses
pub const TEST_API_KEY: &str = "sk-test-0123456789abcdef";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Config whose upstream gateway is `api_base`
    pub fn new(api_base: &str) -> Self {
        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: SocketAddr::from(([127, 0, 0, 1], 0)),
                    ..ServerConfig::default()
                },
                upstream: UpstreamConfig {
                    api_key: SecretString::from(TEST_API_KEY),
                    api_base: api_base.parse().expect("valid URL"),
                },
                telemetry: TelemetryConfig::default(),
            },
        }
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Disable the status page
    pub fn without_status_page(mut self) -> Self {
        self.config.server.status_page = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
