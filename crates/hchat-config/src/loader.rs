use std::net::SocketAddr;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::upstream::{DEFAULT_API_BASE, UpstreamConfig};
use crate::{Config, DEFAULT_PORT, ServerConfig, TelemetryConfig};

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if placeholder expansion, parsing, or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Build configuration from `HCHAT_API_KEY`, `HCHAT_API_BASE` and `PORT`
    ///
    /// Used when the proxy runs headless without a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if `HCHAT_API_KEY` is unset, or if the base URL or
    /// port cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        let Ok(api_key) = std::env::var("HCHAT_API_KEY") else {
            anyhow::bail!("HCHAT_API_KEY environment variable is required");
        };

        let api_base = std::env::var("HCHAT_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_owned());
        let api_base = Url::parse(&api_base).map_err(|e| anyhow::anyhow!("invalid HCHAT_API_BASE: {e}"))?;

        let port = match std::env::var("PORT") {
            Ok(port) => port
                .parse::<u16>()
                .map_err(|e| anyhow::anyhow!("invalid PORT `{port}`: {e}"))?,
            Err(_) => DEFAULT_PORT,
        };

        let config = Self {
            server: ServerConfig {
                listen_address: SocketAddr::from(([127, 0, 0, 1], port)),
                ..ServerConfig::default()
            },
            upstream: UpstreamConfig {
                api_key: SecretString::from(api_key),
                api_base,
            },
            telemetry: TelemetryConfig::default(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is blank or the base URL cannot
    /// carry a path
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upstream.api_key.expose_secret().trim().is_empty() {
            anyhow::bail!("upstream.api_key must not be empty");
        }

        if self.upstream.api_base.cannot_be_a_base() {
            anyhow::bail!("upstream.api_base must be an absolute http(s) URL");
        }

        Ok(())
    }
}
