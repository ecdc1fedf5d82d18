//! Logging setup for the proxy
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and a single
//! fmt layer, either human-readable or JSON.

use hchat_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Handle returned by [`init`]
pub struct TelemetryGuard {
    filter: String,
}

impl TelemetryGuard {
    /// Filter directive that was actually installed
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Resolve the filter directive: `RUST_LOG` wins over the configured value
pub fn resolve_filter(config: &TelemetryConfig) -> String {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.log_filter.clone())
}

/// Initialize the global subscriber
///
/// Invalid filter directives fall back to `info` instead of failing startup.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    let directive = resolve_filter(config);
    let (filter, installed) = match EnvFilter::try_new(&directive) {
        Ok(filter) => (filter, directive),
        Err(_) => (EnvFilter::new("info"), "info".to_owned()),
    };

    let fmt_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(TelemetryGuard { filter: installed })
}
