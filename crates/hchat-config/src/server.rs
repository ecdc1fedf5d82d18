use std::net::SocketAddr;

use serde::Deserialize;

use crate::cors::CorsConfig;

/// Port the proxy listens on when nothing else is configured
pub const DEFAULT_PORT: u16 = 11435;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind
    #[serde(default = "default_listen_address")]
    pub listen_address: SocketAddr,
    /// CORS policy; permissive when absent
    #[serde(default)]
    pub cors: Option<CorsConfig>,
    /// Serve the HTML status page on `/` and `/v1`
    #[serde(default = "default_true")]
    pub status_page: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            cors: None,
            status_page: true,
        }
    }
}

fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

const fn default_true() -> bool {
    true
}
