mod cors;
mod status;

use std::net::SocketAddr;

use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use hchat_config::Config;
use hchat_llm::LlmState;
use http::{Method, StatusCode, Uri};
use secrecy::ExposeSecret;
use tower_http::trace::TraceLayer;

pub use status::mask_key;

/// Assembled server with all routes and middleware
pub struct Server {
    router: Router,
    listen_address: SocketAddr,
}

impl Server {
    /// Build the server from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let listen_address = config.server.listen_address;

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;

        let mut app = Router::new();

        if config.server.status_page {
            let info = status::StatusInfo {
                api_base: config.upstream.api_base.as_str(),
                port: listen_address.port(),
                api_key: config.upstream.api_key.expose_secret(),
            };
            app = app.merge(status::router(&info));
        }

        app = app.merge(hchat_llm::llm_router(LlmState::new(client, &config.upstream)));

        app = app.fallback(route_not_found);

        // Apply middleware layers (innermost first)

        app = app.layer(TraceLayer::new_for_http());

        app = match config.server.cors {
            Some(ref cors_config) => app.layer(cors::cors_layer(cors_config)),
            None => app.layer(cors::default_cors_layer()),
        };

        Ok(Self {
            router: app,
            listen_address,
        })
    }

    /// Get the configured listen address
    #[must_use]
    pub const fn listen_address(&self) -> SocketAddr {
        self.listen_address
    }

    /// Consume the server and return the inner router
    ///
    /// Useful for testing when the caller manages the listener
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Start serving requests
    ///
    /// Blocks until the cancellation token is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the TCP listener or serving fails
    pub async fn serve(self, shutdown: tokio_util::sync::CancellationToken) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.listen_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!("graceful shutdown initiated");
            })
            .await?;

        Ok(())
    }
}

async fn route_not_found(method: Method, uri: Uri) -> Response {
    tracing::warn!(%method, %uri, "no route matched");

    let body = serde_json::json!({
        "error": {
            "message": format!("Route not found: {method} {uri}"),
            "type": "invalid_request_error",
        }
    });

    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
