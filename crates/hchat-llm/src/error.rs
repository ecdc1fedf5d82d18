//! Errors raised while translating and forwarding LLM calls
//!
//! Vendor failures keep the upstream status so handlers can pass it through.

use hchat_core::HttpError;
use http::StatusCode;
use thiserror::Error;

/// Classification of a vendor HTTP error by status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 401
    InvalidCredentials,
    /// 403
    QuotaExceeded,
    /// 429
    RateLimited,
    /// Any other non-2xx status
    Vendor,
}

impl ApiErrorKind {
    /// Classify a vendor status code
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::InvalidCredentials,
            403 => Self::QuotaExceeded,
            429 => Self::RateLimited,
            _ => Self::Vendor,
        }
    }
}

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Vendor answered with a non-2xx status
    #[error("{provider} API error: {status} {message}")]
    Api {
        /// Vendor name
        provider: String,
        /// HTTP status returned by the vendor
        status: u16,
        /// Status classification
        kind: ApiErrorKind,
        /// Message extracted from the vendor body
        message: String,
    },

    /// Request never produced a response
    #[error("transport error: {message}")]
    Transport {
        /// Underlying failure
        message: String,
        /// The connection was refused or could not be established
        refused: bool,
    },

    /// Vendor body did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// Error while reading a response stream
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider name has no adapter
    #[error("unsupported provider: {provider}")]
    UnsupportedProvider { provider: String },

    /// Provider has no embeddings endpoint
    #[error("embeddings are not supported by {provider}")]
    EmbeddingsNotSupported { provider: String },

    /// Requested model is not in the catalog
    #[error("model not found: {model}")]
    ModelNotFound { model: String },

    /// JSON schema could not be sanitized
    #[error("invalid schema: {0}")]
    Schema(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl LlmError {
    /// Vendor error classified by status
    pub fn api(provider: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            kind: ApiErrorKind::from_status(status),
            message: message.into(),
        }
    }

    /// Stable machine code
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Api { kind, .. } => match kind {
                ApiErrorKind::InvalidCredentials => "API_KEY_INVALID",
                ApiErrorKind::QuotaExceeded => "LLM_QUOTA_EXCEEDED",
                ApiErrorKind::RateLimited => "LLM_RATE_LIMIT",
                ApiErrorKind::Vendor => "LLM_API_ERROR",
            },
            Self::Transport { .. } | Self::Streaming(_) => "NETWORK_ERROR",
            Self::Decode(_) => "LLM_API_ERROR",
            Self::InvalidRequest(_) | Self::Schema(_) => "VALIDATION_ERROR",
            Self::UnsupportedProvider { .. } | Self::EmbeddingsNotSupported { .. } => "NOT_IMPLEMENTED",
            Self::ModelNotFound { .. } => "LLM_MODEL_NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Status classification for vendor errors
    pub const fn api_kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Message without the provider/status prefix, for client envelopes
    ///
    /// Vendor errors surface the vendor's own message.
    pub fn vendor_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.client_message(),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }

        Self::Transport {
            refused: err.is_connect(),
            message: err.to_string(),
        }
    }
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Api { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            Self::Transport { refused: true, .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transport { .. } | Self::Decode(_) | Self::Streaming(_) => StatusCode::BAD_GATEWAY,
            Self::InvalidRequest(_) | Self::Schema(_) | Self::UnsupportedProvider { .. } => StatusCode::BAD_REQUEST,
            Self::EmbeddingsNotSupported { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::ModelNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Api { kind, .. } => match kind {
                ApiErrorKind::InvalidCredentials => "authentication_error",
                ApiErrorKind::QuotaExceeded => "insufficient_quota",
                ApiErrorKind::RateLimited => "rate_limit_exceeded",
                ApiErrorKind::Vendor => "api_error",
            },
            Self::Transport { .. } | Self::Decode(_) | Self::Streaming(_) => "api_error",
            Self::InvalidRequest(_)
            | Self::Schema(_)
            | Self::UnsupportedProvider { .. }
            | Self::EmbeddingsNotSupported { .. } => "invalid_request_error",
            Self::ModelNotFound { .. } => "not_found_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Extract a human-readable message from a vendor error body
///
/// JSON bodies use `error.message`, then `message`. HTML and binary bodies
/// are mapped by status, since gateways in front of the vendor answer with
/// their own error pages.
pub fn vendor_error_message(status: u16, content_type: &str, body: &[u8]) -> String {
    if content_type.contains("text/html") || content_type.contains("application/octet-stream") {
        return html_error_message(status, &String::from_utf8_lossy(body));
    }

    if content_type.contains("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).unwrap_or_default();
        return value
            .pointer("/error/message")
            .and_then(serde_json::Value::as_str)
            .or_else(|| value.get("message").and_then(serde_json::Value::as_str))
            .unwrap_or("Unknown error")
            .to_owned();
    }

    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown error")
        .to_owned()
}

fn html_error_message(status: u16, html: &str) -> String {
    match status {
        403 if html.contains("Access Denied") || html.contains("접근이 거부") => {
            "Network access issue: Please use from internal network.".to_owned()
        }
        403 => "Access denied: Check your API Key or permissions.".to_owned(),
        404 => "API endpoint not found.".to_owned(),
        500 => "Internal server error occurred.".to_owned(),
        _ => {
            let excerpt: String = html.chars().take(100).collect();
            format!("Server error ({status}): {excerpt}")
        }
    }
}
