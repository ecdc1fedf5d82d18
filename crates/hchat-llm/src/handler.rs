//! Axum route handlers for the unified and native endpoints
//!
//! Each public surface reports failures in its own vendor's error envelope,
//! both before the response starts and as a final event once a stream is
//! underway.

use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{Path, RawQuery, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use futures_util::{Stream, StreamExt, stream};
use hchat_core::HttpError;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::catalog::{self, ModelCapabilities};
use crate::error::{ApiErrorKind, LlmError};
use crate::protocol::anthropic::AnthropicErrorResponse;
use crate::provider::passthrough::GooglePassthrough;
use crate::sse::JsonEvent;
use crate::state::LlmState;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest, EmbeddingsRequest};

/// `created` timestamp reported for every catalog model
pub const MODEL_CREATED: u64 = 1_715_367_049;

/// Routes for chat completions, native pass-through, models and embeddings
pub fn llm_router(state: LlmState) -> Router {
    Router::new()
        .route("/v1/chat/completions", routing::post(chat_completions))
        .route("/v1/messages", routing::post(anthropic_messages))
        .route("/messages", routing::post(anthropic_messages))
        .route("/v1beta/models/{*rest}", routing::post(google_native))
        .route("/v1/models", routing::get(list_models))
        .route("/v1/models/{id}", routing::get(retrieve_model))
        .route("/v1/embeddings", routing::post(embeddings))
        .with_state(state)
}

/// Which vendor's error envelope a caller expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    OpenAi,
    Anthropic,
    Google,
}

impl Surface {
    fn error_body(self, error: &LlmError) -> Value {
        let message = error.vendor_message();

        match self {
            Self::OpenAi => json!({
                "error": {
                    "message": message,
                    "type": error.error_type(),
                    "code": error.code(),
                }
            }),
            Self::Anthropic => json!(AnthropicErrorResponse::new(anthropic_error_type(error), message)),
            Self::Google => json!({
                "error": {
                    "code": error.status_code().as_u16(),
                    "message": message,
                    "status": google_status(error.status_code()),
                }
            }),
        }
    }

    fn error_response(self, error: &LlmError) -> Response {
        tracing::error!(surface = ?self, code = error.code(), %error, "request failed");
        (error.status_code(), Json(self.error_body(error))).into_response()
    }

    /// Final event for an error raised after the stream started
    fn stream_error(self, error: &LlmError) -> Event {
        tracing::error!(surface = ?self, %error, "stream failed after response started");

        match self {
            Self::Anthropic => Event::default()
                .event("error")
                .data(json!(AnthropicErrorResponse::new("overloaded_error", error.vendor_message())).to_string()),
            Self::OpenAi | Self::Google => Event::default().data(proxy_error(error).to_string()),
        }
    }
}

fn proxy_error(error: &LlmError) -> Value {
    json!({"error": {"message": error.vendor_message(), "type": "proxy_error"}})
}

fn anthropic_error_type(error: &LlmError) -> &'static str {
    match error.api_kind() {
        Some(ApiErrorKind::RateLimited) => "rate_limit_error",
        Some(ApiErrorKind::InvalidCredentials) => "authentication_error",
        Some(ApiErrorKind::QuotaExceeded) => "permission_error",
        Some(ApiErrorKind::Vendor) => "api_error",
        None => match error.status_code() {
            StatusCode::NOT_FOUND => "not_found_error",
            status if status.is_client_error() || status == StatusCode::NOT_IMPLEMENTED => "invalid_request_error",
            _ => "api_error",
        },
    }
}

const fn google_status(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "INVALID_ARGUMENT",
        401 => "UNAUTHENTICATED",
        403 => "PERMISSION_DENIED",
        404 => "NOT_FOUND",
        429 => "RESOURCE_EXHAUSTED",
        501 => "UNIMPLEMENTED",
        503 => "UNAVAILABLE",
        504 => "DEADLINE_EXCEEDED",
        500 => "INTERNAL",
        _ => "UNKNOWN",
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, LlmError> {
    serde_json::from_slice(body).map_err(|e| LlmError::InvalidRequest(format!("Invalid JSON body: {e}")))
}

/// Re-emit `items` as SSE, ending after the first error or with `trailer`
fn sse_response<T, S>(items: S, render: fn(T) -> Event, surface: Surface, trailer: Option<Event>) -> Response
where
    T: Send + 'static,
    S: Stream<Item = Result<T, LlmError>> + Send + Unpin + 'static,
{
    let events = stream::unfold(Some((items, trailer)), move |state| async move {
        let (mut items, trailer) = state?;
        match items.next().await {
            Some(Ok(item)) => Some((Ok::<_, Infallible>(render(item)), Some((items, trailer)))),
            Some(Err(error)) => Some((Ok(surface.stream_error(&error)), None)),
            None => trailer.map(|event| (Ok(event), None)),
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default()).into_response()
}

fn chunk_event(chunk: ChatCompletionChunk) -> Event {
    Event::default().data(serde_json::to_string(&chunk).unwrap_or_default())
}

fn anthropic_event(event: JsonEvent) -> Event {
    let name = event
        .data
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .or(event.event)
        .unwrap_or_else(|| "message".to_owned());

    Event::default().event(name).data(event.data.to_string())
}

fn google_event(event: JsonEvent) -> Event {
    Event::default().data(event.data.to_string())
}

// -- Unified endpoint --

/// Handle `POST /v1/chat/completions`
async fn chat_completions(State(state): State<LlmState>, body: Bytes) -> Response {
    let request: ChatCompletionRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return Surface::OpenAi.error_response(&e),
    };

    if request.is_stream() {
        match state.dispatcher().stream(&request).await {
            Ok(chunks) => sse_response(chunks, chunk_event, Surface::OpenAi, Some(Event::default().data("[DONE]"))),
            Err(e) => Surface::OpenAi.error_response(&e),
        }
    } else {
        match state.dispatcher().complete(&request).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => Surface::OpenAi.error_response(&e),
        }
    }
}

// -- Native pass-through --

/// Handle `POST /v1/messages` and `POST /messages`
async fn anthropic_messages(State(state): State<LlmState>, body: Bytes) -> Response {
    let body: Value = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return Surface::Anthropic.error_response(&e),
    };
    let passthrough = &state.inner.anthropic;

    if body.get("stream").and_then(Value::as_bool).unwrap_or(false) {
        match passthrough.stream(&body).await {
            Ok(events) => sse_response(events, anthropic_event, Surface::Anthropic, None),
            Err(e) => Surface::Anthropic.error_response(&e),
        }
    } else {
        match passthrough.complete(&body).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => Surface::Anthropic.error_response(&e),
        }
    }
}

/// Handle `POST /v1beta/models/{model}:{method}`
async fn google_native(
    State(state): State<LlmState>,
    Path(rest): Path<String>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Response {
    let body: Value = match parse_body(&body) {
        Ok(body) => body,
        Err(e) => return Surface::Google.error_response(&e),
    };
    let path = format!("models/{rest}");
    let passthrough = &state.inner.google;

    if !GooglePassthrough::is_stream_path(&path) {
        return match passthrough.complete(&path, &body).await {
            Ok(response) => Json(response).into_response(),
            Err(e) => Surface::Google.error_response(&e),
        };
    }

    let events = match passthrough.stream(&path, &body).await {
        Ok(events) => events,
        Err(e) => return Surface::Google.error_response(&e),
    };

    if query.as_deref().is_some_and(|q| q.contains("alt=sse")) {
        sse_response(events, google_event, Surface::Google, None)
    } else {
        json_array_response(events)
    }
}

/// Stream events as a chunked JSON array `[\n<a>,\n<b>\n]`
fn json_array_response<S>(events: S) -> Response
where
    S: Stream<Item = Result<JsonEvent, LlmError>> + Send + Unpin + 'static,
{
    let items = stream::unfold(Some((events, true)), |state| async move {
        let (mut events, first) = state?;
        let piece = match events.next().await {
            Some(Ok(event)) => {
                let separator = if first { "" } else { ",\n" };
                return Some((Ok(Bytes::from(format!("{separator}{}", event.data))), Some((events, false))));
            }
            Some(Err(error)) => {
                tracing::error!(%error, "stream failed after response started");
                format!("data: {}\n\n", proxy_error(&error))
            }
            None => "\n]".to_owned(),
        };
        Some((Ok(Bytes::from(piece)), None))
    });

    let body = stream::once(async { Ok::<_, Infallible>(Bytes::from_static(b"[\n")) }).chain(items);
    ([(CONTENT_TYPE, "application/json")], Body::from_stream(body)).into_response()
}

// -- Models and embeddings --

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: &'static str,
    object: &'static str,
    created: u64,
    owned_by: &'static str,
}

impl From<&ModelCapabilities> for ModelEntry {
    fn from(caps: &ModelCapabilities) -> Self {
        Self {
            id: caps.model,
            object: "model",
            created: MODEL_CREATED,
            owned_by: caps.provider.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ModelList {
    object: &'static str,
    data: Vec<ModelEntry>,
}

/// Handle `GET /v1/models`
async fn list_models() -> Json<ModelList> {
    Json(ModelList {
        object: "list",
        data: catalog::iter().map(ModelEntry::from).collect(),
    })
}

/// Handle `GET /v1/models/{id}`
async fn retrieve_model(Path(id): Path<String>) -> Response {
    match catalog::find(&id) {
        Some(caps) => Json(ModelEntry::from(caps)).into_response(),
        None => Surface::OpenAi.error_response(&LlmError::ModelNotFound { model: id }),
    }
}

/// Handle `POST /v1/embeddings`
async fn embeddings(State(state): State<LlmState>, body: Bytes) -> Response {
    let request: EmbeddingsRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return Surface::OpenAi.error_response(&e),
    };

    match state.dispatcher().embed(&request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => Surface::OpenAi.error_response(&e),
    }
}
