//! Mock vendor gateway for integration tests
//!
//! Serves the paths the proxy calls under `/v2/api/`: Anthropic
//! `claude/messages`, Gemini `models/{model}:{method}` and Azure
//! `openai/deployments/{model}/...`, answering with canned JSON and SSE.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// A request the mock received
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Recorded {
    /// Header value as a string
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
    }
}

/// How a streamed answer goes wrong after it has started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFault {
    /// The first `events` events, then an Anthropic `error` event
    ErrorEvent { events: usize },
    /// The first `events` events, then the connection drops
    Disconnect { events: usize },
}

struct MockState {
    fail_status: Option<StatusCode>,
    stream_fault: Option<StreamFault>,
    requests: Mutex<Vec<Recorded>>,
}

/// Mock gateway bound to an ephemeral port
pub struct MockUpstream {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockState>,
}

impl MockUpstream {
    /// Start a mock that answers every call successfully
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_inner(None, None).await
    }

    /// Start a mock that answers every call with `status`
    pub async fn start_failing(status: StatusCode) -> anyhow::Result<Self> {
        Self::start_inner(Some(status), None).await
    }

    /// Start a mock whose streamed answers break with `fault`
    pub async fn start_with_stream_fault(fault: StreamFault) -> anyhow::Result<Self> {
        Self::start_inner(None, Some(fault)).await
    }

    async fn start_inner(fail_status: Option<StatusCode>, stream_fault: Option<StreamFault>) -> anyhow::Result<Self> {
        let state = Arc::new(MockState {
            fail_status,
            stream_fault,
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Gateway base URL to configure as `upstream.api_base`
    pub fn api_base(&self) -> String {
        format!("http://{}/v2/api", self.addr)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().expect("mock lock").clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("mock received a request")
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Canned bodies --

pub const ANTHROPIC_TEXT: &str = "Hello from Claude";

fn anthropic_message() -> Value {
    json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-5",
        "content": [
            {"type": "thinking", "thinking": "Let me think", "signature": "sig"},
            {"type": "text", "text": ANTHROPIC_TEXT}
        ],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 7, "cache_read_input_tokens": 3}
    })
}

const ANTHROPIC_STREAM: &str = concat!(
    "event: message_start\n",
    "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_mock\",\"model\":\"claude-sonnet-4-5\",\"usage\":{\"input_tokens\":12,\"output_tokens\":1}}}\n\n",
    "event: content_block_start\n",
    "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"thinking\",\"thinking\":\"\"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"Let me \"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"thinking_delta\",\"thinking\":\"think\"}}\n\n",
    "event: content_block_stop\n",
    "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
    "event: ping\n",
    "data: {\"type\":\"ping\"}\n\n",
    "event: content_block_start\n",
    "data: {\"type\":\"content_block_start\",\"index\":1,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello \"}}\n\n",
    "event: content_block_delta\n",
    "data: {\"type\":\"content_block_delta\",\"index\":1,\"delta\":{\"type\":\"text_delta\",\"text\":\"from Claude\"}}\n\n",
    "event: content_block_stop\n",
    "data: {\"type\":\"content_block_stop\",\"index\":1}\n\n",
    "event: message_delta\n",
    "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":9}}\n\n",
    "event: message_stop\n",
    "data: {\"type\":\"message_stop\"}\n\n",
);

pub const GOOGLE_TEXT: &str = "Hello from Gemini";

fn google_response() -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [
                {"text": "Weighing options", "thought": true},
                {"text": GOOGLE_TEXT},
                {"functionCall": {"name": "get_weather", "args": {"city": "Seoul"}}}
            ]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {
            "promptTokenCount": 3,
            "candidatesTokenCount": 10,
            "thoughtsTokenCount": 5,
            "totalTokenCount": 18
        },
        "modelVersion": "gemini-2.5-pro",
        "responseId": "resp-google"
    })
}

// no finishReason anywhere: the proxy has to backfill it
const GOOGLE_STREAM: &str = concat!(
    "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"Hello \"}]}}],\"modelVersion\":\"gemini-2.5-pro\",\"responseId\":\"resp-stream\"}\n\n",
    "data: {\"candidates\":[{\"content\":{\"role\":\"model\",\"parts\":[{\"text\":\"from Gemini\"}]}}],\"modelVersion\":\"gemini-2.5-pro\",\"responseId\":\"resp-stream\"}\n\n",
    "data: {\"usageMetadata\":{\"promptTokenCount\":3,\"candidatesTokenCount\":4,\"totalTokenCount\":7}}\n\n",
);

pub const AZURE_TEXT: &str = "Hello from Azure";

fn azure_completion(model: &str) -> Value {
    json!({
        "id": "chatcmpl-azure",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": AZURE_TEXT},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 4, "total_tokens": 9}
    })
}

fn azure_stream(model: &str) -> String {
    let chunk = |delta: Value, finish: Value| {
        json!({
            "id": "chatcmpl-azure-stream",
            "object": "chat.completion.chunk",
            "created": 1_700_000_000,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish}]
        })
    };

    [
        chunk(json!({"role": "assistant", "content": ""}), Value::Null),
        chunk(json!({"content": "Hello "}), Value::Null),
        chunk(json!({"content": "from Azure"}), Value::Null),
        chunk(json!({}), json!("stop")),
    ]
    .iter()
    .map(|c| format!("data: {c}\n\n"))
    .chain(std::iter::once("data: [DONE]\n\n".to_owned()))
    .collect()
}

fn embedding() -> Value {
    json!({
        "object": "list",
        "data": [{"object": "embedding", "embedding": [0.1, 0.2, 0.3], "index": 0}],
        "model": "text-embedding-3-small",
        "usage": {"prompt_tokens": 2, "total_tokens": 2}
    })
}

// -- Handler --

fn json_response(body: Value) -> Response {
    axum::Json(body).into_response()
}

const ANTHROPIC_OVERLOADED: &str = concat!(
    "event: error\n",
    "data: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}\n\n",
);

fn sse_response(body: String, fault: Option<StreamFault>) -> Response {
    let Some(fault) = fault else {
        return ([(CONTENT_TYPE, "text/event-stream")], body).into_response();
    };

    let (StreamFault::ErrorEvent { events } | StreamFault::Disconnect { events }) = fault;
    let mut head: String = body.split_inclusive("\n\n").take(events).collect();

    let body = match fault {
        StreamFault::ErrorEvent { .. } => {
            head.push_str(ANTHROPIC_OVERLOADED);
            Body::from(head)
        }
        StreamFault::Disconnect { .. } => {
            let first = stream::once(async move { Ok::<_, std::io::Error>(Bytes::from(head)) });
            // head is flushed before the body fails
            let cut = stream::once(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err(std::io::Error::other("mock upstream disconnected"))
            });
            Body::from_stream(first.chain(cut))
        }
    };

    ([(CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn handle(State(state): State<Arc<MockState>>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path = uri.path().to_owned();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

    state.requests.lock().expect("mock lock").push(Recorded {
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        headers,
        body,
    });

    if let Some(status) = state.fail_status {
        return (status, axum::Json(json!({"error": {"message": "mock failure", "code": status.as_u16()}})))
            .into_response();
    }

    let Some(rest) = path.strip_prefix("/v2/api/") else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if rest == "claude/messages" {
        return if stream {
            sse_response(ANTHROPIC_STREAM.to_owned(), state.stream_fault)
        } else {
            json_response(anthropic_message())
        };
    }

    if let Some(call) = rest.strip_prefix("models/") {
        return match call.rsplit_once(':') {
            Some((_, "generateContent")) => json_response(google_response()),
            Some((_, "streamGenerateContent")) => sse_response(GOOGLE_STREAM.to_owned(), state.stream_fault),
            Some((_, "embedContent")) => json_response(json!({"embedding": {"values": [0.5, 0.25]}})),
            _ => StatusCode::NOT_FOUND.into_response(),
        };
    }

    if let Some(deployment) = rest.strip_prefix("openai/deployments/") {
        return match deployment.split_once('/') {
            Some((model, "chat/completions")) if stream => sse_response(azure_stream(model), state.stream_fault),
            Some((model, "chat/completions")) => json_response(azure_completion(model)),
            Some((_, "embeddings")) => json_response(embedding()),
            _ => StatusCode::NOT_FOUND.into_response(),
        };
    }

    StatusCode::NOT_FOUND.into_response()
}
