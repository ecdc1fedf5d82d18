mod harness;

use harness::config::ConfigBuilder;
use harness::mock_upstream::{ANTHROPIC_TEXT, AZURE_TEXT, GOOGLE_TEXT, MockUpstream, StreamFault};
use harness::server::TestServer;
use harness::sse;
use serde_json::json;

fn streaming_body(model: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": "Hello"}],
        "stream": true
    })
}

async fn stream_text(model: &str) -> (MockUpstream, String) {
    let mock = MockUpstream::start().await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.api_base()).build()).await.unwrap();

    let resp = server.post("/v1/chat/completions", &streaming_body(model)).await;
    assert_eq!(resp.status(), 200);

    let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap().to_owned();
    assert!(content_type.starts_with("text/event-stream"), "got {content_type}");

    (mock, resp.text().await.unwrap())
}

#[tokio::test]
async fn claude_stream_reassembles_thinking_and_text() {
    let (mock, text) = stream_text("claude-sonnet-4-5").await;
    let chunks = sse::json_chunks(&text);

    let content = sse::content(&chunks);
    assert_eq!(content, format!("<think>\nLet me think\n</think>\n{ANTHROPIC_TEXT}"));
    assert_eq!(content.matches("<think>").count(), 1);
    assert_eq!(content.matches("</think>").count(), 1);

    assert_eq!(sse::finish_reasons(&chunks), ["stop"]);
    assert!(chunks.iter().all(|c| c["id"] == "msg_mock"));
    assert!(chunks.iter().all(|c| c["object"] == "chat.completion.chunk"));
    assert_eq!(sse::data_lines(&text).last().map(String::as_str), Some("[DONE]"));

    assert_eq!(mock.last_request().body["stream"], true);
}

#[tokio::test]
async fn gemini_stream_backfills_finish_reason() {
    let (mock, text) = stream_text("gemini-2.5-flash").await;
    let chunks = sse::json_chunks(&text);

    assert_eq!(sse::content(&chunks), GOOGLE_TEXT);
    assert_eq!(sse::finish_reasons(&chunks), ["stop"]);
    let last = chunks.last().unwrap();
    assert_eq!(last["choices"][0]["finish_reason"], "stop");
    assert_eq!(last["usage"]["prompt_tokens"], 3);

    let upstream = mock.last_request();
    assert_eq!(upstream.path, "/v2/api/models/gemini-2.5-flash:streamGenerateContent");
    assert!(upstream.query.unwrap().ends_with("&alt=sse"));
}

#[tokio::test]
async fn azure_stream_is_relayed_once_finished() {
    let (_mock, text) = stream_text("gpt-4o").await;
    let chunks = sse::json_chunks(&text);

    assert_eq!(sse::content(&chunks), AZURE_TEXT);
    assert_eq!(sse::finish_reasons(&chunks), ["stop"]);
    assert!(chunks.iter().all(|c| c["id"] == "chatcmpl-azure-stream"));

    let done = sse::data_lines(&text).into_iter().filter(|d| d == "[DONE]").count();
    assert_eq!(done, 1);
}

async fn faulted_server(fault: StreamFault) -> (MockUpstream, TestServer) {
    let mock = MockUpstream::start_with_stream_fault(fault).await.unwrap();
    let server = TestServer::start(ConfigBuilder::new(&mock.api_base()).build()).await.unwrap();
    (mock, server)
}

#[tokio::test]
async fn vendor_error_event_ends_chat_stream_with_proxy_error() {
    let (_mock, server) = faulted_server(StreamFault::ErrorEvent { events: 8 }).await;

    let resp = server.post("/v1/chat/completions", &streaming_body("claude-sonnet-4-5")).await;
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();

    let data = sse::data_lines(&text);
    assert!(!data.iter().any(|d| d == "[DONE]"));

    let chunks = sse::json_chunks(&text);
    let (last, rest) = chunks.split_last().unwrap();
    assert_eq!(last["error"]["type"], "proxy_error");
    assert_eq!(sse::content(rest), "<think>\nLet me think\n</think>\nHello ");
}

#[tokio::test]
async fn dropped_upstream_ends_chat_stream_with_proxy_error() {
    let (_mock, server) = faulted_server(StreamFault::Disconnect { events: 2 }).await;

    let text = server
        .post("/v1/chat/completions", &streaming_body("gpt-4o"))
        .await
        .text()
        .await
        .unwrap();

    let chunks = sse::json_chunks(&text);
    assert_eq!(chunks.last().unwrap()["error"]["type"], "proxy_error");
    assert_eq!(sse::content(&chunks), "Hello ");
    assert!(!sse::data_lines(&text).iter().any(|d| d == "[DONE]"));
}

#[tokio::test]
async fn dropped_upstream_ends_native_anthropic_stream_with_error_event() {
    let (_mock, server) = faulted_server(StreamFault::Disconnect { events: 3 }).await;
    let body = json!({
        "model": "claude-sonnet-4-5",
        "max_tokens": 256,
        "stream": true,
        "messages": [{"role": "user", "content": "hi"}]
    });

    let text = server.post("/v1/messages", &body).await.text().await.unwrap();

    assert_eq!(
        sse::event_names(&text),
        ["message_start", "content_block_start", "content_block_delta", "error"]
    );
    let last: serde_json::Value = serde_json::from_str(sse::data_lines(&text).last().unwrap()).unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["error"]["type"], "overloaded_error");
}

#[tokio::test]
async fn dropped_upstream_ends_gemini_array_with_error_line() {
    let (_mock, server) = faulted_server(StreamFault::Disconnect { events: 1 }).await;
    let body = json!({"contents": [{"role": "user", "parts": [{"text": "hi"}]}]});

    let text = server
        .post("/v1beta/models/gemini-2.5-flash:streamGenerateContent", &body)
        .await
        .text()
        .await
        .unwrap();

    assert!(text.starts_with("[\n{"), "got {text}");
    let error: serde_json::Value = serde_json::from_str(sse::data_lines(&text).last().unwrap()).unwrap();
    assert_eq!(error["error"]["type"], "proxy_error");
    assert!(!text.ends_with("\n]"));
}
