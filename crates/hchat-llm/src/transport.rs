//! HTTP transport shared by every vendor adapter
//!
//! A [`Transport`] posts one JSON body to one vendor URL. Non-2xx answers are
//! classified into [`LlmError::Api`]. [`normalize_stream`] turns a vendor's
//! decoded SSE events into normalized chunks, filling identity fields the
//! vendor left out and patching a missing final `finish_reason`.

use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{LlmError, vendor_error_message};
use crate::sse::{self, JsonEvent};
use crate::types::{
    ChatCompletionChunk, ChatCompletionResponse, ChunkChoice, FinishReason, THINK_CLOSE, THINK_OPEN,
    unix_now,
};

/// Stream of normalized chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, LlmError>> + Send>>;

/// Stream of decoded SSE events
pub type EventStream = Pin<Box<dyn Stream<Item = Result<JsonEvent, LlmError>> + Send>>;

/// One vendor endpoint with its auth headers
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    provider: &'static str,
    url: String,
    headers: HeaderMap,
}

impl Transport {
    /// Transport posting to `url`
    pub fn new(client: Client, provider: &'static str, url: impl Into<String>) -> Self {
        Self {
            client,
            provider,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    /// Add a header sent with every request
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` when the value is not a valid header value.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, LlmError> {
        let mut value = HeaderValue::from_str(value)
            .map_err(|e| LlmError::Internal(anyhow::anyhow!("invalid `{name}` header for {}: {e}", self.provider)))?;
        value.set_sensitive(true);
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Post `body` and return the successful response
    ///
    /// # Errors
    ///
    /// Connection failures become `LlmError::Transport`; non-2xx statuses
    /// become `LlmError::Api` carrying the vendor's message.
    pub async fn send<B: Serialize + ?Sized>(&self, body: &B, stream: bool) -> Result<Response, LlmError> {
        tracing::debug!(provider = self.provider, url = %redact_key(&self.url), stream, "calling upstream");

        let mut builder = self.client.post(&self.url).headers(self.headers.clone()).json(body);
        if stream {
            builder = builder.header(ACCEPT, "text/event-stream");
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(provider = self.provider, error = %e, "upstream request failed");
            LlmError::from(e)
        })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(self.provider, response).await)
        }
    }

    /// Post `body` and decode the JSON answer
    ///
    /// # Errors
    ///
    /// Everything [`Transport::send`] returns, plus `LlmError::Decode` when
    /// the body is not the expected shape.
    pub async fn json<B, R>(&self, body: &B) -> Result<R, LlmError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let bytes = self.send(body, false).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| LlmError::Decode(format!("{} response: {e}", self.provider)))
    }

    /// Post `body` and decode the answer as an SSE stream of JSON events
    ///
    /// # Errors
    ///
    /// Everything [`Transport::send`] returns. Errors after the stream
    /// started are items of the returned stream.
    pub async fn events<B: Serialize + ?Sized>(&self, body: &B) -> Result<EventStream, LlmError> {
        let response = self.send(body, true).await?;
        Ok(Box::pin(sse::json_events(Box::pin(response.bytes_stream()), self.provider)))
    }
}

/// Classify a non-2xx response
pub async fn error_from_response(provider: &'static str, response: Response) -> LlmError {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body = response.bytes().await.unwrap_or_default();

    let message = vendor_error_message(status, &content_type, &body);
    tracing::warn!(provider, status, %message, "upstream returned error");
    LlmError::api(provider, status, message)
}

/// Replace the value of a `key` query parameter
fn redact_key(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_owned();
    };
    if parsed.query().is_none() {
        return url.to_owned();
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == "key" { "REDACTED".into() } else { value };
            (name.into_owned(), value.into_owned())
        })
        .collect();
    parsed.query_pairs_mut().clear().extend_pairs(pairs);
    parsed.into()
}

/// Identity fields shared by every chunk of one call
///
/// The generated id and timestamp are used until the vendor supplies its
/// own, which then replace them for the rest of the call.
#[derive(Debug, Clone)]
pub struct CallDefaults {
    id: String,
    created: u64,
    model: String,
    reasoning_open: bool,
    finish_seen: bool,
}

impl CallDefaults {
    /// Defaults for one call to `model`
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            created: unix_now(),
            model: model.into(),
            reasoning_open: false,
            finish_seen: false,
        }
    }

    /// Generated or vendor-supplied response id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fill missing identity fields and finish reasons of a full response
    pub fn fill_response(&self, response: &mut ChatCompletionResponse) {
        if response.id.is_empty() {
            response.id.clone_from(&self.id);
        }
        if response.created == 0 {
            response.created = self.created;
        }
        if response.model.is_empty() {
            response.model.clone_from(&self.model);
        }

        for choice in &mut response.choices {
            choice.finish_reason.get_or_insert(FinishReason::Stop);
            choice.message.fold_reasoning();
        }
    }

    /// Fill a chunk in place; `false` means the chunk carries nothing
    pub fn fill_chunk(&mut self, chunk: &mut ChatCompletionChunk) -> bool {
        if chunk.choices.is_empty() && chunk.usage.is_none() {
            return false;
        }

        share(&mut chunk.id, &mut self.id);
        share(&mut chunk.model, &mut self.model);
        if chunk.created == 0 {
            chunk.created = self.created;
        } else {
            self.created = chunk.created;
        }

        for (position, choice) in (0u32..).zip(chunk.choices.iter_mut()) {
            for (slot, call) in (0u32..).zip(choice.delta.tool_calls.iter_mut().flatten()) {
                call.index.get_or_insert(slot);
            }
            if choice.finish_reason.is_some() {
                self.finish_seen = true;
            }
            if position == 0 {
                self.fold_reasoning(choice);
            }
        }

        true
    }

    /// Wrap streamed `reasoning_content` in one pair of think tags
    fn fold_reasoning(&mut self, choice: &mut ChunkChoice) {
        let delta = &mut choice.delta;
        let reasoning = delta.reasoning_content.take().filter(|r| !r.is_empty());
        let text = delta.content.take().filter(|c| !c.is_empty());
        let mut content = String::new();

        if let Some(reasoning) = reasoning {
            if !std::mem::replace(&mut self.reasoning_open, true) {
                content.push_str(THINK_OPEN);
            }
            content.push_str(&reasoning);
        }

        let answer_started = text.is_some() || delta.tool_calls.is_some() || choice.finish_reason.is_some();
        if self.reasoning_open && answer_started {
            content.push_str(THINK_CLOSE);
            self.reasoning_open = false;
        }
        if let Some(text) = text {
            content.push_str(&text);
        }

        delta.content = (!content.is_empty()).then_some(content);
    }

    /// Patch the final chunk of a stream
    ///
    /// A stream that never reported a finish reason ends with `stop`.
    pub fn finish_chunk(&mut self, chunk: &mut ChatCompletionChunk) {
        if self.finish_seen {
            return;
        }
        self.finish_seen = true;

        if chunk.choices.is_empty() {
            chunk.choices.push(ChunkChoice::default());
        }
        if let Some(choice) = chunk.choices.first_mut() {
            choice.finish_reason = Some(FinishReason::Stop);
            if std::mem::take(&mut self.reasoning_open) {
                let content = choice.delta.content.get_or_insert_with(String::new);
                content.push_str(THINK_CLOSE);
            }
        }
    }
}

/// Adopt a vendor-supplied value or fill it from the cache
fn share(field: &mut String, cached: &mut String) {
    if field.is_empty() {
        field.clone_from(cached);
    } else {
        cached.clone_from(field);
    }
}

/// Per-call decoder state of a vendor stream
pub trait StreamState: Send + 'static {
    /// Text still owed to the client when the vendor stream ends
    fn finish(&mut self) -> Option<&'static str> {
        None
    }
}

impl StreamState for () {}

/// Append `text` to the first choice of `chunk`
fn append_content(chunk: &mut ChatCompletionChunk, text: &str) {
    if chunk.choices.is_empty() {
        chunk.choices.push(ChunkChoice::default());
    }
    if let Some(choice) = chunk.choices.first_mut() {
        choice.delta.content.get_or_insert_with(String::new).push_str(text);
    }
}

struct Normalizer<S, F> {
    events: EventStream,
    state: S,
    decode: F,
    defaults: CallDefaults,
    held: Option<ChatCompletionChunk>,
    pending_error: Option<LlmError>,
    done: bool,
}

/// Map decoded vendor events to normalized chunks
///
/// `decode` turns one event into at most one chunk using per-call `state`.
/// Every chunk is held back until the next one arrives so the last chunk can
/// be patched with `finish_reason: stop` when the vendor never sent one.
/// Whatever [`StreamState::finish`] returns is appended to that last chunk.
/// A decode or read error releases the held chunk, is yielded once and ends
/// the stream.
pub fn normalize_stream<S, F>(events: EventStream, model: &str, state: S, decode: F) -> ChunkStream
where
    S: StreamState,
    F: FnMut(&mut S, JsonEvent) -> Result<Option<ChatCompletionChunk>, LlmError> + Send + 'static,
{
    let normalizer = Normalizer {
        events,
        state,
        decode,
        defaults: CallDefaults::new(model),
        held: None,
        pending_error: None,
        done: false,
    };

    Box::pin(stream::unfold(normalizer, |mut n| async move {
        loop {
            if let Some(error) = n.pending_error.take() {
                n.done = true;
                return Some((Err(error), n));
            }
            if n.done {
                return None;
            }

            let decoded = match n.events.next().await {
                Some(Ok(event)) => (n.decode)(&mut n.state, event),
                Some(Err(error)) => Err(error),
                None => {
                    n.done = true;
                    let mut last = match (n.held.take(), n.state.finish()) {
                        (Some(mut held), tail) => {
                            if let Some(tail) = tail {
                                append_content(&mut held, tail);
                            }
                            held
                        }
                        (None, Some(tail)) => {
                            let mut chunk = ChatCompletionChunk::content(tail.to_owned());
                            n.defaults.fill_chunk(&mut chunk);
                            chunk
                        }
                        (None, None) => return None,
                    };
                    n.defaults.finish_chunk(&mut last);
                    return Some((Ok(last), n));
                }
            };

            match decoded {
                Ok(Some(mut chunk)) => {
                    if !n.defaults.fill_chunk(&mut chunk) {
                        continue;
                    }
                    if let Some(previous) = n.held.replace(chunk) {
                        return Some((Ok(previous), n));
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(error = %error, "upstream stream failed");
                    n.pending_error = Some(error);
                    if let Some(previous) = n.held.take() {
                        return Some((Ok(previous), n));
                    }
                }
            }
        }
    }))
}

/// Decode an event that already is a normalized chunk
///
/// A payload of the wrong shape is logged and skipped.
pub fn chunk_from_event(_: &mut (), event: JsonEvent) -> Result<Option<ChatCompletionChunk>, LlmError> {
    match serde_json::from_value(event.data) {
        Ok(chunk) => Ok(Some(chunk)),
        Err(e) => {
            tracing::warn!(error = %e, "skipping unrecognized stream chunk");
            Ok(None)
        }
    }
}
