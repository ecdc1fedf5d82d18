//! Incremental Server-Sent Events reader
//!
//! Bytes are buffered until a blank line closes an event block. Blocks are
//! parsed per the SSE rules: comment lines are dropped, the first `:` splits
//! field from value, one leading space is stripped from the value, and
//! repeated `data:` lines are joined with `\n`.

use std::collections::VecDeque;
use std::fmt::Display;

use futures_util::{Stream, StreamExt, stream};

use crate::error::LlmError;

/// One decoded SSE event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field
    pub event: Option<String>,
    /// Joined `data:` lines
    pub data: String,
    /// `id:` field
    pub id: Option<String>,
    /// `retry:` field, when it is a non-negative integer
    pub retry: Option<u64>,
}

impl SseEvent {
    /// Whether this event is the end-of-stream sentinel
    pub fn is_done(&self) -> bool {
        matches!(self.data.as_str(), "[DONE]" | "DONE")
    }
}

/// Buffering event-block splitter
#[derive(Debug, Default)]
pub struct SseReader {
    buffer: Vec<u8>,
    // bytes before this offset hold no complete delimiter
    scanned: usize,
}

impl SseReader {
    /// Create an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and return every event completed by them
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((end, delimiter)) = find_boundary(&self.buffer, self.scanned) {
            let block: Vec<u8> = self.buffer.drain(..end + delimiter).take(end).collect();
            self.scanned = 0;
            if let Some(event) = parse_block(&String::from_utf8_lossy(&block)) {
                events.push(event);
            }
        }
        // a delimiter can start in the last two bytes and end in the next chunk
        self.scanned = self.buffer.len().saturating_sub(2);
        events
    }

    /// Flush the unterminated tail at end of input
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        parse_block(&String::from_utf8_lossy(&rest))
    }
}

/// Locate the first blank line at or after `from`
///
/// Returns the block length and the delimiter length.
fn find_boundary(buffer: &[u8], from: usize) -> Option<(usize, usize)> {
    buffer.iter().enumerate().skip(from).find_map(|(i, byte)| {
        if *byte != b'\n' {
            return None;
        }
        match &buffer[i + 1..] {
            [b'\n', ..] => Some((i, 2)),
            [b'\r', b'\n', ..] => Some((i, 3)),
            _ => None,
        }
    })
}

fn parse_block(block: &str) -> Option<SseEvent> {
    if block.trim().is_empty() {
        return None;
    }

    let mut event = SseEvent::default();
    let mut data_lines = Vec::new();

    for line in block.split('\n') {
        if line.trim().starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => {
                let value = value.strip_suffix('\r').unwrap_or(value);
                (field.trim(), value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line.trim(), ""),
        };

        match field {
            "event" => event.event = Some(value.to_owned()),
            "data" => data_lines.push(value),
            "id" => event.id = Some(value.to_owned()),
            "retry" => {
                if let Ok(retry) = value.trim().parse::<u64>() {
                    event.retry = Some(retry);
                }
            }
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    event.data = data_lines.join("\n");
    Some(event)
}

struct ReaderState<S> {
    body: S,
    reader: SseReader,
    pending: VecDeque<SseEvent>,
    finished: bool,
}

/// Turn a body byte stream into a stream of events
///
/// A read error is yielded once and ends the stream. The tail of the body is
/// flushed as a final event when the body ends.
pub fn events<S, B, E>(body: S) -> impl Stream<Item = Result<SseEvent, LlmError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    let state = ReaderState {
        body,
        reader: SseReader::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((Ok(event), state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.reader.feed(chunk.as_ref())),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(LlmError::Streaming(e.to_string())), state));
                }
                None => {
                    state.finished = true;
                    state.pending.extend(state.reader.finish());
                }
            }
        }
    })
}

/// Decode each event's data as JSON until the `[DONE]` sentinel
///
/// Undecodable payloads are logged and skipped.
pub fn json_events<S, B, E>(body: S, provider: &'static str) -> impl Stream<Item = Result<JsonEvent, LlmError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Display,
{
    events(body)
        .take_while(|event| std::future::ready(!matches!(event, Ok(e) if e.is_done())))
        .filter_map(move |event| {
            std::future::ready(match event {
                Ok(event) if event.data.trim().is_empty() => None,
                Ok(event) => match serde_json::from_str(&event.data) {
                    Ok(data) => Some(Ok(JsonEvent {
                        event: event.event,
                        data,
                    })),
                    Err(e) => {
                        let payload: String = event.data.chars().take(200).collect();
                        tracing::warn!(provider, error = %e, %payload, "skipping undecodable SSE payload");
                        None
                    }
                },
                Err(e) => Some(Err(e)),
            })
        })
}

/// SSE event whose data parsed as JSON
#[derive(Debug, Clone, PartialEq)]
pub struct JsonEvent {
    /// `event:` field
    pub event: Option<String>,
    /// Parsed data
    pub data: serde_json::Value,
}
