//! Helpers for reading SSE bodies returned by the proxy

use serde_json::Value;

/// `data:` payloads in order
pub fn data_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(str::to_owned)
        .collect()
}

/// `data:` payloads parsed as JSON, stopping at `[DONE]`
pub fn json_chunks(text: &str) -> Vec<Value> {
    data_lines(text)
        .into_iter()
        .take_while(|data| data != "[DONE]")
        .map(|data| serde_json::from_str(&data).expect("chunk is JSON"))
        .collect()
}

/// `event:` names in order
pub fn event_names(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.strip_prefix("event: "))
        .map(str::to_owned)
        .collect()
}

/// Concatenated `choices[0].delta.content` of normalized chunks
pub fn content(chunks: &[Value]) -> String {
    chunks
        .iter()
        .filter_map(|chunk| chunk.pointer("/choices/0/delta/content").and_then(Value::as_str))
        .collect()
}

/// Every non-null `finish_reason`
pub fn finish_reasons(chunks: &[Value]) -> Vec<String> {
    chunks
        .iter()
        .filter_map(|chunk| chunk.pointer("/choices/0/finish_reason").and_then(Value::as_str))
        .map(str::to_owned)
        .collect()
}
