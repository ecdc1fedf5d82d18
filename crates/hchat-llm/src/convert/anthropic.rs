//! Conversion between normalized types and Anthropic wire format

use serde_json::json;

use crate::error::LlmError;
use crate::protocol::anthropic::{
    AnthropicContent, AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicRole, AnthropicStreamEvent,
    AnthropicTool, AnthropicUsage, ContentBlock, CustomTool, DocumentSource, ImageSource, OutputFormat, OutputSchema,
    ResponseBlock, SearchLocation, StreamContentBlock, StreamDelta, ThinkingConfig, ThinkingType, WEB_SEARCH_TOOL_TYPE,
    WebSearchTool,
};
use crate::transport::StreamState;
use crate::types::message::DataUrl;
use crate::types::{
    AssistantMessage, ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChunkChoice,
    ChunkDelta, ContentPart, FinishReason, MessageContent, ResponseFormat, ResponseMessage, THINK_CLOSE, THINK_OPEN,
    Tool, ToolCall, ToolCallDelta, Usage, WebSearchOptions, wrap_thinking,
};

/// Default max tokens when not specified (Anthropic requires this field)
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Headroom added above the thinking budget for the visible answer
const THINKING_HEADROOM: u32 = 4096;

const EMPTY_TOOL_RESULT: &str = "Result processed.";
const EMPTY_ASSISTANT: &str = "Processing...";
const EMPTY_USER: &str = " ";
const JSON_HINT: &str = "\n\nIMPORTANT: Respond strictly in valid JSON format.";
const REDACTED_THINKING: &str = "[Redacted Thinking]";

/// Rough token estimate used where Anthropic reports no reasoning count
pub fn approximate_tokens(text: &str) -> u32 {
    u32::try_from(text.chars().count().div_ceil(4)).unwrap_or(u32::MAX)
}

// -- Outbound: normalized request -> Anthropic wire request --

impl From<&ChatCompletionRequest> for AnthropicRequest {
    fn from(req: &ChatCompletionRequest) -> Self {
        let mut system_parts = Vec::new();
        let mut messages = Vec::with_capacity(req.messages.len());

        for msg in &req.messages {
            match msg {
                ChatMessage::System(m) | ChatMessage::Developer(m) => system_parts.push(m.content.text()),
                ChatMessage::User(m) => messages.push(user_message(&m.content)),
                ChatMessage::Assistant(m) => messages.push(assistant_message(m)),
                ChatMessage::Tool(m) => {
                    let mut content = match &m.content {
                        MessageContent::Text(text) => text.clone(),
                        MessageContent::Parts(parts) => serde_json::to_string(parts).unwrap_or_default(),
                    };
                    if content.trim().is_empty() {
                        content = EMPTY_TOOL_RESULT.to_owned();
                    }
                    messages.push(AnthropicMessage {
                        role: AnthropicRole::User,
                        content: AnthropicContent::Blocks(vec![ContentBlock::ToolResult {
                            tool_use_id: m.tool_call_id.clone(),
                            content,
                        }]),
                    });
                }
            }
        }

        // top_p and temperature are mutually exclusive on this vendor
        let (mut temperature, mut top_p) = match req.top_p {
            Some(top_p) => (None, Some(top_p)),
            None => (req.temperature.map(|t| t / 2.0), None),
        };

        let mut max_tokens = req.output_cap().unwrap_or(DEFAULT_MAX_TOKENS);
        let thinking = req.thinking_effort().map(|effort| {
            let budget_tokens = effort.budget_tokens();
            if max_tokens <= budget_tokens {
                max_tokens = budget_tokens + THINKING_HEADROOM;
            }
            temperature = Some(1.0);
            top_p = None;
            ThinkingConfig {
                kind: ThinkingType::Enabled,
                budget_tokens,
            }
        });

        let mut tools = Vec::new();
        if let Some(options) = &req.web_search_options {
            tools.push(AnthropicTool::WebSearch(web_search_tool(options)));
        }
        tools.extend(req.tools.iter().flatten().map(anthropic_tool));

        let output_format = match &req.response_format {
            Some(ResponseFormat::JsonSchema { json_schema }) => Some(OutputFormat::JsonSchema {
                json_schema: OutputSchema {
                    name: json_schema.name.clone(),
                    description: json_schema.description.clone(),
                    schema: json_schema.schema.clone().unwrap_or_else(|| json!({})),
                    strict: json_schema.strict,
                },
            }),
            Some(ResponseFormat::JsonObject) => {
                append_json_hint(&mut messages);
                None
            }
            Some(ResponseFormat::Text) | None => None,
        };

        Self {
            model: req.model.clone(),
            max_tokens,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n")),
            messages,
            temperature,
            top_p,
            stop_sequences: req.stop_sequences(),
            stream: req.stream,
            tools: (!tools.is_empty()).then_some(tools),
            thinking,
            output_format,
        }
    }
}

fn user_message(content: &MessageContent) -> AnthropicMessage {
    let content = match content {
        MessageContent::Text(text) => AnthropicContent::Text(text.clone()),
        MessageContent::Parts(parts) => AnthropicContent::Blocks(parts.iter().filter_map(content_block).collect()),
    };

    AnthropicMessage {
        role: AnthropicRole::User,
        content: non_empty(content, EMPTY_USER),
    }
}

fn assistant_message(msg: &AssistantMessage) -> AnthropicMessage {
    let mut content = match &msg.content {
        Some(MessageContent::Parts(parts)) => AnthropicContent::Blocks(parts.iter().filter_map(content_block).collect()),
        Some(MessageContent::Text(text)) => AnthropicContent::Text(refusal_prefixed(msg.refusal.as_deref(), text)),
        None => AnthropicContent::Text(refusal_prefixed(msg.refusal.as_deref(), "")),
    };

    if let Some(tool_calls) = msg.tool_calls.as_ref().filter(|calls| !calls.is_empty()) {
        let mut blocks = match content {
            AnthropicContent::Blocks(blocks) => blocks,
            AnthropicContent::Text(text) if text.trim().is_empty() => Vec::new(),
            AnthropicContent::Text(text) => vec![ContentBlock::Text { text }],
        };
        blocks.extend(tool_calls.iter().map(tool_use_block));
        content = AnthropicContent::Blocks(blocks);
    }

    AnthropicMessage {
        role: AnthropicRole::Assistant,
        content: non_empty(content, EMPTY_ASSISTANT),
    }
}

fn refusal_prefixed(refusal: Option<&str>, text: &str) -> String {
    match refusal {
        Some(refusal) if text.is_empty() => format!("[Refusal]: {refusal}"),
        Some(refusal) => format!("[Refusal]: {refusal}\n\n{text}"),
        None => text.to_owned(),
    }
}

/// Substitute a placeholder for content the vendor would reject as empty
fn non_empty(content: AnthropicContent, placeholder: &str) -> AnthropicContent {
    match content {
        AnthropicContent::Text(text) if text.trim().is_empty() => AnthropicContent::Text(placeholder.to_owned()),
        AnthropicContent::Blocks(blocks) if blocks.is_empty() => AnthropicContent::Blocks(vec![ContentBlock::Text {
            text: placeholder.to_owned(),
        }]),
        content => content,
    }
}

fn content_block(part: &ContentPart) -> Option<ContentBlock> {
    match part {
        ContentPart::Text { text } => (!text.trim().is_empty()).then(|| ContentBlock::Text { text: text.clone() }),
        ContentPart::Refusal { refusal } => Some(ContentBlock::Text {
            text: format!("[Refusal]: {refusal}"),
        }),
        ContentPart::ImageUrl { image_url } => Some(match DataUrl::parse(&image_url.url) {
            Some(data_url) => ContentBlock::Image {
                source: ImageSource::Base64 {
                    media_type: data_url.media_type.unwrap_or("image/jpeg").to_owned(),
                    data: data_url.data.to_owned(),
                },
            },
            None => ContentBlock::Text {
                text: format!("[Image URL: {}]", image_url.url),
            },
        }),
        ContentPart::File { file } => {
            let source = if let Some(data) = &file.file_data {
                DocumentSource::Base64 {
                    media_type: "application/pdf".to_owned(),
                    data: DataUrl::parse(data).map_or(data.as_str(), |d| d.data).to_owned(),
                }
            } else {
                DocumentSource::File {
                    file_id: file.file_id.clone()?,
                }
            };
            Some(ContentBlock::Document { source })
        }
    }
}

fn tool_use_block(call: &ToolCall) -> ContentBlock {
    ContentBlock::ToolUse {
        id: call.id().to_owned(),
        name: call.name().to_owned(),
        input: parse_arguments(call.arguments()),
    }
}

/// Parse stringified tool arguments, falling back to an empty object
pub(crate) fn parse_arguments(arguments: &str) -> serde_json::Value {
    serde_json::from_str(arguments).unwrap_or_else(|e| {
        if !arguments.trim().is_empty() {
            tracing::warn!(error = %e, "tool call arguments are not valid JSON");
        }
        json!({})
    })
}

fn anthropic_tool(tool: &Tool) -> AnthropicTool {
    AnthropicTool::Custom(match tool {
        Tool::Function { function } => CustomTool {
            tool_type: None,
            name: function.name.clone(),
            description: function.description.clone(),
            input_schema: function.parameters.clone().unwrap_or_else(|| json!({"type": "object"})),
        },
        Tool::Custom { custom } => CustomTool {
            tool_type: Some("custom".to_owned()),
            name: custom.name.clone(),
            description: custom.description.clone(),
            input_schema: json!({"type": "object"}),
        },
    })
}

fn web_search_tool(options: &WebSearchOptions) -> WebSearchTool {
    let user_location = options
        .user_location
        .as_ref()
        .and_then(|location| location.approximate.as_ref())
        .map(|approximate| SearchLocation {
            location_type: "approximate".to_owned(),
            city: approximate.city.clone(),
            country: approximate.country.clone(),
            region: approximate.region.clone(),
            timezone: approximate.timezone.clone(),
        });

    WebSearchTool {
        tool_type: WEB_SEARCH_TOOL_TYPE.to_owned(),
        name: "web_search".to_owned(),
        max_uses: 5,
        user_location,
    }
}

fn append_json_hint(messages: &mut [AnthropicMessage]) {
    let Some(last) = messages.last_mut() else {
        return;
    };

    match &mut last.content {
        AnthropicContent::Text(text) => text.push_str(JSON_HINT),
        AnthropicContent::Blocks(blocks) => blocks.push(ContentBlock::Text {
            text: JSON_HINT.to_owned(),
        }),
    }
}

// -- Inbound: Anthropic wire response -> normalized types --

/// Map an Anthropic stop reason
///
/// Unrecognized reasons pass through lower-cased.
pub fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    let Some(reason) = reason.filter(|r| !r.is_empty()) else {
        return FinishReason::Stop;
    };

    match reason.to_lowercase().as_str() {
        "max_tokens" | "max_completion_tokens" => FinishReason::Length,
        "end_turn" | "stop_sequence" | "stop" => FinishReason::Stop,
        "tool_use" => FinishReason::ToolCalls,
        "content_filter" | "recitation" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_owned()),
    }
}

fn usage(usage: &AnthropicUsage) -> Usage {
    Usage::new(usage.input_tokens, usage.output_tokens).with_cached(Some(usage.cache_read_input_tokens.unwrap_or(0)))
}

impl From<AnthropicResponse> for ChatCompletionResponse {
    fn from(resp: AnthropicResponse) -> Self {
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut reasoning_tokens = 0;

        for block in resp.content {
            match block {
                ResponseBlock::Text { text } => content.push_str(&text),
                ResponseBlock::Thinking { thinking, .. } => {
                    reasoning_tokens += approximate_tokens(&thinking);
                    content.push_str(&wrap_thinking(&thinking));
                }
                ResponseBlock::RedactedThinking { .. } => content.push_str(&wrap_thinking(REDACTED_THINKING)),
                ResponseBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::function(id, name, input.to_string()));
                }
                ResponseBlock::Other => {}
            }
        }

        let usage = usage(&resp.usage.unwrap_or_default()).with_reasoning(Some(reasoning_tokens));
        let message = ResponseMessage {
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            ..ResponseMessage::default()
        };

        let mut response = Self::single(message, map_stop_reason(resp.stop_reason.as_deref()), Some(usage));
        response.id = resp.id;
        response.model = resp.model;
        response
    }
}

// -- Streaming --

/// Per-call state for reassembling an Anthropic event stream
///
/// Thinking blocks are rendered inline as `<think>` text. The wrapper is
/// opened when a thinking block starts and closed when the next block starts
/// or the message ends, whichever comes first.
#[derive(Debug, Default)]
pub struct AnthropicStreamState {
    think_open: bool,
}

impl AnthropicStreamState {
    /// Create a new stream state tracker
    pub fn new() -> Self {
        Self::default()
    }

    fn close_thinking(&mut self) -> Option<&'static str> {
        std::mem::take(&mut self.think_open).then_some(THINK_CLOSE)
    }

    /// Convert one vendor event into at most one normalized chunk
    ///
    /// A vendor `error` event aborts the stream.
    pub fn map_event(&mut self, event: AnthropicStreamEvent) -> Result<Option<ChatCompletionChunk>, LlmError> {
        let chunk = match event {
            AnthropicStreamEvent::MessageStart { message } => {
                let mut chunk = ChatCompletionChunk::delta(ChunkDelta::role());
                chunk.id = message.id;
                chunk.model = message.model;
                chunk.usage = message.usage.as_ref().map(usage);
                Some(chunk)
            }

            AnthropicStreamEvent::ContentBlockStart { index, content_block } => {
                let close = if index >= 1 { self.close_thinking() } else { None };
                match content_block {
                    StreamContentBlock::ToolUse { id, name } => Some(ChatCompletionChunk::delta(ChunkDelta {
                        content: close.map(str::to_owned),
                        tool_calls: Some(vec![ToolCallDelta::start(index, id, name)]),
                        ..ChunkDelta::default()
                    })),
                    StreamContentBlock::Thinking { thinking } => {
                        self.think_open = true;
                        Some(ChatCompletionChunk::content(format!(
                            "{}{THINK_OPEN}{thinking}",
                            close.unwrap_or_default()
                        )))
                    }
                    StreamContentBlock::Text { text } => {
                        let content = format!("{}{text}", close.unwrap_or_default());
                        (!content.is_empty()).then(|| ChatCompletionChunk::content(content))
                    }
                    StreamContentBlock::Other => close.map(ChatCompletionChunk::content),
                }
            }

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                StreamDelta::TextDelta { text } => (!text.is_empty()).then(|| ChatCompletionChunk::content(text)),
                StreamDelta::ThinkingDelta { thinking } => {
                    let reasoning = Usage::new(0, 0).with_reasoning(Some(approximate_tokens(&thinking)));
                    Some(ChatCompletionChunk::content(thinking).with_usage(reasoning))
                }
                StreamDelta::InputJsonDelta { partial_json } => Some(ChatCompletionChunk::delta(ChunkDelta {
                    tool_calls: Some(vec![ToolCallDelta::arguments(index, partial_json)]),
                    ..ChunkDelta::default()
                })),
                StreamDelta::SignatureDelta { .. } | StreamDelta::Other => None,
            },

            AnthropicStreamEvent::ContentBlockStop { .. } | AnthropicStreamEvent::Ping | AnthropicStreamEvent::Unknown => {
                None
            }

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                if delta.stop_reason.is_none() && usage.is_none() {
                    return Ok(None);
                }

                let mut chunk = ChatCompletionChunk::delta(ChunkDelta::default());
                chunk.choices = delta
                    .stop_reason
                    .as_deref()
                    .map(|reason| ChunkChoice {
                        index: 0,
                        delta: ChunkDelta {
                            content: self.close_thinking().map(str::to_owned),
                            ..ChunkDelta::default()
                        },
                        finish_reason: Some(map_stop_reason(Some(reason))),
                    })
                    .into_iter()
                    .collect();
                chunk.usage = usage.map(|u| Usage::new(0, u.output_tokens));
                Some(chunk)
            }

            AnthropicStreamEvent::MessageStop => Some(ChatCompletionChunk::delta(ChunkDelta::default())),

            AnthropicStreamEvent::Error { error } => {
                return Err(LlmError::Streaming(format!("{}: {}", error.error_type, error.message)));
            }
        };

        Ok(chunk)
    }
}

impl StreamState for AnthropicStreamState {
    fn finish(&mut self) -> Option<&'static str> {
        self.close_thinking()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(value: serde_json::Value) -> ChatCompletionRequest {
        serde_json::from_value(value).unwrap()
    }

    fn native(value: serde_json::Value) -> serde_json::Value {
        serde_json::to_value(AnthropicRequest::from(&request(value))).unwrap()
    }

    fn events(values: Vec<serde_json::Value>) -> Vec<AnthropicStreamEvent> {
        values.into_iter().map(|v| serde_json::from_value(v).unwrap()).collect()
    }

    fn run(events: Vec<AnthropicStreamEvent>) -> Vec<ChatCompletionChunk> {
        let mut state = AnthropicStreamState::new();
        events.into_iter().filter_map(|e| state.map_event(e).unwrap()).collect()
    }

    fn joined_content(chunks: &[ChatCompletionChunk]) -> String {
        chunks.iter().filter_map(ChatCompletionChunk::content_fragment).collect()
    }

    #[test]
    fn reasoning_effort_high_enables_thinking() {
        let body = native(json!({
            "model": "claude-sonnet-4-5",
            "reasoning_effort": "high",
            "messages": [{"role": "user", "content": "hi"}]
        }));

        assert_eq!(body["thinking"], json!({"type": "enabled", "budget_tokens": 8192}));
        assert_eq!(body["temperature"], json!(1.0));
        assert_eq!(body["max_tokens"], json!(8192 + 4096));
    }

    #[test]
    fn large_max_tokens_is_kept_with_thinking() {
        let body = native(json!({
            "model": "claude-sonnet-4-5",
            "reasoning": true,
            "max_completion_tokens": 20000,
            "messages": [{"role": "user", "content": "hi"}]
        }));

        assert_eq!(body["thinking"]["budget_tokens"], 4096);
        assert_eq!(body["max_tokens"], 20000);
    }

    #[test]
    fn temperature_is_halved_unless_top_p() {
        let halved = native(json!({"model": "c", "temperature": 1.4, "messages": [{"role": "user", "content": "x"}]}));
        assert_eq!(halved["temperature"], json!(0.7));
        assert!(halved.get("top_p").is_none());

        let nucleus = native(json!({
            "model": "c", "temperature": 1.4, "top_p": 0.9,
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert!(nucleus.get("temperature").is_none());
        assert_eq!(nucleus["top_p"], json!(0.9));
    }

    #[test]
    fn messages_map_to_native_shape() {
        let body = native(json!({
            "model": "claude-haiku-4-5",
            "stop": "END",
            "messages": [
                {"role": "system", "content": "one"},
                {"role": "developer", "content": "two"},
                {"role": "user", "content": [
                    {"type": "text", "text": "look"},
                    {"type": "text", "text": "   "},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}},
                    {"type": "image_url", "image_url": {"url": "https://example.com/cat.png"}},
                    {"type": "file", "file": {"file_data": "JVBERi0="}},
                    {"type": "file", "file": {"file_id": "file-1"}},
                    {"type": "refusal", "refusal": "no"}
                ]},
                {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "lookup", "arguments": "{\"q\":\"x\"}"}}
                ]},
                {"role": "tool", "tool_call_id": "call_1", "content": ""}
            ]
        }));

        insta::assert_json_snapshot!(body, @r###"
        {
          "max_tokens": 4096,
          "messages": [
            {
              "content": [
                {
                  "text": "look",
                  "type": "text"
                },
                {
                  "source": {
                    "data": "AAAA",
                    "media_type": "image/png",
                    "type": "base64"
                  },
                  "type": "image"
                },
                {
                  "text": "[Image URL: https://example.com/cat.png]",
                  "type": "text"
                },
                {
                  "source": {
                    "data": "JVBERi0=",
                    "media_type": "application/pdf",
                    "type": "base64"
                  },
                  "type": "document"
                },
                {
                  "source": {
                    "file_id": "file-1",
                    "type": "file"
                  },
                  "type": "document"
                },
                {
                  "text": "[Refusal]: no",
                  "type": "text"
                }
              ],
              "role": "user"
            },
            {
              "content": [
                {
                  "id": "call_1",
                  "input": {
                    "q": "x"
                  },
                  "name": "lookup",
                  "type": "tool_use"
                }
              ],
              "role": "assistant"
            },
            {
              "content": [
                {
                  "content": "Result processed.",
                  "tool_use_id": "call_1",
                  "type": "tool_result"
                }
              ],
              "role": "user"
            }
          ],
          "model": "claude-haiku-4-5",
          "stop_sequences": [
            "END"
          ],
          "system": "one\ntwo"
        }
        "###);
    }

    #[test]
    fn empty_messages_get_placeholders() {
        let body = native(json!({
            "model": "c",
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": " "}]},
                {"role": "assistant", "content": ""}
            ]
        }));

        assert_eq!(body["messages"][0]["content"], json!([{"type": "text", "text": " "}]));
        assert_eq!(body["messages"][1]["content"], json!("Processing..."));
    }

    #[test]
    fn assistant_refusal_is_prefixed() {
        let body = native(json!({
            "model": "c",
            "messages": [{"role": "assistant", "content": "fine", "refusal": "cannot"}]
        }));
        assert_eq!(body["messages"][0]["content"], json!("[Refusal]: cannot\n\nfine"));
    }

    #[test]
    fn json_object_appends_hint_to_last_message() {
        let text = native(json!({
            "model": "c",
            "response_format": {"type": "json_object"},
            "messages": [{"role": "user", "content": "list"}]
        }));
        assert_eq!(
            text["messages"][0]["content"],
            json!("list\n\nIMPORTANT: Respond strictly in valid JSON format.")
        );

        let parts = native(json!({
            "model": "c",
            "response_format": {"type": "json_object"},
            "messages": [{"role": "user", "content": [{"type": "text", "text": "list"}]}]
        }));
        assert_eq!(parts["messages"][0]["content"][1]["text"], json!(JSON_HINT));
    }

    #[test]
    fn json_schema_maps_to_output_format() {
        let body = native(json!({
            "model": "c",
            "response_format": {"type": "json_schema", "json_schema": {"name": "answer"}},
            "messages": [{"role": "user", "content": "x"}]
        }));
        assert_eq!(
            body["output_format"],
            json!({"type": "json_schema", "json_schema": {"name": "answer", "schema": {}}})
        );
    }

    #[test]
    fn web_search_and_tools_are_listed_in_order() {
        let body = native(json!({
            "model": "c",
            "web_search_options": {"user_location": {"type": "approximate", "approximate": {"city": "Seoul"}}},
            "tools": [
                {"type": "function", "function": {"name": "lookup", "parameters": {"type": "object"}}},
                {"type": "custom", "custom": {"name": "raw"}}
            ],
            "tool_choice": "required",
            "messages": [{"role": "user", "content": "x"}]
        }));

        assert_eq!(
            body["tools"],
            json!([
                {
                    "type": "web_search_20250305",
                    "name": "web_search",
                    "max_uses": 5,
                    "user_location": {
                        "type": "approximate",
                        "city": "Seoul",
                        "country": null,
                        "region": null,
                        "timezone": null
                    }
                },
                {"name": "lookup", "input_schema": {"type": "object"}},
                {"type": "custom", "name": "raw", "input_schema": {"type": "object"}}
            ])
        );
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn tool_calls_round_trip_through_native_form() {
        let req = request(json!({
            "model": "c",
            "messages": [{"role": "assistant", "content": "checking", "tool_calls": [
                {"id": "toolu_9", "type": "function", "function": {"name": "weather", "arguments": "{\"city\":\"Busan\",\"days\":3}"}}
            ]}]
        }));
        let native = AnthropicRequest::from(&req);
        let AnthropicContent::Blocks(blocks) = &native.messages[0].content else {
            panic!("expected blocks");
        };

        let response_blocks = blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => ResponseBlock::Text { text: text.clone() },
                ContentBlock::ToolUse { id, name, input } => ResponseBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                other => panic!("unexpected block {other:?}"),
            })
            .collect();
        let response = ChatCompletionResponse::from(AnthropicResponse {
            id: "msg_1".to_owned(),
            model: "c".to_owned(),
            content: response_blocks,
            stop_reason: Some("tool_use".to_owned()),
            usage: None,
        });

        let call = &response.choices[0].message.tool_calls.as_ref().unwrap()[0];
        assert_eq!(call.name(), "weather");
        let arguments: serde_json::Value = serde_json::from_str(call.arguments()).unwrap();
        assert_eq!(arguments, json!({"city": "Busan", "days": 3}));
        assert_eq!(response.choices[0].finish_reason, Some(FinishReason::ToolCalls));
    }

    #[test]
    fn response_wraps_thinking_and_estimates_reasoning() {
        let response: AnthropicResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "model": "claude-sonnet-4-5",
            "content": [
                {"type": "thinking", "thinking": "abcdefgh", "signature": "sig"},
                {"type": "redacted_thinking", "data": "xyz"},
                {"type": "text", "text": "answer"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 20, "cache_read_input_tokens": 4}
        }))
        .unwrap();

        let normalized = ChatCompletionResponse::from(response);
        assert_eq!(
            normalized.content(),
            Some("<think>\nabcdefgh\n</think>\n<think>\n[Redacted Thinking]\n</think>\nanswer")
        );
        let usage = normalized.usage.unwrap();
        assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (10, 20, 30));
        assert_eq!(usage.cached_tokens(), 4);
        assert_eq!(usage.reasoning_tokens(), 2);
    }

    #[test]
    fn stop_reasons_map_with_passthrough() {
        assert_eq!(map_stop_reason(Some("max_tokens")), FinishReason::Length);
        assert_eq!(map_stop_reason(Some("end_turn")), FinishReason::Stop);
        assert_eq!(map_stop_reason(Some("stop_sequence")), FinishReason::Stop);
        assert_eq!(map_stop_reason(Some("tool_use")), FinishReason::ToolCalls);
        assert_eq!(map_stop_reason(Some("recitation")), FinishReason::ContentFilter);
        assert_eq!(map_stop_reason(None), FinishReason::Stop);
        assert_eq!(map_stop_reason(Some("Pause_Turn")), FinishReason::Other("pause_turn".to_owned()));
    }

    #[test]
    fn streamed_text_matches_non_streamed_content() {
        let chunks = run(events(vec![
            json!({"type": "message_start", "message": {"id": "msg_1", "model": "c", "usage": {"input_tokens": 3, "output_tokens": 1}}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hel"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "lo"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "!"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 5}}),
            json!({"type": "message_stop"}),
        ]));

        let single = ChatCompletionResponse::from(AnthropicResponse {
            id: "msg_1".to_owned(),
            model: "c".to_owned(),
            content: vec![ResponseBlock::Text {
                text: "Hello!".to_owned(),
            }],
            stop_reason: Some("end_turn".to_owned()),
            usage: None,
        });

        assert_eq!(joined_content(&chunks), single.content().unwrap());
        assert_eq!(chunks[0].choices[0].delta.role.as_deref(), Some("assistant"));
        assert_eq!(chunks[0].id, "msg_1");
        let finishing = chunks.iter().find_map(ChatCompletionChunk::finish_reason);
        assert_eq!(finishing, Some(&FinishReason::Stop));
    }

    #[test]
    fn thinking_wrapper_opens_and_closes_once() {
        let chunks = run(events(vec![
            json!({"type": "message_start", "message": {"id": "msg_1", "model": "c"}}),
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "thinking", "thinking": ""}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "let me "}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "think"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "signature_delta", "signature": "s"}}),
            json!({"type": "content_block_stop", "index": 0}),
            json!({"type": "content_block_start", "index": 1, "content_block": {"type": "text", "text": ""}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "text_delta", "text": "answer"}}),
            json!({"type": "content_block_stop", "index": 1}),
            json!({"type": "message_delta", "delta": {"stop_reason": "max_tokens"}}),
            json!({"type": "message_stop"}),
        ]));

        let content = joined_content(&chunks);
        assert_eq!(content, "<think>\nlet me think\n</think>\nanswer");
        assert_eq!(content.matches("<think>").count(), 1);
        assert_eq!(content.matches("</think>").count(), 1);

        let reasoning: u32 = chunks.iter().filter_map(|c| c.usage.as_ref()).map(Usage::reasoning_tokens).sum();
        assert_eq!(reasoning, 2 + 2);
    }

    #[test]
    fn message_ending_inside_thinking_closes_wrapper() {
        let chunks = run(events(vec![
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "thinking"}}),
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "thinking_delta", "thinking": "hmm"}}),
            json!({"type": "message_delta", "delta": {"stop_reason": "max_tokens"}}),
        ]));

        assert_eq!(joined_content(&chunks), "<think>\nhmm\n</think>\n");
        assert_eq!(chunks.last().unwrap().finish_reason(), Some(&FinishReason::Length));
    }

    #[test]
    fn tool_use_stream_indexes_by_block() {
        let chunks = run(events(vec![
            json!({"type": "content_block_start", "index": 1, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "lookup", "input": {}}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "{\"q\":"}}),
            json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": "1}"}}),
        ]));

        let deltas: Vec<&ToolCallDelta> = chunks
            .iter()
            .flat_map(|c| c.choices[0].delta.tool_calls.iter().flatten())
            .collect();
        assert_eq!(deltas[0], &ToolCallDelta::start(1, "toolu_1", "lookup"));
        let arguments: String = deltas
            .iter()
            .copied()
            .filter_map(|d| d.function.as_ref()?.arguments.as_deref())
            .collect();
        assert_eq!(arguments, "{\"q\":1}");
    }

    #[test]
    fn error_event_aborts() {
        let mut state = AnthropicStreamState::new();
        let event = serde_json::from_value(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "busy"}
        }))
        .unwrap();

        assert!(matches!(state.map_event(event), Err(LlmError::Streaming(msg)) if msg.contains("busy")));
    }

    #[test]
    fn unknown_events_are_ignored() {
        let mut state = AnthropicStreamState::new();
        let event = serde_json::from_value(json!({"type": "future_event", "payload": 1})).unwrap();
        assert!(state.map_event(event).unwrap().is_none());
    }
}
