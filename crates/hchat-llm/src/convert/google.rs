//! Conversion between normalized types and Google Generative Language wire format

use std::collections::HashMap;

use serde_json::json;

use super::anthropic::parse_arguments;
use super::schema::clean_schema;
use crate::error::LlmError;
use crate::protocol::google::{
    Blob, FileData, FunctionCall as GoogleFunctionCall, FunctionCallingConfig, FunctionCallingMode,
    FunctionDeclaration, FunctionResponse, GenerationConfig, GoogleContent, GooglePart, GoogleRequest,
    GoogleResponse, GoogleSearch, GoogleTool, ThinkingConfig, ToolConfig, UsageMetadata,
};
use crate::types::message::DataUrl;
use crate::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChunkChoice, ChunkDelta,
    ContentPart, FinishReason, MessageContent, NamedToolChoice, ResponseFormat, ResponseMessage, Tool, ToolCall,
    ToolCallDelta, ToolChoice, ToolChoiceMode, Usage, wrap_thinking,
};

const UNKNOWN_FUNCTION: &str = "unknown";

// -- Outbound: normalized request -> Google wire request --

impl TryFrom<&ChatCompletionRequest> for GoogleRequest {
    type Error = LlmError;

    fn try_from(req: &ChatCompletionRequest) -> Result<Self, Self::Error> {
        // call id -> function name of the latest assistant turn seen so far
        let mut call_names: HashMap<&str, &str> = HashMap::new();
        let mut contents = Vec::with_capacity(req.messages.len());

        for msg in &req.messages {
            let content = match msg {
                ChatMessage::System(m) | ChatMessage::Developer(m) => user_content(content_parts(&m.content)),
                ChatMessage::User(m) => user_content(content_parts(&m.content)),
                ChatMessage::Assistant(m) => {
                    let mut parts = m.content.as_ref().map(content_parts).unwrap_or_default();
                    if let Some(refusal) = &m.refusal {
                        parts.insert(0, GooglePart::Text(format!("[Refusal]: {refusal}")));
                    }
                    for call in m.tool_calls.iter().flatten() {
                        call_names.insert(call.id(), call.name());
                        parts.push(GooglePart::FunctionCall(GoogleFunctionCall {
                            id: None,
                            name: call.name().to_owned(),
                            args: parse_arguments(call.arguments()),
                        }));
                    }
                    GoogleContent {
                        role: Some("model".to_owned()),
                        parts: non_empty(parts),
                    }
                }
                ChatMessage::Tool(m) => {
                    let name = m
                        .name
                        .as_deref()
                        .or_else(|| call_names.get(m.tool_call_id.as_str()).copied())
                        .unwrap_or(UNKNOWN_FUNCTION);
                    user_content(vec![GooglePart::FunctionResponse(FunctionResponse {
                        name: name.to_owned(),
                        response: json!({ "content": m.content }),
                    })])
                }
            };
            contents.push(content);
        }

        let (response_mime_type, response_schema) = match &req.response_format {
            Some(ResponseFormat::JsonObject) => (Some("application/json".to_owned()), None),
            Some(ResponseFormat::JsonSchema { json_schema }) => {
                (Some("application/json".to_owned()), json_schema.schema.clone())
            }
            Some(ResponseFormat::Text) | None => (None, None),
        };

        let generation_config = GenerationConfig {
            max_output_tokens: req.output_cap(),
            temperature: req.temperature,
            top_p: req.top_p,
            stop_sequences: req.stop_sequences(),
            response_mime_type,
            response_schema,
            thinking_config: req.thinking_effort().map(|effort| ThinkingConfig {
                include_thoughts: true,
                thinking_budget: effort.budget_tokens(),
            }),
        };

        Ok(Self {
            contents,
            generation_config: Some(generation_config),
            tools: google_tools(req)?,
            tool_config: req.tool_choice.as_ref().map(tool_config),
        })
    }
}

fn user_content(parts: Vec<GooglePart>) -> GoogleContent {
    GoogleContent {
        role: Some("user".to_owned()),
        parts: non_empty(parts),
    }
}

fn non_empty(mut parts: Vec<GooglePart>) -> Vec<GooglePart> {
    if parts.is_empty() {
        parts.push(GooglePart::Text(String::new()));
    }
    parts
}

fn content_parts(content: &MessageContent) -> Vec<GooglePart> {
    match content {
        MessageContent::Text(text) => vec![GooglePart::Text(text.clone())],
        MessageContent::Parts(parts) => parts.iter().map(google_part).collect(),
    }
}

fn google_part(part: &ContentPart) -> GooglePart {
    match part {
        ContentPart::Text { text } => GooglePart::Text(text.clone()),
        ContentPart::Refusal { refusal } => GooglePart::Text(format!("[Refusal]: {refusal}")),
        ContentPart::ImageUrl { image_url } => match DataUrl::parse(&image_url.url) {
            Some(data_url) => GooglePart::InlineData(Blob {
                mime_type: data_url.media_type.unwrap_or("image/jpeg").to_owned(),
                data: data_url.data.to_owned(),
            }),
            None => GooglePart::FileData(FileData {
                mime_type: "image/jpeg".to_owned(),
                file_uri: image_url.url.clone(),
            }),
        },
        ContentPart::File { file } => match (&file.file_data, &file.file_id) {
            (Some(data), _) => GooglePart::InlineData(Blob {
                mime_type: "application/pdf".to_owned(),
                data: DataUrl::parse(data).map_or(data.as_str(), |d| d.data).to_owned(),
            }),
            (None, Some(file_id)) => GooglePart::FileData(FileData {
                mime_type: "application/pdf".to_owned(),
                file_uri: file_id.clone(),
            }),
            (None, None) => GooglePart::Text(String::new()),
        },
    }
}

fn google_tools(req: &ChatCompletionRequest) -> Result<Option<Vec<GoogleTool>>, LlmError> {
    let mut tools = Vec::new();

    if req.web_search_options.is_some() {
        tools.push(GoogleTool::Search {
            google_search: GoogleSearch {},
        });
    }

    let declarations = req
        .tools
        .iter()
        .flatten()
        .filter_map(|tool| match tool {
            Tool::Function { function } => Some(function),
            Tool::Custom { .. } => None,
        })
        .map(|function| {
            Ok(FunctionDeclaration {
                name: function.name.clone(),
                description: function.description.clone(),
                parameters: function.parameters.as_ref().map(clean_schema).transpose()?,
            })
        })
        .collect::<Result<Vec<_>, LlmError>>()?;

    if !declarations.is_empty() {
        tools.push(GoogleTool::Functions {
            function_declarations: declarations,
        });
    }

    Ok((!tools.is_empty()).then_some(tools))
}

fn tool_config(choice: &ToolChoice) -> ToolConfig {
    let (mode, allowed_function_names) = match choice {
        ToolChoice::Mode(ToolChoiceMode::None) => (FunctionCallingMode::None, None),
        ToolChoice::Mode(ToolChoiceMode::Required | ToolChoiceMode::Any) => (FunctionCallingMode::Any, None),
        ToolChoice::Named(NamedToolChoice::Function { function }) => {
            (FunctionCallingMode::Any, Some(vec![function.name.clone()]))
        }
        ToolChoice::Mode(ToolChoiceMode::Auto) | ToolChoice::Named(_) => (FunctionCallingMode::Auto, None),
    };

    ToolConfig {
        function_calling_config: FunctionCallingConfig {
            mode,
            allowed_function_names,
        },
    }
}

// -- Inbound: Google wire response -> normalized types --

/// Map a Google finish reason
///
/// Unrecognized reasons become `stop`.
pub fn map_finish_reason(reason: &str) -> FinishReason {
    match reason.to_lowercase().as_str() {
        "max_tokens" | "max_completion_tokens" => FinishReason::Length,
        "safety" | "recitation" | "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Fields shared by full responses and stream snapshots
struct Snapshot {
    id: String,
    model: String,
    thoughts: String,
    text: String,
    /// Text and wrapped thoughts in part order
    inline: String,
    tool_calls: Vec<ToolCall>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

fn usage(metadata: &UsageMetadata, candidate_tokens: u32) -> Usage {
    let prompt = metadata.prompt_token_count.unwrap_or(0);
    let thoughts = metadata.thoughts_token_count.unwrap_or(0);
    let completion = metadata.candidates_token_count.unwrap_or(0).max(candidate_tokens) + thoughts;

    let mut usage = Usage::new(prompt, completion)
        .with_cached(metadata.cached_content_token_count)
        .with_reasoning(metadata.thoughts_token_count);
    if let Some(total) = metadata.total_token_count {
        usage.total_tokens = total;
    }
    usage
}

fn snapshot(resp: GoogleResponse) -> Snapshot {
    let candidate_tokens = resp.candidates.iter().filter_map(|c| c.token_count).sum();
    let usage = resp.usage_metadata.as_ref().map(|m| usage(m, candidate_tokens));

    let mut thoughts = String::new();
    let mut text = String::new();
    let mut inline = String::new();
    let mut tool_calls = Vec::new();
    let mut finish_reason = None;

    if let Some(candidate) = resp.candidates.into_iter().next() {
        finish_reason = candidate.finish_reason;
        for part in candidate.content.into_iter().flat_map(|c| c.parts) {
            if let Some(call) = part.function_call {
                let id = call.id.unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple()));
                tool_calls.push(ToolCall::function(id, call.name, call.args.to_string()));
            } else if let Some(fragment) = part.text {
                if part.thought == Some(true) {
                    inline.push_str(&wrap_thinking(&fragment));
                    thoughts.push_str(&fragment);
                } else {
                    inline.push_str(&fragment);
                    text.push_str(&fragment);
                }
            }
        }
    }

    Snapshot {
        id: resp.response_id.unwrap_or_default(),
        model: resp.model_version.unwrap_or_default(),
        thoughts,
        text,
        inline,
        tool_calls,
        finish_reason,
        usage,
    }
}

impl From<GoogleResponse> for ChatCompletionResponse {
    fn from(resp: GoogleResponse) -> Self {
        let snap = snapshot(resp);
        let finish_reason = map_finish_reason(snap.finish_reason.as_deref().unwrap_or("stop"));
        let content = snap.inline;
        let message = ResponseMessage {
            content: (!content.is_empty()).then_some(content),
            tool_calls: (!snap.tool_calls.is_empty()).then_some(snap.tool_calls),
            ..ResponseMessage::default()
        };

        let mut response = Self::single(message, finish_reason, snap.usage);
        response.id = snap.id;
        response.model = snap.model;
        response
    }
}

/// Map one streamed snapshot, or `None` when it carries nothing
///
/// Thought text is reported as `reasoning_content` so the stream
/// normalizer can wrap consecutive thoughts in a single think block.
pub fn map_stream_item(resp: GoogleResponse) -> Option<ChatCompletionChunk> {
    if resp.candidates.is_empty() && resp.usage_metadata.is_none() {
        return None;
    }

    let has_candidate = !resp.candidates.is_empty();
    let snap = snapshot(resp);

    let tool_calls: Vec<ToolCallDelta> = snap
        .tool_calls
        .iter()
        .zip(0..)
        .map(|(call, index)| {
            let mut delta = ToolCallDelta::start(index, call.id(), call.name());
            if let Some(function) = delta.function.as_mut() {
                function.arguments = Some(call.arguments().to_owned());
            }
            delta
        })
        .collect();

    let mut chunk = ChatCompletionChunk::delta(ChunkDelta::default());
    chunk.id = snap.id;
    chunk.model = snap.model;
    chunk.usage = snap.usage;
    chunk.choices = if has_candidate {
        vec![ChunkChoice {
            index: 0,
            delta: ChunkDelta {
                role: Some("assistant".to_owned()),
                content: (!snap.text.is_empty()).then_some(snap.text),
                reasoning_content: (!snap.thoughts.is_empty()).then_some(snap.thoughts),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                ..ChunkDelta::default()
            },
            finish_reason: snap.finish_reason.as_deref().map(map_finish_reason),
        }]
    } else {
        Vec::new()
    };

    Some(chunk)
}
