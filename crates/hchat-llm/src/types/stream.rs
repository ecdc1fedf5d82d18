use serde::{Deserialize, Serialize};

use super::response::{FinishReason, Usage};

/// One streamed `chat.completion.chunk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Identifier shared by every chunk of one response
    #[serde(default)]
    pub id: String,
    /// Always `chat.completion.chunk`
    #[serde(default = "chunk_object")]
    pub object: String,
    /// Unix timestamp shared by every chunk of one response
    #[serde(default)]
    pub created: u64,
    /// Model that produced the chunk
    #[serde(default)]
    pub model: String,
    /// Incremental choices
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage, usually on the last chunk only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Backend fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

fn chunk_object() -> String {
    "chat.completion.chunk".to_owned()
}

impl ChatCompletionChunk {
    /// Single-choice chunk with identity fields left for the transport
    pub fn delta(delta: ChunkDelta) -> Self {
        Self {
            id: String::new(),
            object: chunk_object(),
            created: 0,
            model: String::new(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason: None,
            }],
            usage: None,
            system_fingerprint: None,
        }
    }

    /// Text-only chunk
    pub fn content(text: impl Into<String>) -> Self {
        Self::delta(ChunkDelta {
            content: Some(text.into()),
            ..ChunkDelta::default()
        })
    }

    /// Attach usage
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Finish reason of the first choice
    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.choices.first().and_then(|choice| choice.finish_reason.as_ref())
    }

    /// Content fragment of the first choice
    pub fn content_fragment(&self) -> Option<&str> {
        self.choices.first().and_then(|choice| choice.delta.content.as_deref())
    }
}

/// A choice within a streamed chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Index of this choice
    #[serde(default)]
    pub index: u32,
    /// Incremental message data
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Present on the final chunk, `null` before
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Incremental message data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, on the first chunk only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Text fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Separate reasoning fragment reported by some vendors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Refusal fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refusal: Option<String>,
    /// Tool-call fragments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

impl ChunkDelta {
    /// Assistant role marker
    pub fn role() -> Self {
        Self {
            role: Some("assistant".to_owned()),
            ..Self::default()
        }
    }
}

/// Partial tool call within a chunk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Position in the `tool_calls` array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Tool call id, first fragment only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `function` when present
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub call_type: Option<String>,
    /// Function fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionCallDelta>,
}

impl ToolCallDelta {
    /// Opening fragment carrying id and name with empty arguments
    pub fn start(index: u32, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            id: Some(id.into()),
            call_type: Some("function".to_owned()),
            function: Some(FunctionCallDelta {
                name: Some(name.into()),
                arguments: Some(String::new()),
            }),
        }
    }

    /// Argument fragment
    pub fn arguments(index: u32, fragment: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            id: None,
            call_type: None,
            function: Some(FunctionCallDelta {
                name: None,
                arguments: Some(fragment.into()),
            }),
        }
    }
}

/// Partial function call data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallDelta {
    /// Function name, first fragment only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Arguments JSON fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}
