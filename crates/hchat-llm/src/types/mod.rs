//! Normalized chat-completion types
//!
//! The public surface speaks the `OpenAI` chat-completions dialect, so these
//! types double as the `OpenAI` wire format. Every vendor mapper converts to
//! and from them.

pub mod embeddings;
pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use embeddings::{EmbeddingInput, EmbeddingsRequest};
pub use message::{
    AssistantMessage, ChatMessage, ContentPart, FileRef, ImageUrl, MessageContent, SystemMessage, ToolMessage,
    UserMessage,
};
pub use request::{
    ApproximateLocation, ChatCompletionRequest, JsonSchemaFormat, ReasoningEffort, ResponseFormat, StopSequences,
    UserLocation, WebSearchOptions,
};
pub use response::{
    ChatCompletionResponse, Choice, CompletionTokensDetails, FinishReason, PromptTokensDetails, ResponseMessage,
    Usage,
};
pub use stream::{ChatCompletionChunk, ChunkChoice, ChunkDelta, FunctionCallDelta, ToolCallDelta};
pub use tool::{
    CustomCall, CustomToolDefinition, FunctionCall, FunctionDefinition, NamedTool, NamedToolChoice, Tool, ToolCall,
    ToolChoice, ToolChoiceMode,
};

/// Opening marker of the think-tag wrapper
pub const THINK_OPEN: &str = "<think>\n";

/// Closing marker of the think-tag wrapper
pub const THINK_CLOSE: &str = "\n</think>\n";

/// Wrap a reasoning trace in think tags
pub fn wrap_thinking(text: &str) -> String {
    format!("{THINK_OPEN}{text}{THINK_CLOSE}")
}

/// Current UNIX time in seconds
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
