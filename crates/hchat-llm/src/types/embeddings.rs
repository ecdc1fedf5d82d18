use serde::{Deserialize, Serialize};

/// `POST /v1/embeddings` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsRequest {
    /// Embedding model identifier
    pub model: String,
    /// Text or texts to embed
    pub input: EmbeddingInput,
    /// Requested vector size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<u32>,
    /// End-user identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Single text or batch of texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    /// One text
    One(String),
    /// Several texts
    Many(Vec<String>),
}

impl EmbeddingInput {
    /// Borrow the texts as a slice-like list
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::One(text) => vec![text.as_str()],
            Self::Many(texts) => texts.iter().map(String::as_str).collect(),
        }
    }
}
