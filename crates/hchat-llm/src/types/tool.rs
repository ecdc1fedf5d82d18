use serde::{Deserialize, Serialize};

/// Tool offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    /// JSON-schema function tool
    Function {
        /// Function specification
        function: FunctionDefinition,
    },
    /// Free-form tool that takes raw text input
    Custom {
        /// Tool specification
        custom: CustomToolDefinition,
    },
}

/// Function tool specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    /// Function name
    pub name: String,
    /// What the function does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    /// Strict schema adherence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// Custom tool specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomToolDefinition {
    /// Tool name
    pub name: String,
    /// What the tool does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Input grammar or text format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
}

/// Tool call emitted by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolCall {
    /// Call of a function tool
    Function {
        /// Call identifier
        id: String,
        /// Name and JSON-encoded arguments
        function: FunctionCall,
    },
    /// Call of a custom tool
    Custom {
        /// Call identifier
        id: String,
        /// Name and raw input
        custom: CustomCall,
    },
}

impl ToolCall {
    /// Build a function tool call
    pub fn function(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::Function {
            id: id.into(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }

    /// Call identifier
    pub fn id(&self) -> &str {
        match self {
            Self::Function { id, .. } | Self::Custom { id, .. } => id,
        }
    }

    /// Name of the tool being called
    pub fn name(&self) -> &str {
        match self {
            Self::Function { function, .. } => &function.name,
            Self::Custom { custom, .. } => &custom.name,
        }
    }

    /// Arguments payload: JSON text for functions, raw input for custom tools
    pub fn arguments(&self) -> &str {
        match self {
            Self::Function { function, .. } => &function.arguments,
            Self::Custom { custom, .. } => &custom.input,
        }
    }
}

/// Function name and arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}

/// Custom tool name and input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCall {
    /// Tool name
    pub name: String,
    /// Raw input text
    pub input: String,
}

/// Tool-choice policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// `"none"`, `"auto"`, `"required"` or `"any"`
    Mode(ToolChoiceMode),
    /// Object form naming a tool or a tool subset
    Named(NamedToolChoice),
}

/// String tool-choice modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoiceMode {
    /// Never call tools
    None,
    /// Model decides
    Auto,
    /// Must call at least one tool
    Required,
    /// Alias of `required` used by some clients
    Any,
}

/// Object tool-choice forms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NamedToolChoice {
    /// Force a specific function
    Function {
        /// The function
        function: NamedTool,
    },
    /// Force a specific custom tool
    Custom {
        /// The tool
        custom: NamedTool,
    },
    /// Restrict to a subset of tools
    AllowedTools {
        /// Mode and subset, passed through untouched
        allowed_tools: serde_json::Value,
    },
}

/// Name reference inside an object tool choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedTool {
    /// Tool name
    pub name: String,
}
