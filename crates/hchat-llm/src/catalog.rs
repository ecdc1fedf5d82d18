//! Static capability catalog of the models the gateway serves
//!
//! Records start from [`ModelCapabilitiesBuilder::new`]'s defaults and are
//! built at compile time. The catalog decides which vendor serves a model
//! and feeds the models listing.

use crate::provider::ProviderKind;

/// What one model supports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    /// Model id as callers send it
    pub model: &'static str,
    /// Serving vendor
    pub provider: ProviderKind,
    /// Reasoning support
    pub reasoning: Reasoning,
    /// Tool support
    pub tools: Tools,
    /// Token limits
    pub token_limits: TokenLimits,
    /// Input and output modalities
    pub modality: Modality,
    /// JSON output support
    pub response_formats: ResponseFormats,
    /// Whether `stop` is honored
    pub stop_sequences: bool,
}

/// Reasoning support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reasoning {
    /// Model can reason
    pub supported: bool,
    /// Reasoning text is returned
    pub include_output: bool,
    /// `reasoning_effort` is honored
    pub effort_control: bool,
    /// Thinking budget can be set
    pub budget_control: bool,
}

/// Tool support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tools {
    /// Function tools are accepted
    pub function_calling: bool,
    /// `tool_choice` is honored
    pub tool_choice: bool,
    /// Vendor-side tools (e.g. `web_search`)
    pub built_in: &'static [&'static str],
}

/// Token limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLimits {
    /// Context window
    pub context_window: u32,
    /// Output cap
    pub max_output_tokens: u32,
}

/// Input and output modalities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modality {
    /// Accepted input
    pub input: InputModality,
    /// Produced output
    pub output: OutputModality,
}

/// Accepted input kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputModality {
    /// Text
    pub text: bool,
    /// Images
    pub image: ImageInput,
    /// Documents
    pub file: FileInput,
    /// Video
    pub video: bool,
    /// Audio
    pub audio: bool,
}

/// Accepted image sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInput {
    /// Inline data URLs
    pub base64: bool,
    /// Remote URLs
    pub url: bool,
}

/// Accepted document sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInput {
    /// Inline base64
    pub base64: bool,
    /// Uploaded file ids
    pub id: bool,
}

/// Produced output kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputModality {
    /// Text
    pub text: bool,
    /// Images
    pub image: bool,
}

/// JSON output support
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFormats {
    /// `json_object`
    pub json: bool,
    /// `json_schema`
    pub structured: bool,
}

/// Builder over the default capability record
#[derive(Debug, Clone, Copy)]
pub struct ModelCapabilitiesBuilder {
    caps: ModelCapabilities,
}

impl ModelCapabilitiesBuilder {
    /// Defaults: text in and out, images and files accepted in every form,
    /// no reasoning or function calling, 4096-token limits
    pub const fn new(model: &'static str, provider: ProviderKind) -> Self {
        Self {
            caps: ModelCapabilities {
                model,
                provider,
                reasoning: Reasoning {
                    supported: false,
                    include_output: false,
                    effort_control: false,
                    budget_control: false,
                },
                tools: Tools {
                    function_calling: false,
                    tool_choice: true,
                    built_in: &[],
                },
                token_limits: TokenLimits {
                    context_window: 4096,
                    max_output_tokens: 4096,
                },
                modality: Modality {
                    input: InputModality {
                        text: true,
                        image: ImageInput { base64: true, url: true },
                        file: FileInput { base64: true, id: true },
                        video: false,
                        audio: false,
                    },
                    output: OutputModality { text: true, image: false },
                },
                response_formats: ResponseFormats {
                    json: false,
                    structured: false,
                },
                stop_sequences: true,
            },
        }
    }

    /// Set reasoning support
    pub const fn reasoning(mut self, reasoning: Reasoning) -> Self {
        self.caps.reasoning = reasoning;
        self
    }

    /// Set tool support
    pub const fn tools(mut self, function_calling: bool, tool_choice: bool, built_in: &'static [&'static str]) -> Self {
        self.caps.tools = Tools {
            function_calling,
            tool_choice,
            built_in,
        };
        self
    }

    /// Set token limits
    pub const fn token_limits(mut self, context_window: u32, max_output_tokens: u32) -> Self {
        self.caps.token_limits = TokenLimits {
            context_window,
            max_output_tokens,
        };
        self
    }

    /// Set accepted image sources
    pub const fn image_input(mut self, base64: bool, url: bool) -> Self {
        self.caps.modality.input.image = ImageInput { base64, url };
        self
    }

    /// Set accepted document sources
    pub const fn file_input(mut self, base64: bool, id: bool) -> Self {
        self.caps.modality.input.file = FileInput { base64, id };
        self
    }

    /// Mark the model as producing images
    pub const fn image_output(mut self) -> Self {
        self.caps.modality.output.image = true;
        self
    }

    /// Set JSON output support
    pub const fn response_formats(mut self, json: bool, structured: bool) -> Self {
        self.caps.response_formats = ResponseFormats { json, structured };
        self
    }

    /// Set whether `stop` is honored
    pub const fn stop_sequences(mut self, supported: bool) -> Self {
        self.caps.stop_sequences = supported;
        self
    }

    /// Finish the record
    pub const fn build(self) -> ModelCapabilities {
        self.caps
    }
}

const EFFORT_ONLY: Reasoning = Reasoning {
    supported: true,
    include_output: false,
    effort_control: true,
    budget_control: false,
};

const NO_REASONING: Reasoning = Reasoning {
    supported: false,
    include_output: false,
    effort_control: false,
    budget_control: false,
};

const FULL_REASONING: Reasoning = Reasoning {
    supported: true,
    include_output: true,
    effort_control: true,
    budget_control: true,
};

const VISIBLE_REASONING: Reasoning = Reasoning {
    supported: true,
    include_output: true,
    effort_control: true,
    budget_control: false,
};

const fn azure(model: &'static str, reasoning: Reasoning, max_output_tokens: u32) -> ModelCapabilities {
    ModelCapabilitiesBuilder::new(model, ProviderKind::Azure)
        .reasoning(reasoning)
        .tools(true, true, &[])
        .token_limits(128_000, max_output_tokens)
        .image_input(true, true)
        .file_input(false, false)
        .response_formats(true, true)
        .stop_sequences(false)
        .build()
}

const fn claude(model: &'static str) -> ModelCapabilitiesBuilder {
    ModelCapabilitiesBuilder::new(model, ProviderKind::Anthropic)
        .reasoning(FULL_REASONING)
        .tools(true, false, &[])
        .token_limits(200_000, 64_000)
        .image_input(true, false)
        .file_input(true, true)
        .response_formats(true, false)
}

const fn gemini(model: &'static str) -> ModelCapabilitiesBuilder {
    ModelCapabilitiesBuilder::new(model, ProviderKind::Google)
        .reasoning(VISIBLE_REASONING)
        .tools(true, true, &["web_search"])
        .token_limits(1_048_576, 8192)
        .image_input(true, true)
        .response_formats(true, true)
}

static CATALOG: [ModelCapabilities; 8] = [
    azure("gpt-5-mini", EFFORT_ONLY, 16384),
    azure("gpt-4.1", NO_REASONING, 16384),
    azure("gpt-4o", NO_REASONING, 4096),
    claude("claude-sonnet-4-5").build(),
    claude("claude-haiku-4-5").build(),
    gemini("gemini-2.5-pro").build(),
    gemini("gemini-2.5-flash").build(),
    gemini("gemini-2.5-flash-image").image_output().build(),
];

/// Look up a model by exact id
pub fn find(model: &str) -> Option<&'static ModelCapabilities> {
    CATALOG.iter().find(|caps| caps.model == model)
}

/// Every record in catalog order
pub fn iter() -> impl Iterator<Item = &'static ModelCapabilities> {
    CATALOG.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claude_record() {
        insta::assert_debug_snapshot!(find("claude-sonnet-4-5").unwrap(), @r###"
        ModelCapabilities {
            model: "claude-sonnet-4-5",
            provider: Anthropic,
            reasoning: Reasoning {
                supported: true,
                include_output: true,
                effort_control: true,
                budget_control: true,
            },
            tools: Tools {
                function_calling: true,
                tool_choice: false,
                built_in: [],
            },
            token_limits: TokenLimits {
                context_window: 200000,
                max_output_tokens: 64000,
            },
            modality: Modality {
                input: InputModality {
                    text: true,
                    image: ImageInput {
                        base64: true,
                        url: false,
                    },
                    file: FileInput {
                        base64: true,
                        id: true,
                    },
                    video: false,
                    audio: false,
                },
                output: OutputModality {
                    text: true,
                    image: false,
                },
            },
            response_formats: ResponseFormats {
                json: true,
                structured: false,
            },
            stop_sequences: true,
        }
        "###);
    }

    #[test]
    fn catalog_order_and_vendors() {
        let listed: Vec<(&str, ProviderKind)> = iter().map(|caps| (caps.model, caps.provider)).collect();
        assert_eq!(
            listed,
            [
                ("gpt-5-mini", ProviderKind::Azure),
                ("gpt-4.1", ProviderKind::Azure),
                ("gpt-4o", ProviderKind::Azure),
                ("claude-sonnet-4-5", ProviderKind::Anthropic),
                ("claude-haiku-4-5", ProviderKind::Anthropic),
                ("gemini-2.5-pro", ProviderKind::Google),
                ("gemini-2.5-flash", ProviderKind::Google),
                ("gemini-2.5-flash-image", ProviderKind::Google),
            ]
        );
    }

    #[test]
    fn azure_models_reject_stop_sequences() {
        assert!(iter().filter(|c| c.provider == ProviderKind::Azure).all(|c| !c.stop_sequences));
        assert_eq!(find("gpt-4o").unwrap().token_limits.max_output_tokens, 4096);
        assert!(find("gpt-5-mini").unwrap().reasoning.effort_control);
    }

    #[test]
    fn gemini_capabilities() {
        let image = find("gemini-2.5-flash-image").unwrap();
        assert!(image.modality.output.image);
        assert_eq!(image.tools.built_in, ["web_search"]);
        assert!(!find("gemini-2.5-pro").unwrap().modality.output.image);
        assert!(!find("gemini-2.5-pro").unwrap().reasoning.budget_control);
    }

    #[test]
    fn unknown_model_is_absent() {
        assert!(find("gpt-3.5-turbo").is_none());
    }
}
