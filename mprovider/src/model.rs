//! Provider-agnostic request, response, and message model types.
//!
//! ```rust
//! use mprovider::{ChatMessage, ChatRequest, ErrorKind, Role};
//!
//! let ok = ChatRequest::new_validated(
//!     "gemini-2.5-flash",
//!     vec![ChatMessage::new(Role::User, "Summarize this diff")],
//! );
//! assert!(ok.is_ok());
//!
//! let err = ChatRequest::new_validated("", vec![ChatMessage::new(Role::User, "hi")])
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, ErrorKind::Validation);
//! ```

use std::fmt::{Display, Formatter};

use mcommon::SamplingParams;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Gemini,
    OpenAiCompat,
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let id = match self {
            Self::Gemini => "gemini",
            Self::OpenAiCompat => "openai-compat",
        };

        f.write_str(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Model metadata, listing only. Carries no conversational state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub display_name: String,
    pub input_token_limit: Option<u32>,
    pub output_token_limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    ContentFilter,
    Cancelled,
    Other,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::MaxTokens => "max_tokens",
            Self::ContentFilter => "content_filter",
            Self::Cancelled => "cancelled",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatResponse {
    pub message: String,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub params: SamplingParams,
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    pub fn builder(model: impl Into<String>) -> ChatRequestBuilder {
        ChatRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            params: SamplingParams::default(),
            system_prompt: None,
        }
    }

    pub fn new_validated(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Result<Self, ProviderError> {
        let request = Self::new(model, messages);
        request.validate()?;
        Ok(request)
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::validation("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ProviderError::validation(
                "at least one message is required",
            ));
        }

        if let Some(max_tokens) = self.params.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::validation(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.params.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::validation(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        if let Some(top_p) = self.params.top_p
            && !(0.0..=1.0).contains(&top_p)
        {
            return Err(ProviderError::validation(
                "top_p must be in the inclusive range 0.0..=1.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequestBuilder {
    model: String,
    messages: Vec<ChatMessage>,
    params: SamplingParams,
    system_prompt: Option<String>,
}

impl ChatRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            params: SamplingParams::default(),
            system_prompt: None,
        }
    }

    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn build(self) -> Result<ChatRequest, ProviderError> {
        let request = ChatRequest {
            model: self.model,
            messages: self.messages,
            params: self.params,
            system_prompt: self.system_prompt,
        };

        request.validate()?;
        Ok(request)
    }
}

/// Character-count heuristic used whenever a remote token count is
/// unavailable: roughly four characters per token, rounded up.
pub fn fallback_token_estimate(text: &str) -> u32 {
    text.chars().count().div_ceil(4) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_id_display_is_stable() {
        assert_eq!(ProviderId::Gemini.to_string(), "gemini");
        assert_eq!(ProviderId::OpenAiCompat.to_string(), "openai-compat");
    }

    #[test]
    fn chat_request_validate_enforces_contract() {
        use crate::ErrorKind;
        use mcommon::SamplingParams;

        let empty_model = ChatRequest::new("   ", vec![ChatMessage::new(Role::User, "hi")]);
        let err = empty_model.validate().expect_err("empty model must fail");
        assert_eq!(err.kind, ErrorKind::Validation);

        let empty_messages = ChatRequest::new("gemini-2.5-flash", Vec::new());
        let err = empty_messages
            .validate()
            .expect_err("empty messages must fail");
        assert_eq!(err.kind, ErrorKind::Validation);

        let bad_temperature = ChatRequest::new(
            "gemini-2.5-flash",
            vec![ChatMessage::new(Role::User, "hi")],
        )
        .with_params(SamplingParams::default().with_temperature(2.5));
        assert!(bad_temperature.validate().is_err());

        let bad_top_p = ChatRequest::new(
            "gemini-2.5-flash",
            vec![ChatMessage::new(Role::User, "hi")],
        )
        .with_params(SamplingParams::default().with_top_p(1.5));
        assert!(bad_top_p.validate().is_err());

        let valid = ChatRequest::builder("gemini-2.5-flash")
            .message(ChatMessage::new(Role::User, "hi"))
            .params(
                SamplingParams::default()
                    .with_temperature(0.4)
                    .with_max_tokens(128),
            )
            .system_prompt("be concise")
            .build()
            .expect("valid request should build");
        assert_eq!(valid.system_prompt.as_deref(), Some("be concise"));
    }

    #[test]
    fn fallback_estimate_rounds_up() {
        assert_eq!(fallback_token_estimate(""), 0);
        assert_eq!(fallback_token_estimate("abcd"), 1);
        assert_eq!(fallback_token_estimate("abcde"), 2);
        assert_eq!(fallback_token_estimate("a"), 1);
    }
}
