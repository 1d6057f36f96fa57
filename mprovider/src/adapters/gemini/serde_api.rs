//! Gemini HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};

use crate::{ChatRequest, FinishReason, ModelInfo, ProviderError, Role, TokenUsage};

/// Builds the wire request. System-role history entries are folded into the
/// system instruction because the generation endpoint only accepts
/// `user`/`model` turns in `contents`.
pub(crate) fn build_generate_request(
    request: ChatRequest,
) -> Result<GeminiGenerateRequest, ProviderError> {
    let mut system_text = request.system_prompt.unwrap_or_default();
    let mut contents = Vec::new();

    for message in request.messages {
        match message.role {
            Role::System => {
                if !system_text.is_empty() {
                    system_text.push('\n');
                }
                system_text.push_str(&message.content);
            }
            Role::User => contents.push(GeminiContent::new("user", message.content)),
            Role::Model => contents.push(GeminiContent::new("model", message.content)),
        }
    }

    if contents.is_empty() {
        return Err(ProviderError::validation(
            "request requires at least one user or model message",
        ));
    }

    let params = request.params;
    let generation_config = GeminiGenerationConfig {
        temperature: params.temperature,
        max_output_tokens: params.max_tokens,
        top_p: params.top_p,
        top_k: params.top_k,
        presence_penalty: params.presence_penalty,
        frequency_penalty: params.frequency_penalty,
        stop_sequences: if params.stop_sequences.is_empty() {
            None
        } else {
            Some(params.stop_sequences)
        },
    };

    Ok(GeminiGenerateRequest {
        contents,
        system_instruction: if system_text.is_empty() {
            None
        } else {
            Some(GeminiContent::new("system", system_text))
        },
        generation_config: Some(generation_config),
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> FinishReason {
    match value {
        Some("STOP") => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY") | Some("PROHIBITED_CONTENT") | Some("BLOCKLIST") => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Other,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeminiGenerateRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub(crate) fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            parts: vec![GeminiPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiGenerateResponse {
    pub candidates: Option<Vec<GeminiCandidate>>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
    pub prompt_feedback: Option<GeminiPromptFeedback>,
    pub model_version: Option<String>,
}

impl GeminiGenerateResponse {
    /// Concatenated candidate text; empty when the backend returned nothing.
    pub(crate) fn text(&self) -> String {
        self.candidates
            .as_deref()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    pub(crate) fn finish_reason(&self) -> Option<FinishReason> {
        self.candidates
            .as_deref()
            .and_then(|candidates| candidates.first())
            .and_then(|candidate| candidate.finish_reason.as_deref())
            .map(|reason| parse_finish_reason(Some(reason)))
    }

    pub(crate) fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback
            .as_ref()
            .and_then(|feedback| feedback.block_reason.as_deref())
    }

    pub(crate) fn usage(&self) -> Option<TokenUsage> {
        self.usage_metadata.as_ref().map(|metadata| TokenUsage {
            prompt_tokens: metadata.prompt_token_count.unwrap_or(0),
            completion_tokens: metadata.candidates_token_count.unwrap_or(0),
            total_tokens: metadata.total_token_count.unwrap_or(0),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    pub content: Option<GeminiCandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    pub prompt_token_count: Option<u32>,
    pub candidates_token_count: Option<u32>,
    pub total_token_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiModelsPage {
    #[serde(default)]
    pub models: Vec<GeminiModelInfo>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiModelInfo {
    pub name: String,
    pub display_name: Option<String>,
    pub input_token_limit: Option<u32>,
    pub output_token_limit: Option<u32>,
}

impl From<GeminiModelInfo> for ModelInfo {
    fn from(value: GeminiModelInfo) -> Self {
        let id = value
            .name
            .strip_prefix("models/")
            .unwrap_or(&value.name)
            .to_string();

        Self {
            display_name: value.display_name.unwrap_or_else(|| id.clone()),
            id,
            input_token_limit: value.input_token_limit,
            output_token_limit: value.output_token_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiCountTokensRequest {
    pub contents: Vec<GeminiContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCountTokensResponse {
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChatMessage, Role};
    use mcommon::SamplingParams;

    #[test]
    fn build_request_maps_roles_and_system_prompt() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            vec![
                ChatMessage::new(Role::System, "inline system note"),
                ChatMessage::new(Role::User, "hello"),
                ChatMessage::new(Role::Model, "hi there"),
            ],
        )
        .with_system_prompt("be concise");

        let wire = build_generate_request(request).expect("request should build");
        assert_eq!(wire.contents.len(), 2);
        assert_eq!(wire.contents[0].role, "user");
        assert_eq!(wire.contents[1].role, "model");

        let system = wire.system_instruction.expect("system instruction");
        assert_eq!(system.parts[0].text, "be concise\ninline system note");
    }

    #[test]
    fn build_request_rejects_system_only_input() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            vec![ChatMessage::new(Role::System, "only system")],
        );

        assert!(build_generate_request(request).is_err());
    }

    #[test]
    fn generation_config_serializes_camel_case_and_skips_none() {
        let request = ChatRequest::new(
            "gemini-2.5-flash",
            vec![ChatMessage::new(Role::User, "hi")],
        )
        .with_params(
            SamplingParams::default()
                .with_temperature(0.5)
                .with_max_tokens(256)
                .with_top_k(40)
                .with_stop_sequence("END"),
        );

        let wire = build_generate_request(request).expect("request should build");
        let json = serde_json::to_value(&wire).expect("serialize");
        let config = &json["generationConfig"];

        assert_eq!(config["temperature"], 0.5);
        assert_eq!(config["maxOutputTokens"], 256);
        assert_eq!(config["topK"], 40);
        assert_eq!(config["stopSequences"][0], "END");
        assert!(config.get("topP").is_none());
    }

    #[test]
    fn response_helpers_extract_text_finish_and_usage() {
        let raw = r#"{
            "candidates": [{
                "content": {"parts": [{"text": "Hello"}, {"text": " World"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 10, "totalTokenCount": 15},
            "modelVersion": "gemini-2.5-flash"
        }"#;

        let response: GeminiGenerateResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(response.text(), "Hello World");
        assert_eq!(response.finish_reason(), Some(FinishReason::Stop));

        let usage = response.usage().expect("usage");
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.prompt_tokens, 5);
    }

    #[test]
    fn blocked_response_exposes_block_reason_and_no_text() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GeminiGenerateResponse = serde_json::from_str(raw).expect("parse");

        assert_eq!(response.text(), "");
        assert_eq!(response.block_reason(), Some("SAFETY"));
    }

    #[test]
    fn finish_reason_strings_map_into_taxonomy() {
        assert_eq!(parse_finish_reason(Some("STOP")), FinishReason::Stop);
        assert_eq!(parse_finish_reason(Some("MAX_TOKENS")), FinishReason::MaxTokens);
        assert_eq!(parse_finish_reason(Some("SAFETY")), FinishReason::ContentFilter);
        assert_eq!(parse_finish_reason(Some("WEIRD")), FinishReason::Other);
        assert_eq!(parse_finish_reason(None), FinishReason::Other);
    }

    #[test]
    fn model_info_strips_resource_prefix() {
        let wire = GeminiModelInfo {
            name: "models/gemini-2.5-flash".to_string(),
            display_name: Some("Gemini 2.5 Flash".to_string()),
            input_token_limit: Some(1_000_000),
            output_token_limit: Some(65_536),
        };

        let info = ModelInfo::from(wire);
        assert_eq!(info.id, "gemini-2.5-flash");
        assert_eq!(info.display_name, "Gemini 2.5 Flash");
        assert_eq!(info.input_token_limit, Some(1_000_000));
    }
}
