//! Conversation and message records.
//!
//! These are the durable shapes the repository stores. `Message.content` is
//! the only mutable-in-place field, and only while the message is the active
//! streaming target.

use chrono::{DateTime, Utc};
use mcommon::{ConversationId, MessageId, SamplingParams};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Model,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResult {
    pub name: String,
    pub response: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_result: Option<FunctionResult>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(uuid::Uuid::new_v4().to_string()),
            role,
            content: content.into(),
            created_at: Utc::now(),
            metadata: None,
            function_call: None,
            function_result: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Empty assistant message inserted at stream start so incremental
    /// content has a stable anchor.
    pub fn model_placeholder() -> Self {
        Self::new(MessageRole::Model, "")
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ConversationMetadata {
    pub total_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Message>,
    pub model: String,
    pub params: SamplingParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ConversationMetadata>,
}

impl Conversation {
    pub fn new(title: impl Into<String>, model: impl Into<String>, params: SamplingParams) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(uuid::Uuid::new_v4().to_string()),
            title: title.into(),
            messages: Vec::new(),
            model: model.into(),
            params,
            system_prompt: None,
            created_at: now,
            updated_at: now,
            metadata: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Bumps `updated_at`, keeping it monotonically non-decreasing even when
    /// the wall clock stands still or steps backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }

    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == id)
    }

    pub fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| &message.id == id)
    }

    pub(crate) fn add_usage(&mut self, tokens: u32) {
        let metadata = self.metadata.get_or_insert_with(ConversationMetadata::default);
        metadata.total_tokens = metadata.total_tokens.saturating_add(tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_get_unique_ids() {
        let first = Message::user("one");
        let second = Message::user("two");
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn placeholder_is_an_empty_model_message() {
        let placeholder = Message::model_placeholder();
        assert_eq!(placeholder.role, MessageRole::Model);
        assert!(placeholder.content.is_empty());
        assert!(placeholder.metadata.is_none());
    }

    #[test]
    fn touch_never_moves_updated_at_backwards() {
        let mut conversation =
            Conversation::new("test", "gemini-2.5-flash", SamplingParams::default());
        let future = Utc::now() + chrono::Duration::hours(1);
        conversation.updated_at = future;

        conversation.touch();
        assert_eq!(conversation.updated_at, future);
    }

    #[test]
    fn usage_accumulates_into_conversation_metadata() {
        let mut conversation =
            Conversation::new("test", "gemini-2.5-flash", SamplingParams::default());
        conversation.add_usage(10);
        conversation.add_usage(5);

        assert_eq!(conversation.metadata.expect("metadata").total_tokens, 15);
    }

    #[test]
    fn records_round_trip_through_serde() {
        let mut conversation = Conversation::new(
            "round trip",
            "gemini-2.5-flash",
            SamplingParams::default().with_temperature(0.4),
        )
        .with_system_prompt("be kind");
        conversation.messages.push(Message::user("hello"));
        conversation.messages.push(
            Message::new(MessageRole::Model, "hi").with_metadata(MessageMetadata {
                model: Some("gemini-2.5-flash".to_string()),
                total_tokens: Some(12),
                finish_reason: Some("stop".to_string()),
            }),
        );

        let encoded = serde_json::to_string(&conversation).expect("encode");
        let decoded: Conversation = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, conversation);
    }
}
