//! Durable conversation storage contract and a basic in-memory implementation.
//!
//! The repository is the source of truth after a restart. The orchestrator
//! never assumes its operations are synchronous and treats each write as
//! last-writer-wins at the granularity of one conversation record.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use mcommon::{ConversationId, SamplingParams};

use crate::{ChatError, Conversation, ConversationMetadata, Message};

pub type RepoFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Partial update applied to a stored conversation record. Absent fields are
/// left untouched; `system_prompt` and `metadata` distinguish "leave alone"
/// from "clear" with a nested `Option`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub model: Option<String>,
    pub params: Option<SamplingParams>,
    pub system_prompt: Option<Option<String>>,
    pub metadata: Option<Option<ConversationMetadata>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn params(mut self, params: SamplingParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = Some(system_prompt);
        self
    }

    pub fn metadata(mut self, metadata: Option<ConversationMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Snapshot patch carrying everything the orchestrator mutates during a
    /// send: the message list, timestamps, aggregate metadata, and title.
    pub fn snapshot(conversation: &Conversation) -> Self {
        Self::new()
            .title(conversation.title.clone())
            .messages(conversation.messages.clone())
            .metadata(conversation.metadata)
            .updated_at(conversation.updated_at)
    }

    pub fn apply_to(self, conversation: &mut Conversation) {
        if let Some(title) = self.title {
            conversation.title = title;
        }
        if let Some(messages) = self.messages {
            conversation.messages = messages;
        }
        if let Some(model) = self.model {
            conversation.model = model;
        }
        if let Some(params) = self.params {
            conversation.params = params;
        }
        if let Some(system_prompt) = self.system_prompt {
            conversation.system_prompt = system_prompt;
        }
        if let Some(metadata) = self.metadata {
            conversation.metadata = metadata;
        }
        if let Some(updated_at) = self.updated_at {
            conversation.updated_at = updated_at;
        }
    }
}

pub trait ConversationRepository: Send + Sync {
    fn create<'a>(
        &'a self,
        record: Conversation,
    ) -> RepoFuture<'a, Result<ConversationId, ChatError>>;

    fn get<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> RepoFuture<'a, Result<Option<Conversation>, ChatError>>;

    fn get_all<'a>(&'a self) -> RepoFuture<'a, Result<Vec<Conversation>, ChatError>>;

    fn update<'a>(
        &'a self,
        id: &'a ConversationId,
        changes: ConversationPatch,
    ) -> RepoFuture<'a, Result<(), ChatError>>;

    fn delete<'a>(&'a self, id: &'a ConversationId) -> RepoFuture<'a, Result<(), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationRepository {
    records: Mutex<HashMap<ConversationId, Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationRepository for InMemoryConversationRepository {
    fn create<'a>(
        &'a self,
        record: Conversation,
    ) -> RepoFuture<'a, Result<ConversationId, ChatError>> {
        Box::pin(async move {
            let mut records = self
                .records
                .lock()
                .map_err(|_| ChatError::store("conversation repository lock poisoned"))?;

            let id = record.id.clone();
            records.insert(id.clone(), record);
            Ok(id)
        })
    }

    fn get<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> RepoFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let records = self
                .records
                .lock()
                .map_err(|_| ChatError::store("conversation repository lock poisoned"))?;

            Ok(records.get(id).cloned())
        })
    }

    fn get_all<'a>(&'a self) -> RepoFuture<'a, Result<Vec<Conversation>, ChatError>> {
        Box::pin(async move {
            let records = self
                .records
                .lock()
                .map_err(|_| ChatError::store("conversation repository lock poisoned"))?;

            Ok(records.values().cloned().collect())
        })
    }

    fn update<'a>(
        &'a self,
        id: &'a ConversationId,
        changes: ConversationPatch,
    ) -> RepoFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut records = self
                .records
                .lock()
                .map_err(|_| ChatError::store("conversation repository lock poisoned"))?;

            let record = records
                .get_mut(id)
                .ok_or_else(|| ChatError::store(format!("conversation {id} not found")))?;

            changes.apply_to(record);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a ConversationId) -> RepoFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut records = self
                .records
                .lock()
                .map_err(|_| ChatError::store("conversation repository lock poisoned"))?;

            records.remove(id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str) -> Conversation {
        Conversation::new(title, "gemini-2.5-flash", SamplingParams::default())
    }

    #[tokio::test]
    async fn create_get_and_delete_round_trip() {
        let repository = InMemoryConversationRepository::new();
        let conversation = record("first");
        let id = repository
            .create(conversation.clone())
            .await
            .expect("create should work");

        let loaded = repository.get(&id).await.expect("get should work");
        assert_eq!(loaded, Some(conversation));

        repository.delete(&id).await.expect("delete should work");
        assert_eq!(repository.get(&id).await.expect("get"), None);
    }

    #[tokio::test]
    async fn update_applies_partial_changes_only() {
        let repository = InMemoryConversationRepository::new();
        let conversation = record("before");
        let model = conversation.model.clone();
        let id = repository
            .create(conversation)
            .await
            .expect("create should work");

        repository
            .update(&id, ConversationPatch::new().title("after"))
            .await
            .expect("update should work");

        let loaded = repository
            .get(&id)
            .await
            .expect("get should work")
            .expect("record should exist");
        assert_eq!(loaded.title, "after");
        assert_eq!(loaded.model, model);
    }

    #[tokio::test]
    async fn update_on_missing_record_is_a_store_error() {
        let repository = InMemoryConversationRepository::new();
        let missing = ConversationId::new("missing");

        let error = repository
            .update(&missing, ConversationPatch::new().title("x"))
            .await
            .expect_err("missing record must fail");
        assert_eq!(error.kind, crate::ChatErrorKind::Store);
    }

    #[test]
    fn patch_distinguishes_clearing_from_leaving_untouched() {
        let mut conversation = record("patching").with_system_prompt("keep or clear");

        ConversationPatch::new().apply_to(&mut conversation);
        assert_eq!(conversation.system_prompt.as_deref(), Some("keep or clear"));

        ConversationPatch::new()
            .system_prompt(None)
            .apply_to(&mut conversation);
        assert_eq!(conversation.system_prompt, None);
    }
}
