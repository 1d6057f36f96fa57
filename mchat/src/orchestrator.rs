//! Streaming conversation orchestrator.
//!
//! One orchestrator instance owns the in-memory conversation set and the
//! active streaming session. It is a plain stateful object with no ambient
//! global: construct it once and thread the handle through to whatever owns
//! the UI tree. All methods take `&self`, so `abort_generation` can run
//! while `send_message` is suspended at an I/O boundary.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use mcommon::{ConversationId, MessageId};
use mprovider::{
    ChatMessage, ChatProvider, ChatRequest, FinishReason, NoopOperationHooks, OperationHooks,
    ProviderError, RetryPolicy, Role, TokenUsage, execute_with_retry,
};
use tokio_util::sync::CancellationToken;

use crate::{
    ChatError, Conversation, ConversationPatch, ConversationRepository, Message, MessageMetadata,
    MessageRole, SettingsProvider,
};

/// Minimum spacing between in-memory commits of streamed content. Chunks
/// arriving faster than this are coalesced into the accumulator; the
/// accumulator itself never loses data regardless of commit cadence.
pub const COMMIT_INTERVAL: Duration = Duration::from_millis(16);

/// Bounded-rate commit policy. The first chunk commits immediately;
/// subsequent commits wait out the interval.
#[derive(Debug)]
pub(crate) struct CommitThrottle {
    interval: Duration,
    last_commit: Option<Instant>,
}

impl CommitThrottle {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_commit: None,
        }
    }

    pub(crate) fn should_commit(&mut self, now: Instant) -> bool {
        match self.last_commit {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last_commit = Some(now);
                true
            }
        }
    }
}

/// Transient per-send state. Created at send time, destroyed when the
/// stream finishes, errors, or is cancelled. The delta accumulator and the
/// last-commit instant live on the driving loop's stack.
struct StreamingSession {
    conversation: ConversationId,
    message: MessageId,
    cancel: CancellationToken,
}

#[derive(Default)]
struct OrchestratorState {
    conversations: Vec<Conversation>,
    active: Option<ConversationId>,
    session: Option<StreamingSession>,
    is_loading: bool,
    is_streaming: bool,
    last_error: Option<String>,
}

impl OrchestratorState {
    fn conversation_mut(&mut self, id: &ConversationId) -> Option<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|conversation| &conversation.id == id)
    }

    fn sort(&mut self) {
        self.conversations
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    }
}

struct SendContext {
    conversation_id: ConversationId,
    placeholder_id: MessageId,
    cancel: CancellationToken,
    request: ChatRequest,
    created: Option<Conversation>,
}

pub struct ChatOrchestrator {
    provider: Arc<dyn ChatProvider>,
    repository: Arc<dyn ConversationRepository>,
    settings: Arc<dyn SettingsProvider>,
    hooks: Arc<dyn OperationHooks>,
    stream_retry: RetryPolicy,
    persist_retry: RetryPolicy,
    state: Mutex<OrchestratorState>,
}

pub struct ChatOrchestratorBuilder {
    provider: Arc<dyn ChatProvider>,
    repository: Arc<dyn ConversationRepository>,
    settings: Arc<dyn SettingsProvider>,
    hooks: Arc<dyn OperationHooks>,
    stream_retry: RetryPolicy,
    persist_retry: RetryPolicy,
}

impl ChatOrchestratorBuilder {
    pub fn hooks(mut self, hooks: Arc<dyn OperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn stream_retry(mut self, policy: RetryPolicy) -> Self {
        self.stream_retry = policy;
        self
    }

    pub fn persist_retry(mut self, policy: RetryPolicy) -> Self {
        self.persist_retry = policy;
        self
    }

    pub fn build(self) -> ChatOrchestrator {
        ChatOrchestrator {
            provider: self.provider,
            repository: self.repository,
            settings: self.settings,
            hooks: self.hooks,
            stream_retry: self.stream_retry,
            persist_retry: self.persist_retry,
            state: Mutex::new(OrchestratorState::default()),
        }
    }
}

impl ChatOrchestrator {
    pub fn builder(
        provider: Arc<dyn ChatProvider>,
        repository: Arc<dyn ConversationRepository>,
        settings: Arc<dyn SettingsProvider>,
    ) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder {
            provider,
            repository,
            settings,
            hooks: Arc::new(NoopOperationHooks),
            stream_retry: RetryPolicy::new(2),
            persist_retry: RetryPolicy::new(2),
        }
    }

    pub fn new(
        provider: Arc<dyn ChatProvider>,
        repository: Arc<dyn ConversationRepository>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self::builder(provider, repository, settings).build()
    }

    fn state(&self) -> MutexGuard<'_, OrchestratorState> {
        // A poisoned lock still yields usable state; the panic that poisoned
        // it happened between two consistent snapshots.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the in-memory conversation set with the repository contents.
    /// The repository is the source of truth after a restart.
    pub async fn hydrate(&self) -> Result<(), ChatError> {
        let mut records = self.repository.get_all().await?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        let mut state = self.state();
        if let Some(active) = &state.active
            && !records.iter().any(|record| &record.id == active)
        {
            state.active = None;
        }
        state.conversations = records;
        Ok(())
    }

    /// Sends a user message on the active conversation, creating one from
    /// the settings defaults when none is active, and drives the resulting
    /// stream to completion. Returns the id of the assistant message.
    ///
    /// Stream failures surface through [`last_error`](Self::last_error) and
    /// the returned error; a cancellation is a deliberate user action and
    /// reports neither.
    pub async fn send_message(&self, content: impl Into<String>) -> Result<MessageId, ChatError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ChatError::invalid_request("message content must not be empty"));
        }

        // Fatal precondition, checked before any network call.
        if self.settings.credential(self.provider.id()).is_none() {
            let error = ChatError::credential(format!(
                "no credential configured for provider {}",
                self.provider.id()
            ));
            self.state().last_error = Some(error.user_message.clone());
            return Err(error);
        }

        let SendContext {
            conversation_id,
            placeholder_id,
            cancel,
            request,
            created,
        } = self.begin_send(&content)?;

        // The in-memory transaction above cannot fail; the durable writes
        // are fire-and-forget and only ever logged. The snapshot persist
        // runs after the create so the user turn reaches the new record.
        if let Some(record) = created {
            self.persist_create(record).await;
        }
        self.persist_conversation(&conversation_id).await;

        let scope = self.provider.id().to_string();
        let stream = execute_with_retry(
            &scope,
            "stream_chat",
            &self.stream_retry,
            self.hooks.as_ref(),
            |_| self.provider.stream_chat(request.clone(), cancel.clone()),
            |delay| tokio::time::sleep(delay),
        )
        .await;

        let mut stream = match stream {
            Ok(stream) => stream,
            Err(error) => {
                self.finalize_failure(&conversation_id, &placeholder_id, String::new(), error)
                    .await?;
                return Ok(placeholder_id);
            }
        };

        self.state().is_streaming = true;
        tracing::debug!(conversation = %conversation_id, "stream established");

        let mut accumulator = String::new();
        let mut finish_reason = None::<FinishReason>;
        let mut usage = None::<TokenUsage>;
        let mut failure = None::<ProviderError>;
        let mut throttle = CommitThrottle::new(COMMIT_INTERVAL);

        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    accumulator.push_str(&chunk.delta);
                    if chunk.finish_reason.is_some() {
                        finish_reason = chunk.finish_reason;
                    }
                    if chunk.usage.is_some() {
                        usage = chunk.usage;
                    }
                    if throttle.should_commit(Instant::now()) {
                        self.commit_partial(&conversation_id, &placeholder_id, &accumulator);
                    }
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        drop(stream);

        match failure {
            None => {
                self.finalize_success(
                    &conversation_id,
                    &placeholder_id,
                    accumulator,
                    finish_reason,
                    usage,
                )
                .await;
                Ok(placeholder_id)
            }
            Some(error) => {
                // Cancellation and failure share one recovery path; both
                // preserve the partial content first.
                self.finalize_failure(&conversation_id, &placeholder_id, accumulator, error)
                    .await?;
                Ok(placeholder_id)
            }
        }
    }

    /// Cancels the active stream, if any. A no-op once the stream has
    /// finished. The driving loop observes the token at its next iteration
    /// boundary and unwinds through the partial-content-preservation path.
    pub fn abort_generation(&self) {
        let state = self.state();
        if let Some(session) = &state.session {
            session.cancel.cancel();
        }
    }

    /// Creates a conversation from the settings defaults and makes it
    /// active. The in-memory creation cannot fail; the durable write is
    /// best-effort.
    pub async fn create_conversation(&self) -> Conversation {
        let conversation = self.conversation_from_defaults();
        {
            let mut state = self.state();
            state.conversations.push(conversation.clone());
            state.active = Some(conversation.id.clone());
            state.sort();
        }
        self.persist_create(conversation.clone()).await;
        conversation
    }

    pub async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ChatError> {
        {
            let mut state = self.state();
            if let Some(session) = &state.session
                && &session.conversation == id
            {
                session.cancel.cancel();
            }
            state.conversations.retain(|conversation| &conversation.id != id);
            if state.active.as_ref() == Some(id) {
                state.active = None;
            }
        }
        self.repository.delete(id).await
    }

    pub fn set_active_conversation(&self, id: &ConversationId) -> Result<(), ChatError> {
        let mut state = self.state();
        if !state.conversations.iter().any(|conversation| &conversation.id == id) {
            return Err(ChatError::invalid_request(format!("unknown conversation {id}")));
        }
        state.active = Some(id.clone());
        Ok(())
    }

    /// Replaces the content of an existing message, independent of any
    /// active stream.
    pub async fn update_message(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        new_content: impl Into<String>,
    ) -> Result<(), ChatError> {
        let new_content = new_content.into();
        {
            let mut state = self.state();
            let conversation = state.conversation_mut(conversation_id).ok_or_else(|| {
                ChatError::invalid_request(format!("unknown conversation {conversation_id}"))
            })?;
            let message = conversation.message_mut(message_id).ok_or_else(|| {
                ChatError::invalid_request(format!("unknown message {message_id}"))
            })?;
            message.content = new_content;
            conversation.touch();
            state.sort();
        }
        self.persist_conversation(conversation_id).await;
        Ok(())
    }

    /// Conversation list, sorted by `updated_at` descending.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state().conversations.clone()
    }

    pub fn conversation(&self, id: &ConversationId) -> Option<Conversation> {
        self.state()
            .conversations
            .iter()
            .find(|conversation| &conversation.id == id)
            .cloned()
    }

    pub fn active_conversation_id(&self) -> Option<ConversationId> {
        self.state().active.clone()
    }

    pub fn active_conversation(&self) -> Option<Conversation> {
        let state = self.state();
        let active = state.active.as_ref()?;
        state
            .conversations
            .iter()
            .find(|conversation| &conversation.id == active)
            .cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    pub fn is_streaming(&self) -> bool {
        self.state().is_streaming
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    fn conversation_from_defaults(&self) -> Conversation {
        let defaults = self.settings.defaults();
        let mut conversation = Conversation::new(defaults.title, defaults.model, defaults.params);
        if let Some(system_prompt) = defaults.system_prompt {
            conversation = conversation.with_system_prompt(system_prompt);
        }
        conversation
    }

    /// In-memory transaction for a send: resolves (or lazily creates) the
    /// target conversation, appends the user message, inserts the assistant
    /// placeholder directly after it, and registers the streaming session.
    fn begin_send(&self, content: &str) -> Result<SendContext, ChatError> {
        let mut state = self.state();

        if state.session.is_some() {
            return Err(ChatError::busy(
                "a response is already streaming for this session",
            ));
        }

        let mut created = None;
        let conversation_id = match state.active.clone() {
            Some(id) if state.conversation_mut(&id).is_some() => id,
            _ => {
                // Lazy auto-creation: a send must never dead-end on a
                // missing conversation.
                let conversation = self.conversation_from_defaults();
                let id = conversation.id.clone();
                created = Some(conversation.clone());
                state.conversations.push(conversation);
                state.active = Some(id.clone());
                id
            }
        };

        let conversation = state
            .conversation_mut(&conversation_id)
            .ok_or_else(|| ChatError::invalid_request("active conversation disappeared"))?;

        conversation.messages.push(Message::user(content));
        let placeholder = Message::model_placeholder();
        let placeholder_id = placeholder.id.clone();
        conversation.messages.push(placeholder);
        conversation.touch();

        let request = build_request(conversation, &placeholder_id);

        let cancel = CancellationToken::new();
        state.session = Some(StreamingSession {
            conversation: conversation_id.clone(),
            message: placeholder_id.clone(),
            cancel: cancel.clone(),
        });
        state.is_loading = true;
        state.last_error = None;
        state.sort();

        Ok(SendContext {
            conversation_id,
            placeholder_id,
            cancel,
            request,
            created,
        })
    }

    fn commit_partial(&self, conversation_id: &ConversationId, message_id: &MessageId, content: &str) {
        let mut state = self.state();
        if let Some(conversation) = state.conversation_mut(conversation_id)
            && let Some(message) = conversation.message_mut(message_id)
        {
            message.content = content.to_string();
        }
    }

    async fn finalize_success(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        content: String,
        finish_reason: Option<FinishReason>,
        usage: Option<TokenUsage>,
    ) {
        {
            let mut state = self.state();
            if let Some(conversation) = state.conversation_mut(conversation_id) {
                let model = conversation.model.clone();
                if let Some(tokens) = usage.map(|usage| usage.total_tokens) {
                    conversation.add_usage(tokens);
                }
                if let Some(message) = conversation.message_mut(message_id) {
                    message.content = content;
                    message.metadata = Some(MessageMetadata {
                        model: Some(model),
                        total_tokens: usage.map(|usage| usage.total_tokens),
                        finish_reason: finish_reason.map(|reason| reason.as_str().to_string()),
                    });
                }
                conversation.touch();
            }
            state.session = None;
            state.is_loading = false;
            state.is_streaming = false;
            state.sort();
        }

        tracing::debug!(conversation = %conversation_id, "stream finalized");
        self.persist_conversation(conversation_id).await;
    }

    /// Shared unwind path for failures and cancellations: the partial
    /// content is committed before anything is surfaced, so generated tokens
    /// are never lost to a later failure.
    async fn finalize_failure(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        partial: String,
        error: ProviderError,
    ) -> Result<(), ChatError> {
        let cancelled = error.is_cancelled();
        {
            let mut state = self.state();
            if let Some(conversation) = state.conversation_mut(conversation_id) {
                if let Some(message) = conversation.message_mut(message_id) {
                    message.content = partial;
                }
                conversation.touch();
            }
            state.session = None;
            state.is_loading = false;
            state.is_streaming = false;
            state.last_error = if cancelled {
                None
            } else {
                Some(error.user_message.clone())
            };
            state.sort();
        }

        if cancelled {
            tracing::debug!(conversation = %conversation_id, "generation cancelled");
        } else {
            tracing::error!(conversation = %conversation_id, error = %error, "stream failed");
        }

        self.persist_conversation(conversation_id).await;

        if cancelled {
            Ok(())
        } else {
            Err(ChatError::from(error))
        }
    }

    async fn persist_create(&self, record: Conversation) {
        let id = record.id.clone();
        let result = execute_with_retry(
            "repository",
            "create",
            &self.persist_retry,
            self.hooks.as_ref(),
            |_| {
                let record = record.clone();
                async move { self.repository.create(record).await }
            },
            |delay| tokio::time::sleep(delay),
        )
        .await;

        if let Err(error) = result {
            // Memory already holds the truth; the durable write catches up
            // on a later persist.
            tracing::warn!(conversation = %id, error = %error, "conversation create persist failed");
        }
    }

    async fn persist_conversation(&self, conversation_id: &ConversationId) {
        let patch = {
            let state = self.state();
            state
                .conversations
                .iter()
                .find(|conversation| &conversation.id == conversation_id)
                .map(ConversationPatch::snapshot)
        };
        let Some(patch) = patch else {
            return;
        };

        let result = execute_with_retry(
            "repository",
            "update",
            &self.persist_retry,
            self.hooks.as_ref(),
            |_| {
                let patch = patch.clone();
                async move { self.repository.update(conversation_id, patch).await }
            },
            |delay| tokio::time::sleep(delay),
        )
        .await;

        if let Err(error) = result {
            tracing::warn!(conversation = %conversation_id, error = %error, "conversation persist failed");
        }
    }
}

fn build_request(conversation: &Conversation, placeholder: &MessageId) -> ChatRequest {
    let messages = conversation
        .messages
        .iter()
        .filter(|message| &message.id != placeholder && !message.content.is_empty())
        .map(|message| {
            let role = match message.role {
                MessageRole::User => Role::User,
                MessageRole::Model => Role::Model,
                MessageRole::System => Role::System,
            };
            ChatMessage::new(role, message.content.clone())
        })
        .collect();

    let mut request = ChatRequest::new(conversation.model.clone(), messages)
        .with_params(conversation.params.clone());
    if let Some(system_prompt) = &conversation.system_prompt {
        request = request.with_system_prompt(system_prompt.clone());
    }
    request
}
