//! Conversation orchestration over streaming model providers.
//!
//! The [`ChatOrchestrator`] owns the in-memory conversation set, drives the
//! send/stream/abort/persist lifecycle against an
//! [`mprovider::ChatProvider`] implementation, and reconciles results with a
//! durable [`ConversationRepository`].
//!
//! ```rust
//! use mchat::{ChatDefaults, Conversation, Message, MessageRole};
//! use mcommon::SamplingParams;
//!
//! let mut conversation = Conversation::new(
//!     "Scratchpad",
//!     "gemini-2.5-flash",
//!     SamplingParams::default().with_temperature(0.7),
//! );
//! conversation.messages.push(Message::user("hello"));
//!
//! assert_eq!(conversation.messages[0].role, MessageRole::User);
//! assert_eq!(ChatDefaults::default().model, "gemini-2.5-flash");
//! ```

mod error;
mod orchestrator;
mod repository;
mod settings;
mod types;

pub mod prelude {
    pub use crate::{
        COMMIT_INTERVAL, ChatDefaults, ChatError, ChatErrorKind, ChatOrchestrator,
        ChatOrchestratorBuilder, Conversation, ConversationMetadata, ConversationPatch,
        ConversationRepository, FunctionCall, FunctionResult, InMemoryConversationRepository,
        Message, MessageMetadata, MessageRole, RepoFuture, SettingsProvider, StaticSettings,
    };
    pub use mcommon::{ConversationId, MessageId, SamplingParams};
}

pub use error::{ChatError, ChatErrorKind};
pub use mcommon::{ConversationId, MessageId, SamplingParams};
pub use orchestrator::{COMMIT_INTERVAL, ChatOrchestrator, ChatOrchestratorBuilder};
pub use repository::{
    ConversationPatch, ConversationRepository, InMemoryConversationRepository, RepoFuture,
};
pub use settings::{ChatDefaults, SettingsProvider, StaticSettings};
pub use types::{
    Conversation, ConversationMetadata, FunctionCall, FunctionResult, Message, MessageMetadata,
    MessageRole,
};
