//! Unified facade over the murmur workspace crates.
//!
//! This crate is designed to be the single dependency for most
//! applications. It re-exports the member crates and provides wiring
//! helpers that assemble a credential store, a provider client, a
//! repository, and settings into one orchestrator handle — the explicit
//! context object that replaces any ambient global.
//!
//! ```rust
//! use murmur::{ChatDefaults, build_runtime_config};
//!
//! let config = build_runtime_config("api-key-123")
//!     .defaults(ChatDefaults::default().with_model("gemini-2.5-pro"));
//! assert_eq!(config.defaults.model, "gemini-2.5-pro");
//! ```

pub mod prelude;
pub mod runtime;

pub use mchat;
pub use mcommon;
pub use mobserve;
pub use mprovider;

pub use mchat::{
    COMMIT_INTERVAL, ChatDefaults, ChatError, ChatErrorKind, ChatOrchestrator,
    ChatOrchestratorBuilder, Conversation, ConversationMetadata, ConversationPatch,
    ConversationRepository, FunctionCall, FunctionResult, InMemoryConversationRepository,
    Message, MessageMetadata, MessageRole, RepoFuture, SettingsProvider, StaticSettings,
};
pub use mcommon::{BoxFuture, ConversationId, MessageId, SamplingParams};
pub use mobserve::{MetricsRetryHooks, TracingRetryHooks};
pub use mprovider::{
    BoxedChunkStream, ChatMessage, ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse,
    ChunkStream, CredentialStore, ErrorKind, FinishReason, ModelInfo, NoopOperationHooks,
    OperationHooks, ProviderError, ProviderFuture, ProviderId, RetryClass, RetryPolicy, Role,
    SecretString, StreamChunk, TokenUsage, VecChunkStream, execute_with_retry,
    extract_nested_message, fallback_token_estimate, normalize, normalize_source,
};

pub use runtime::{RuntimeBundle, RuntimeConfig, build_runtime_config, in_memory_repository};

#[cfg(feature = "adapter-gemini")]
pub use runtime::{build_runtime, build_runtime_with};
