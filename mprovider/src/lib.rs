//! Provider clients, streaming contracts, and error normalization.
//!
//! Everything a conversation layer needs to talk to a remote generation
//! endpoint: the [`ChatProvider`] capability contract, the canonical
//! [`ProviderError`] taxonomy every backend failure normalizes into, the
//! cancellation-aware chunk stream contract, retry machinery, and one
//! reference adapter for the Gemini HTTP API.
//!
//! ```rust
//! use mprovider::{ChatMessage, ChatRequest, ProviderError, Role};
//!
//! let request = ChatRequest::builder("gemini-2.5-flash")
//!     .message(ChatMessage::new(Role::User, "hello"))
//!     .build()
//!     .expect("request should validate");
//! assert_eq!(request.model, "gemini-2.5-flash");
//!
//! let cancelled = ProviderError::cancelled();
//! assert!(cancelled.is_cancelled());
//! ```

mod credentials;
mod error;
mod model;
mod normalize;
mod provider;
mod resilience;
mod stream;

pub mod adapters;
pub mod prelude;

pub use credentials::{CredentialStore, SecretString};
pub use error::{ErrorKind, ProviderError};
pub use model::{
    ChatMessage, ChatRequest, ChatRequestBuilder, ChatResponse, FinishReason, ModelInfo,
    ProviderId, Role, TokenUsage, fallback_token_estimate,
};
pub use normalize::{extract_nested_message, normalize, normalize_source};
pub use provider::{ChatProvider, ProviderFuture};
pub use resilience::{
    NoopOperationHooks, OperationHooks, RetryClass, RetryPolicy, execute_with_retry,
};
pub use stream::{BoxedChunkStream, ChunkStream, StreamChunk, VecChunkStream};
