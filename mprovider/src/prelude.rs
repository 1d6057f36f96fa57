//! Common `mprovider` imports for downstream crates.

pub use crate::{
    BoxedChunkStream, ChatMessage, ChatProvider, ChatRequest, ChatRequestBuilder, ChatResponse,
    ChunkStream, CredentialStore, ErrorKind, FinishReason, ModelInfo, NoopOperationHooks,
    OperationHooks, ProviderError, ProviderFuture, ProviderId, RetryClass, RetryPolicy, Role,
    SecretString, StreamChunk, TokenUsage, VecChunkStream, execute_with_retry,
    fallback_token_estimate, normalize,
};
pub use mcommon::{BoxFuture, SamplingParams};
pub use tokio_util::sync::CancellationToken;
