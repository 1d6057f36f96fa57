//! The capability contract every backend adapter implements.

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::{BoxedChunkStream, ChatRequest, ChatResponse, ModelInfo, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Abstract provider client.
///
/// Implementations must route every backend-specific failure through the
/// normalizer so callers only ever observe [`ProviderError`]. The two chat
/// operations are cancellation-aware: `chat` checks the token before issuing
/// the call and races the outstanding call against it; the stream returned
/// by `stream_chat` checks the token before yielding each chunk.
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Lists available models. Metadata only, no conversational side effects.
    fn models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<ModelInfo>, ProviderError>>;

    fn model<'a>(&'a self, id: &'a str) -> ProviderFuture<'a, Result<ModelInfo, ProviderError>>;

    /// Best-effort token count. Falls back to
    /// [`fallback_token_estimate`](crate::fallback_token_estimate) when the
    /// remote endpoint is unavailable; callers never block on this failing.
    fn count_tokens<'a>(
        &'a self,
        text: &'a str,
        model: &'a str,
    ) -> ProviderFuture<'a, u32>;

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>>;

    /// Produces a fresh, finite chunk sequence per invocation. The sequence
    /// is not restartable once iterated.
    fn stream_chat<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>>;
}
