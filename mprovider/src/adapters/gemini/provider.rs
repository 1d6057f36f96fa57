//! Gemini provider implementation over transport and shared models.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    BoxedChunkStream, ChatProvider, ChatRequest, ChatResponse, CredentialStore, FinishReason,
    ModelInfo, ProviderError, ProviderFuture, ProviderId, StreamChunk, fallback_token_estimate,
};

use super::auth::resolve_gemini_auth;
use super::serde_api::{
    GeminiContent, GeminiCountTokensRequest, GeminiGenerateResponse, build_generate_request,
};
use super::transport::GeminiTransport;

#[derive(Clone)]
pub struct GeminiProvider {
    credentials: Arc<CredentialStore>,
    transport: Arc<dyn GeminiTransport>,
}

impl GeminiProvider {
    pub fn new(credentials: Arc<CredentialStore>, transport: Arc<dyn GeminiTransport>) -> Self {
        Self {
            credentials,
            transport,
        }
    }

    /// Empty-but-successful responses indicate an upstream rejection that
    /// never surfaced as a transport error. They are never treated as a
    /// normal empty delta.
    fn contentless_error(response: &GeminiGenerateResponse) -> ProviderError {
        match response.block_reason() {
            Some(reason) => {
                ProviderError::content_filter(format!("response blocked: {reason}"))
                    .with_provider(ProviderId::Gemini)
            }
            None => ProviderError::unknown("model returned an empty response")
                .with_provider(ProviderId::Gemini),
        }
    }
}

impl ChatProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn models<'a>(&'a self) -> ProviderFuture<'a, Result<Vec<ModelInfo>, ProviderError>> {
        Box::pin(async move {
            let auth = resolve_gemini_auth(&self.credentials)?;
            let models = self.transport.list_models(auth).await?;
            Ok(models.into_iter().map(ModelInfo::from).collect())
        })
    }

    fn model<'a>(&'a self, id: &'a str) -> ProviderFuture<'a, Result<ModelInfo, ProviderError>> {
        Box::pin(async move {
            let auth = resolve_gemini_auth(&self.credentials)?;
            let model = self.transport.get_model(id, auth).await?;
            Ok(ModelInfo::from(model))
        })
    }

    fn count_tokens<'a>(&'a self, text: &'a str, model: &'a str) -> ProviderFuture<'a, u32> {
        Box::pin(async move {
            let remote = async {
                let auth = resolve_gemini_auth(&self.credentials)?;
                let request = GeminiCountTokensRequest {
                    contents: vec![GeminiContent::new("user", text)],
                };
                self.transport.count_tokens(model, request, auth).await
            };

            match remote.await {
                Ok(count) => count,
                Err(_) => fallback_token_estimate(text),
            }
        })
    }

    fn chat<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<ChatResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;

            if cancel.is_cancelled() {
                return Err(ProviderError::cancelled().with_provider(ProviderId::Gemini));
            }

            let auth = resolve_gemini_auth(&self.credentials)?;
            let model = request.model.clone();
            let wire_request = build_generate_request(request)?;

            // The select arm drops the in-flight call on cancellation; both
            // futures are released on every exit path.
            let response = tokio::select! {
                result = self.transport.generate(&model, wire_request, auth) => result?,
                _ = cancel.cancelled() => {
                    return Err(ProviderError::cancelled().with_provider(ProviderId::Gemini));
                }
            };

            let message = response.text();
            if message.is_empty() {
                return Err(Self::contentless_error(&response));
            }

            Ok(ChatResponse {
                message,
                usage: response.usage().unwrap_or_default(),
                model: response.model_version.clone().unwrap_or(model),
                finish_reason: response.finish_reason().unwrap_or(FinishReason::Other),
            })
        })
    }

    fn stream_chat<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;

            if cancel.is_cancelled() {
                return Err(ProviderError::cancelled().with_provider(ProviderId::Gemini));
            }

            let auth = resolve_gemini_auth(&self.credentials)?;
            let model = request.model.clone();
            let wire_request = build_generate_request(request)?;

            let mut inner = tokio::select! {
                result = self.transport.stream_generate(model, wire_request, auth) => result?,
                _ = cancel.cancelled() => {
                    return Err(ProviderError::cancelled().with_provider(ProviderId::Gemini));
                }
            };

            let stream = try_stream! {
                let mut yielded_any = false;
                let mut blocked = None::<GeminiGenerateResponse>;

                loop {
                    if cancel.is_cancelled() {
                        Err(ProviderError::cancelled().with_provider(ProviderId::Gemini))?;
                    }

                    let next = tokio::select! {
                        item = inner.next() => item,
                        _ = cancel.cancelled() => {
                            Some(Err(ProviderError::cancelled().with_provider(ProviderId::Gemini)))
                        }
                    };

                    let Some(item) = next else {
                        break;
                    };

                    let response = item?;
                    let delta = response.text();
                    let finish_reason = response.finish_reason();
                    let usage = response.usage();

                    if delta.is_empty() && finish_reason.is_none() && usage.is_none() {
                        blocked = Some(response);
                        continue;
                    }

                    yielded_any = true;
                    yield StreamChunk {
                        delta,
                        finish_reason,
                        usage,
                    };
                }

                if !yielded_any {
                    let response = blocked.unwrap_or_default();
                    Err(Self::contentless_error(&response))?;
                }
            };

            Ok(Box::pin(stream) as BoxedChunkStream<'a>)
        })
    }
}
