//! Gemini transport trait and reqwest-based HTTP implementation.

use std::pin::Pin;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::header::HeaderValue;
use reqwest::{Client, Response};

use crate::{ProviderError, ProviderFuture, ProviderId, normalize};

use super::auth::GeminiAuth;
use super::serde_api::{
    GeminiCountTokensRequest, GeminiCountTokensResponse, GeminiGenerateRequest,
    GeminiGenerateResponse, GeminiModelInfo, GeminiModelsPage,
};

pub type GeminiChunkStream<'a> =
    Pin<Box<dyn Stream<Item = Result<GeminiGenerateResponse, ProviderError>> + Send + 'a>>;

pub trait GeminiTransport: Send + Sync + std::fmt::Debug {
    fn list_models<'a>(
        &'a self,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<Vec<GeminiModelInfo>, ProviderError>>;

    fn get_model<'a>(
        &'a self,
        model: &'a str,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiModelInfo, ProviderError>>;

    fn count_tokens<'a>(
        &'a self,
        model: &'a str,
        request: GeminiCountTokensRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<u32, ProviderError>>;

    fn generate<'a>(
        &'a self,
        model: &'a str,
        request: GeminiGenerateRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiGenerateResponse, ProviderError>>;

    /// The model is taken by value because the returned stream outlives the
    /// call that produced it.
    fn stream_generate<'a>(
        &'a self,
        model: String,
        request: GeminiGenerateRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiChunkStream<'a>, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct GeminiHttpTransport {
    client: Client,
    base_url: String,
}

impl GeminiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(
        &self,
        builder: reqwest::RequestBuilder,
        auth: &GeminiAuth,
    ) -> reqwest::RequestBuilder {
        builder.header("x-goog-api-key", auth.0.expose())
    }

    fn transport_error(err: reqwest::Error) -> ProviderError {
        let raw = err.to_string();
        if err.is_timeout() || err.is_connect() {
            ProviderError::network(raw)
                .with_provider(ProviderId::Gemini)
                .with_source(err)
        } else {
            normalize(&raw, None, ProviderId::Gemini).with_source(err)
        }
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers().get("retry-after"));
        let body = response.text().await.unwrap_or_default();

        let mut error = normalize(&body, Some(status), ProviderId::Gemini);
        if let Some(delay) = retry_after {
            error = error.with_retry_after(delay);
        }

        error
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    // Retry-After HTTP-date parsing is omitted; only the seconds form is used.
    value.parse::<u64>().ok().map(Duration::from_secs)
}

impl GeminiTransport for GeminiHttpTransport {
    fn list_models<'a>(
        &'a self,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<Vec<GeminiModelInfo>, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint("models");
            let builder = self.client.get(url);
            let response = self
                .apply_auth(builder, &auth)
                .send()
                .await
                .map_err(Self::transport_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let page: GeminiModelsPage = response
                .json()
                .await
                .map_err(Self::transport_error)?;

            Ok(page.models)
        })
    }

    fn get_model<'a>(
        &'a self,
        model: &'a str,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiModelInfo, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("models/{model}"));
            let builder = self.client.get(url);
            let response = self
                .apply_auth(builder, &auth)
                .send()
                .await
                .map_err(Self::transport_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            response.json().await.map_err(Self::transport_error)
        })
    }

    fn count_tokens<'a>(
        &'a self,
        model: &'a str,
        request: GeminiCountTokensRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<u32, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("models/{model}:countTokens"));
            let builder = self.client.post(url).json(&request);
            let response = self
                .apply_auth(builder, &auth)
                .send()
                .await
                .map_err(Self::transport_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: GeminiCountTokensResponse =
                response.json().await.map_err(Self::transport_error)?;

            Ok(parsed.total_tokens)
        })
    }

    fn generate<'a>(
        &'a self,
        model: &'a str,
        request: GeminiGenerateRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiGenerateResponse, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("models/{model}:generateContent"));
            let builder = self.client.post(url).json(&request);
            let response = self
                .apply_auth(builder, &auth)
                .send()
                .await
                .map_err(Self::transport_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            response.json().await.map_err(Self::transport_error)
        })
    }

    fn stream_generate<'a>(
        &'a self,
        model: String,
        request: GeminiGenerateRequest,
        auth: GeminiAuth,
    ) -> ProviderFuture<'a, Result<GeminiChunkStream<'a>, ProviderError>> {
        Box::pin(async move {
            let url = self.endpoint(&format!("models/{model}:streamGenerateContent?alt=sse"));
            let builder = self.client.post(url).json(&request);
            let response = self
                .apply_auth(builder, &auth)
                .send()
                .await
                .map_err(Self::transport_error)?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let stream = try_stream! {
                let mut bytes = response.bytes_stream();
                let mut sse_buffer = String::new();

                while let Some(item) = bytes.next().await {
                    let chunk = item.map_err(Self::transport_error)?;
                    let text = std::str::from_utf8(&chunk)
                        .map_err(|err| ProviderError::network(err.to_string()))?;
                    sse_buffer.push_str(text);

                    while let Some(newline_index) = sse_buffer.find('\n') {
                        let line = sse_buffer.drain(..=newline_index).collect::<String>();
                        let line = line.trim();

                        let Some(payload) = line.strip_prefix("data:") else {
                            continue;
                        };

                        let payload = payload.trim();
                        if payload.is_empty() {
                            continue;
                        }

                        let parsed: GeminiGenerateResponse = serde_json::from_str(payload)
                            .map_err(|_| normalize(payload, None, ProviderId::Gemini))?;

                        // An in-band error envelope deserializes into an
                        // all-empty response; surface it instead of yielding.
                        if parsed.candidates.is_none()
                            && parsed.usage_metadata.is_none()
                            && parsed.prompt_feedback.is_none()
                        {
                            Err(normalize(payload, None, ProviderId::Gemini))?;
                        }

                        yield parsed;
                    }
                }
            };

            Ok(Box::pin(stream) as GeminiChunkStream<'a>)
        })
    }
}
