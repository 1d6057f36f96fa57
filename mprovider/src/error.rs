//! Canonical error taxonomy and error value helpers.
//!
//! Every failure crossing the provider boundary is converted into a
//! [`ProviderError`] before callers see it, so application code never
//! inspects backend-specific shapes.
//!
//! ```rust
//! use mprovider::{ErrorKind, ProviderError};
//!
//! let auth = ProviderError::auth("bad key");
//! assert!(!auth.retriable);
//!
//! let rate_limited = ProviderError::rate_limited("slow down");
//! assert!(rate_limited.retriable);
//! assert_eq!(rate_limited.kind, ErrorKind::RateLimit);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Auth,
    RateLimit,
    Validation,
    Server,
    Quota,
    ModelUnavailable,
    ContentFilter,
    ContextLength,
    Cancelled,
    Unknown,
}

impl ErrorKind {
    /// Default retriability per kind. Transient transport and server-side
    /// conditions are worth retrying; everything that requires a change to
    /// the request or the account is not, and a cancellation is a deliberate
    /// user action.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::RateLimit | Self::Server | Self::Unknown
        )
    }

    pub(crate) fn default_user_message(self) -> &'static str {
        match self {
            Self::Network => "Could not reach the model service. Check your connection and try again.",
            Self::Auth => "The configured credential was rejected. Verify your API key.",
            Self::RateLimit => "The model service is rate limiting requests. Try again shortly.",
            Self::Validation => "The request was rejected as invalid.",
            Self::Server => "The model service reported an internal error. Try again shortly.",
            Self::Quota => "Your usage quota for this model has been exhausted.",
            Self::ModelUnavailable => "The selected model is not available.",
            Self::ContentFilter => "The response was blocked by the provider's content filter.",
            Self::ContextLength => "The conversation is too long for this model's context window.",
            Self::Cancelled => "Generation cancelled.",
            Self::Unknown => "Something went wrong talking to the model service.",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Quota => "quota",
            Self::ModelUnavailable => "model_unavailable",
            Self::ContentFilter => "content_filter",
            Self::ContextLength => "context_length",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };

        f.write_str(name)
    }
}

/// The single canonical error shape all provider failures normalize into.
///
/// `source` keeps the original error for diagnostics only; it is never
/// inspected for classification after normalization and never mutated.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
    pub user_message: String,
    pub retriable: bool,
    pub status: Option<u16>,
    pub provider: Option<ProviderId>,
    pub retry_after: Option<Duration>,
    pub source: Option<Arc<dyn Error + Send + Sync>>,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            user_message: kind.default_user_message().to_string(),
            retriable: kind.is_retriable(),
            status: None,
            provider: None,
            retry_after: None,
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Quota, message)
    }

    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ModelUnavailable, message)
    }

    pub fn content_filter(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContentFilter, message)
    }

    pub fn context_length(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ContextLength, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled by caller")
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = user_message.into();
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl PartialEq for ProviderError {
    fn eq(&self, other: &Self) -> bool {
        // `source` is diagnostic-only and excluded from equality.
        self.kind == other.kind
            && self.message == other.message
            && self.user_message == other.user_message
            && self.retriable == other.retriable
            && self.status == other.status
            && self.provider == other.provider
            && self.retry_after == other.retry_after
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_kinds_match_taxonomy() {
        assert!(ErrorKind::Network.is_retriable());
        assert!(ErrorKind::RateLimit.is_retriable());
        assert!(ErrorKind::Server.is_retriable());
        assert!(ErrorKind::Unknown.is_retriable());

        assert!(!ErrorKind::Auth.is_retriable());
        assert!(!ErrorKind::Validation.is_retriable());
        assert!(!ErrorKind::Quota.is_retriable());
        assert!(!ErrorKind::ModelUnavailable.is_retriable());
        assert!(!ErrorKind::ContentFilter.is_retriable());
        assert!(!ErrorKind::ContextLength.is_retriable());
        assert!(!ErrorKind::Cancelled.is_retriable());
    }

    #[test]
    fn factory_helpers_assign_kind_and_user_message() {
        let error = ProviderError::rate_limited("429 from upstream")
            .with_status(429)
            .with_retry_after(Duration::from_secs(4));

        assert_eq!(error.kind, ErrorKind::RateLimit);
        assert!(error.retriable);
        assert_eq!(error.status, Some(429));
        assert_eq!(error.retry_after, Some(Duration::from_secs(4)));
        assert!(error.user_message.contains("rate limiting"));
    }

    #[test]
    fn cancelled_is_silent_and_non_retriable() {
        let error = ProviderError::cancelled();
        assert!(error.is_cancelled());
        assert!(!error.retriable);
    }

    #[test]
    fn source_is_excluded_from_equality() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let with_source = ProviderError::network("connection reset").with_source(io);
        let without_source = ProviderError::network("connection reset");

        assert_eq!(with_source, without_source);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let error = ProviderError::context_length("prompt exceeds window");
        assert_eq!(error.to_string(), "context_length: prompt exceeds window");
    }
}
