//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use mprovider::{ProviderError, RetryClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Credential,
    Busy,
    Provider,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub user_message: String,
    pub retriable: bool,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let (user_message, retriable) = match kind {
            ChatErrorKind::InvalidRequest => ("The request was invalid.".to_string(), false),
            ChatErrorKind::Credential => (
                "No API key is configured for this provider. Add one before sending.".to_string(),
                false,
            ),
            ChatErrorKind::Busy => (
                "A response is already being generated for this conversation.".to_string(),
                false,
            ),
            ChatErrorKind::Provider => (message.clone(), false),
            ChatErrorKind::Store => ("Saving the conversation failed.".to_string(), true),
        };

        Self {
            kind,
            message,
            user_message,
            retriable,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Credential, message)
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Busy, message)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl RetryClass for ChatError {
    fn is_retriable(&self) -> bool {
        self.retriable
    }
}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        Self {
            kind: ChatErrorKind::Provider,
            message: value.to_string(),
            user_message: value.user_message.clone(),
            retriable: value.retriable,
        }
    }
}
