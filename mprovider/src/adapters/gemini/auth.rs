//! Gemini credential helpers and auth resolution policy.

use std::fmt::Formatter;

use crate::{CredentialStore, ProviderError, ProviderId, SecretString};

#[derive(PartialEq, Eq)]
pub struct GeminiAuth(pub(crate) SecretString);

impl GeminiAuth {
    pub fn expose(&self) -> &str {
        self.0.expose()
    }
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeminiAuth([REDACTED])")
    }
}

impl CredentialStore {
    /// Stores a Gemini API key for request signing.
    pub fn set_gemini_api_key(&self, api_key: impl Into<String>) -> Result<(), ProviderError> {
        self.set_api_key(ProviderId::Gemini, api_key)
    }
}

/// Resolves Gemini authentication from the credential store. Absence of a
/// key fails before any network call is made.
pub(crate) fn resolve_gemini_auth(
    credentials: &CredentialStore,
) -> Result<GeminiAuth, ProviderError> {
    if let Some(api_key) = credentials.api_key(ProviderId::Gemini)? {
        return Ok(GeminiAuth(api_key));
    }

    Err(ProviderError::auth("no Gemini API key configured").with_provider(ProviderId::Gemini))
}
