//! In-memory credential storage with redaction-safe secret handling.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::{ProviderError, ProviderId};

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Holds one opaque API key per provider. The store never hands out owned
/// copies; callers borrow the secret through a closure.
#[derive(Default)]
pub struct CredentialStore {
    credentials: Mutex<HashMap<ProviderId, SecretString>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_api_key(
        &self,
        provider: ProviderId,
        api_key: impl Into<String>,
    ) -> Result<(), ProviderError> {
        let api_key = SecretString::new(api_key);
        if api_key.is_empty() {
            return Err(ProviderError::auth("api key must not be empty"));
        }

        self.credentials_mut()?.insert(provider, api_key);
        Ok(())
    }

    pub fn has_credential(&self, provider: ProviderId) -> Result<bool, ProviderError> {
        Ok(self.credentials_ref()?.contains_key(&provider))
    }

    /// Hands out an owned copy of the stored secret for request signing.
    pub fn api_key(&self, provider: ProviderId) -> Result<Option<SecretString>, ProviderError> {
        Ok(self
            .credentials_ref()?
            .get(&provider)
            .map(|secret| SecretString::new(secret.expose())))
    }

    pub fn with_api_key<R>(
        &self,
        provider: ProviderId,
        f: impl FnOnce(&str) -> R,
    ) -> Result<Option<R>, ProviderError> {
        let credentials = self.credentials_ref()?;
        Ok(credentials.get(&provider).map(|secret| f(secret.expose())))
    }

    pub fn clear(&self, provider: ProviderId) -> Result<bool, ProviderError> {
        Ok(self.credentials_mut()?.remove(&provider).is_some())
    }

    fn credentials_ref(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ProviderId, SecretString>>, ProviderError> {
        self.credentials
            .lock()
            .map_err(|_| ProviderError::unknown("credential store lock poisoned"))
    }

    fn credentials_mut(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<ProviderId, SecretString>>, ProviderError> {
        self.credentials
            .lock()
            .map_err(|_| ProviderError::unknown("credential store lock poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn store_round_trips_api_keys() {
        let store = CredentialStore::new();
        assert!(!store.has_credential(ProviderId::Gemini).expect("query"));

        store
            .set_api_key(ProviderId::Gemini, "live-key-123")
            .expect("set key");
        assert!(store.has_credential(ProviderId::Gemini).expect("query"));

        let seen = store
            .with_api_key(ProviderId::Gemini, str::to_owned)
            .expect("borrow key");
        assert_eq!(seen.as_deref(), Some("live-key-123"));

        assert!(store.clear(ProviderId::Gemini).expect("clear"));
        assert!(!store.has_credential(ProviderId::Gemini).expect("query"));
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let store = CredentialStore::new();
        let err = store
            .set_api_key(ProviderId::Gemini, "")
            .expect_err("empty key must fail");
        assert_eq!(err.kind, ErrorKind::Auth);
    }

    #[test]
    fn secret_debug_output_is_redacted() {
        let secret = SecretString::new("very-secret");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
    }
}
