//! Settings boundary: credentials and default conversation parameters.
//!
//! Reads are synchronous against cached state; nothing here performs a
//! network round-trip at send time.

use std::sync::Arc;

use mcommon::SamplingParams;
use mprovider::{CredentialStore, ProviderId};

#[derive(Debug, Clone, PartialEq)]
pub struct ChatDefaults {
    pub model: String,
    pub params: SamplingParams,
    pub system_prompt: Option<String>,
    pub title: String,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            params: SamplingParams::default(),
            system_prompt: None,
            title: "New conversation".to_string(),
        }
    }
}

impl ChatDefaults {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

pub trait SettingsProvider: Send + Sync {
    /// Current opaque credential for a provider, if one is configured.
    fn credential(&self, provider: ProviderId) -> Option<String>;

    fn defaults(&self) -> ChatDefaults;
}

/// Settings backed by a shared credential store plus a fixed set of defaults.
pub struct StaticSettings {
    credentials: Arc<CredentialStore>,
    defaults: ChatDefaults,
}

impl StaticSettings {
    pub fn new(credentials: Arc<CredentialStore>, defaults: ChatDefaults) -> Self {
        Self {
            credentials,
            defaults,
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn credential(&self, provider: ProviderId) -> Option<String> {
        self.credentials
            .with_api_key(provider, str::to_owned)
            .ok()
            .flatten()
    }

    fn defaults(&self) -> ChatDefaults {
        self.defaults.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_settings_reflect_the_credential_store() {
        let store = Arc::new(CredentialStore::new());
        let settings = StaticSettings::new(store.clone(), ChatDefaults::default());
        assert_eq!(settings.credential(ProviderId::Gemini), None);

        store
            .set_api_key(ProviderId::Gemini, "key-abc")
            .expect("set key");
        assert_eq!(
            settings.credential(ProviderId::Gemini).as_deref(),
            Some("key-abc")
        );
    }

    #[test]
    fn defaults_builder_overrides_fields() {
        let defaults = ChatDefaults::default()
            .with_model("gemini-2.5-pro")
            .with_title("Scratchpad")
            .with_system_prompt("be terse");

        assert_eq!(defaults.model, "gemini-2.5-pro");
        assert_eq!(defaults.title, "Scratchpad");
        assert_eq!(defaults.system_prompt.as_deref(), Some("be terse"));
    }
}
