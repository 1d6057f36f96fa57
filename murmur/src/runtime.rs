//! Runtime wiring helpers for orchestrator construction.

use std::sync::Arc;
use std::time::Duration;

use mchat::{
    ChatDefaults, ChatOrchestrator, ConversationRepository, InMemoryConversationRepository,
};
use mprovider::CredentialStore;

#[cfg(feature = "adapter-gemini")]
use mchat::StaticSettings;
#[cfg(feature = "adapter-gemini")]
use mobserve::TracingRetryHooks;
#[cfg(feature = "adapter-gemini")]
use mprovider::ProviderError;
#[cfg(feature = "adapter-gemini")]
use mprovider::adapters::gemini::{GeminiHttpTransport, GeminiProvider};
#[cfg(feature = "adapter-gemini")]
use reqwest::Client;

#[derive(Clone)]
pub struct RuntimeBundle {
    pub credentials: Arc<CredentialStore>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub repository: Arc<dyn ConversationRepository>,
}

impl std::fmt::Debug for RuntimeBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBundle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: String,
    pub defaults: ChatDefaults,
    pub timeout: Duration,
    pub base_url: Option<String>,
}

impl RuntimeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            defaults: ChatDefaults::default(),
            timeout: Duration::from_secs(90),
            base_url: None,
        }
    }

    pub fn defaults(mut self, defaults: ChatDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

pub fn build_runtime_config(api_key: impl Into<String>) -> RuntimeConfig {
    RuntimeConfig::new(api_key)
}

pub fn in_memory_repository() -> Arc<dyn ConversationRepository> {
    Arc::new(InMemoryConversationRepository::new())
}

#[cfg(feature = "adapter-gemini")]
pub fn build_runtime(api_key: impl Into<String>) -> Result<RuntimeBundle, ProviderError> {
    build_runtime_with(RuntimeConfig::new(api_key), in_memory_repository())
}

#[cfg(feature = "adapter-gemini")]
pub fn build_runtime_with(
    config: RuntimeConfig,
    repository: Arc<dyn ConversationRepository>,
) -> Result<RuntimeBundle, ProviderError> {
    let api_key = config.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ProviderError::auth("provider API key must not be empty"));
    }

    let credentials = Arc::new(CredentialStore::new());
    credentials.set_gemini_api_key(api_key)?;

    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::network(err.to_string()))?;

    let mut transport = GeminiHttpTransport::new(http);
    if let Some(base_url) = config.base_url {
        transport = transport.with_base_url(base_url);
    }

    let provider = Arc::new(GeminiProvider::new(
        Arc::clone(&credentials),
        Arc::new(transport),
    ));
    let settings = Arc::new(StaticSettings::new(
        Arc::clone(&credentials),
        config.defaults,
    ));

    let orchestrator = ChatOrchestrator::builder(provider, Arc::clone(&repository), settings)
        .hooks(Arc::new(TracingRetryHooks))
        .build();

    Ok(RuntimeBundle {
        credentials,
        orchestrator: Arc::new(orchestrator),
        repository,
    })
}
