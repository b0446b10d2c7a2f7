//! Collaborator wiring.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tracing::info;

use parley_clients::{
    HttpLlmClient, HttpRecordStore, HttpSemanticStore, InMemoryRecordStore, InMemorySemanticStore, MockLlmClient,
    RetryConfig, RetryingLlmClient,
};
use parley_core::{ClientError, LlmClient, RecordStore, SemanticStore};
use parley_settings::BackendSettings;

/// The three external services an interview talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub records: Arc<dyn RecordStore>,
    pub semantic: Arc<dyn SemanticStore>,
    pub llm: Arc<dyn LlmClient>,
}

impl Collaborators {
    /// HTTP adapters for every service. The LLM client retries retryable
    /// failures with the configured backoff.
    pub fn http(backend: &BackendSettings) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(backend.request_timeout_ms);
        let token = || backend.api_token.clone().map(SecretString::from);

        let records = HttpRecordStore::new(&backend.record_store_url, timeout, token())?;
        let semantic = HttpSemanticStore::new(&backend.semantic_store_url, timeout, token())?;
        let llm = HttpLlmClient::new(&backend.llm_url, &backend.llm_model, timeout, token())?;
        let retry = RetryConfig {
            max_retries: backend.llm_max_retries,
            base_delay: Duration::from_millis(backend.llm_retry_base_delay_ms),
            ..RetryConfig::default()
        };

        info!(
            record_store = %backend.record_store_url,
            semantic_store = %backend.semantic_store_url,
            llm = %backend.llm_url,
            model = %backend.llm_model,
            authenticated = backend.api_token.is_some(),
            "http collaborators configured"
        );
        Ok(Self {
            records: Arc::new(records),
            semantic: Arc::new(semantic),
            llm: Arc::new(RetryingLlmClient::new(llm, retry)),
        })
    }

    /// In-memory stores and an echoing LLM. Nothing leaves the process.
    pub fn offline() -> Self {
        info!("offline collaborators configured");
        Self {
            records: Arc::new(InMemoryRecordStore::new()),
            semantic: Arc::new(InMemorySemanticStore::new()),
            llm: Arc::new(MockLlmClient::echo()),
        }
    }
}
