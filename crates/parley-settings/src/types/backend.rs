//! Collaborator endpoint settings.

use serde::{Deserialize, Serialize};

/// Where the record store, semantic store and LLM router live.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendSettings {
    /// Base URL of the record store service.
    pub record_store_url: String,
    /// Base URL of the semantic store (RAG) service.
    pub semantic_store_url: String,
    /// Base URL of the LLM router.
    pub llm_url: String,
    /// Model name forwarded to the LLM router.
    pub llm_model: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Retries for retryable LLM failures.
    pub llm_max_retries: u32,
    /// Base backoff delay in milliseconds.
    pub llm_retry_base_delay_ms: u64,
    /// Bearer token sent to every collaborator. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            record_store_url: "http://127.0.0.1:8000/api".to_string(),
            semantic_store_url: "http://127.0.0.1:8001/api".to_string(),
            llm_url: "http://127.0.0.1:8002/v1".to_string(),
            llm_model: "deepseek-chat".to_string(),
            request_timeout_ms: 60_000,
            llm_max_retries: 2,
            llm_retry_base_delay_ms: 500,
            api_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_read_but_never_written() {
        let settings: BackendSettings =
            serde_json::from_str(r#"{"apiToken": "secret"}"#).unwrap();
        assert_eq!(settings.api_token.as_deref(), Some("secret"));
        let json = serde_json::to_string(&settings).unwrap();
        assert!(!json.contains("secret"));
    }
}
