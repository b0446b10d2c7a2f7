//! LLM router over HTTP (chat-completions shape).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_core::{ChatMessage, ClientError, LlmClient};

use crate::http::{HttpEndpoint, read_json};

/// [`LlmClient`] that posts to `{base}/chat/completions`.
#[derive(Debug)]
pub struct HttpLlmClient {
    endpoint: HttpEndpoint,
    model: String,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpLlmClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        token: Option<SecretString>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: HttpEndpoint::new(base_url, timeout, token)?,
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
        };
        let response = self
            .endpoint
            .send(
                self.endpoint
                    .request(Method::POST, "chat/completions")
                    .json(&request),
            )
            .await?;
        let parsed: CompletionResponse = read_json(response).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClientError::InvalidResponse("completion has no content".into()))?;
        debug!(model = %self.model, chars = content.chars().count(), "completion received");
        Ok(content)
    }
}
