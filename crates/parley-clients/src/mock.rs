//! Scripted LLM client for deterministic tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use parley_core::{ChatMessage, ClientError, LlmClient};

/// Requests kept by [`MockLlmClient::echo`], which backs long offline runs.
const ECHO_HISTORY: usize = 16;

type Responder = Box<dyn Fn(&[ChatMessage]) -> Result<String, ClientError> + Send + Sync>;

/// Pre-programmed response of a [`MockLlmClient`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    Text(String),
    Error(ClientError),
    /// Wait, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// LLM client that plays back a script, then falls back to a responder.
///
/// Requests are recorded and can be inspected with [`calls`](Self::calls).
/// With a history limit only the most recent ones are kept; the call count
/// always covers every request.
pub struct MockLlmClient {
    script: Mutex<VecDeque<MockResponse>>,
    fallback: Option<Responder>,
    calls: Mutex<VecDeque<Vec<ChatMessage>>>,
    call_count: AtomicUsize,
    history_limit: Option<usize>,
}

impl MockLlmClient {
    /// Play back `responses` in order; extra calls fail.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            fallback: None,
            calls: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            history_limit: None,
        }
    }

    /// Answer every call through `responder`.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> Result<String, ClientError> + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(Box::new(responder)),
            calls: Mutex::new(VecDeque::new()),
            call_count: AtomicUsize::new(0),
            history_limit: None,
        }
    }

    /// Keep only the `limit` most recent requests.
    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Always answer with `text`.
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_responder(move |_| Ok(text.clone()))
    }

    /// Always fail with `error`.
    pub fn failing(error: ClientError) -> Self {
        Self::with_responder(move |_| Err(error.clone()))
    }

    /// Reply with a short echo of the last user message.
    pub fn echo() -> Self {
        Self::with_responder(|messages| {
            let last = messages
                .iter()
                .rev()
                .find(|m| !m.is_system())
                .map_or("", |m| m.content.as_str());
            let excerpt: String = last.chars().take(80).collect();
            Ok(format!("[offline] {excerpt}"))
        })
        .with_history_limit(ECHO_HISTORY)
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Recorded requests, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().iter().cloned().collect()
    }

    pub fn last_call(&self) -> Option<Vec<ChatMessage>> {
        self.calls.lock().back().cloned()
    }

    fn capture(&self, messages: &[ChatMessage]) -> usize {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        if self.history_limit == Some(0) {
            return idx;
        }
        let mut calls = self.calls.lock();
        calls.push_back(messages.to_vec());
        if let Some(limit) = self.history_limit {
            while calls.len() > limit {
                let _ = calls.pop_front();
            }
        }
        idx
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError> {
        let idx = self.capture(messages);

        let scripted = self.script.lock().pop_front();
        let mut current = match scripted {
            Some(response) => response,
            None => {
                return match &self.fallback {
                    Some(responder) => responder(messages),
                    None => Err(ClientError::InvalidRequest(format!(
                        "MockLlmClient: no response configured for call {idx}"
                    ))),
                };
            }
        };

        loop {
            match current {
                MockResponse::Text(text) => return Ok(text),
                MockResponse::Error(e) => return Err(e),
                MockResponse::Delay(duration, inner) => {
                    tokio::time::sleep(duration).await;
                    current = *inner;
                }
            }
        }
    }
}
