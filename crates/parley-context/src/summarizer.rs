//! LLM-backed summarization of rounds, running summaries and documents.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::trace;

use parley_core::{ChatMessage, ClientError, LlmClient};

use crate::constants::{
    CONVERSATION_SUMMARY_INSTRUCTION, EXISTING_SUMMARY_LABEL, JD_SUMMARY_INSTRUCTION,
    MERGE_SUMMARY_INSTRUCTION, NEW_SUMMARY_LABEL, RESUME_SUMMARY_INSTRUCTION, with_target,
};
use crate::types::ConversationRound;

/// Serialize rounds as `Q{n}: …\nA{n}: …` blocks, `n = sequence + 1`.
pub fn serialize_rounds(rounds: &[ConversationRound]) -> String {
    let mut out = String::new();
    for (i, round) in rounds.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let n = u64::from(round.sequence) + 1;
        let _ = write!(out, "Q{n}: {}\nA{n}: {}", round.question, round.answer);
    }
    out
}

/// Thin wrapper that turns summarization requests into LLM calls.
#[derive(Clone)]
pub struct Summarizer {
    llm: Arc<dyn LlmClient>,
}

impl Summarizer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Compress `rounds` to roughly `target` characters.
    pub async fn summarize_rounds(
        &self,
        rounds: &[ConversationRound],
        target: usize,
    ) -> Result<String, ClientError> {
        let transcript = serialize_rounds(rounds);
        trace!(rounds = rounds.len(), chars = transcript.chars().count(), "summarizing rounds");
        self.ask(with_target(CONVERSATION_SUMMARY_INSTRUCTION, target), transcript)
            .await
    }

    /// Merge an existing running summary with a newer one.
    pub async fn merge(
        &self,
        existing: &str,
        newer: &str,
        target: usize,
    ) -> Result<String, ClientError> {
        let body = format!("{EXISTING_SUMMARY_LABEL}\n{existing}\n\n{NEW_SUMMARY_LABEL}\n{newer}");
        self.ask(with_target(MERGE_SUMMARY_INSTRUCTION, target), body)
            .await
    }

    pub async fn summarize_resume(&self, text: &str, target: usize) -> Result<String, ClientError> {
        self.ask(with_target(RESUME_SUMMARY_INSTRUCTION, target), text.to_string())
            .await
    }

    pub async fn summarize_jd(&self, text: &str, target: usize) -> Result<String, ClientError> {
        self.ask(with_target(JD_SUMMARY_INSTRUCTION, target), text.to_string())
            .await
    }

    async fn ask(&self, instruction: String, body: String) -> Result<String, ClientError> {
        let messages = [ChatMessage::system(instruction), ChatMessage::user(body)];
        let text = self.llm.complete(&messages).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::InvalidResponse("summary is empty".into()));
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use parley_clients::{MockLlmClient, MockResponse};
    use parley_core::Role;

    use super::*;

    fn round(sequence: u32, q: &str, a: &str) -> ConversationRound {
        ConversationRound {
            sequence,
            question: q.into(),
            answer: a.into(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn rounds_numbered_from_one() {
        let text = serialize_rounds(&[round(0, "什么是借用？", "引用"), round(1, "生命周期？", "作用域")]);
        assert_eq!(text, "Q1: 什么是借用？\nA1: 引用\n\nQ2: 生命周期？\nA2: 作用域");
    }

    #[test]
    fn empty_rounds_serialize_empty() {
        assert_eq!(serialize_rounds(&[]), "");
    }

    #[tokio::test]
    async fn summarize_sends_instruction_and_transcript() {
        let mock = Arc::new(MockLlmClient::new(vec![MockResponse::text("  摘要  ")]));
        let summarizer = Summarizer::new(mock.clone());

        let summary = summarizer
            .summarize_rounds(&[round(2, "q", "a")], 500)
            .await
            .unwrap();
        assert_eq!(summary, "摘要");

        let call = mock.last_call().unwrap();
        assert_eq!(call[0].role, Role::System);
        assert!(call[0].content.contains("500"));
        assert_eq!(call[1].content, "Q3: q\nA3: a");
    }

    #[tokio::test]
    async fn merge_includes_both_summaries() {
        let mock = Arc::new(MockLlmClient::always("merged"));
        let summarizer = Summarizer::new(mock.clone());
        assert_eq!(summarizer.merge("old", "new", 500).await.unwrap(), "merged");
        let body = &mock.last_call().unwrap()[1].content;
        assert!(body.contains("old"));
        assert!(body.contains("new"));
    }

    #[tokio::test]
    async fn blank_completion_is_error() {
        let mock = Arc::new(MockLlmClient::always("   "));
        let summarizer = Summarizer::new(mock);
        assert!(summarizer.summarize_jd("JD", 100).await.is_err());
    }
}
