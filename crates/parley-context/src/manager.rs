//! Context window manager.
//!
//! Owns the [`ContextState`] of exactly one live session. The message list for
//! each turn is built from that state alone; the only awaited side effects are
//! summarization calls, and semantic memory offloads run on detached tasks.
//!
//! ## Summarization trigger
//!
//! A cycle fires once `summary_interval` rounds have been recorded since the
//! previous successful cycle. It compresses the rounds in
//! `[last_summarized_index, current_round - window_size)`, merges the result
//! into the running summary and only then advances both markers. With the
//! defaults (window 3, interval 5) the first cycle runs at round 5 over
//! rounds `[0, 2)` and the second at round 10 over `[2, 7)`.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use parley_core::{ChatMessage, LlmClient, ScoredFragment, SessionId};
use parley_memory::{OffloadResult, SemanticMemoryBridge};

use crate::constants::{
    INTERVIEWER_PREAMBLE, JD_SECTION_LABEL, RELEVANT_BACKGROUND_LABEL, RELEVANT_HISTORY_LABEL,
    RESUME_SECTION_LABEL, RUNNING_SUMMARY_LABEL,
};
use crate::errors::{ContextError, Result};
use crate::summarizer::Summarizer;
use crate::types::{ContextConfig, ContextState, ConversationRound};

/// Builds the per-turn LLM context of one interview session.
pub struct ContextWindowManager {
    config: ContextConfig,
    summarizer: Summarizer,
    memory: Option<Arc<SemanticMemoryBridge>>,
    state: Option<ContextState>,
    offloads: Vec<JoinHandle<OffloadResult>>,
    /// Outcomes of offloads that finished before the next drain.
    settled: Vec<OffloadResult>,
}

impl ContextWindowManager {
    pub fn new(config: ContextConfig, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            summarizer: Summarizer::new(llm),
            memory: None,
            state: None,
            offloads: Vec::new(),
            settled: Vec::new(),
        }
    }

    /// Attach a semantic memory bridge for offload and enriched context.
    #[must_use]
    pub fn with_memory(mut self, bridge: Arc<SemanticMemoryBridge>) -> Self {
        self.memory = Some(bridge);
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.state.as_ref().map(|s| &s.session_id)
    }

    pub fn current_round(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.current_round)
    }

    /// Sequence the next recorded round will carry.
    pub fn next_sequence(&self) -> u32 {
        self.state.as_ref().map_or(0, ContextState::next_sequence)
    }

    /// Number this window's rounds from `first_sequence`. Only valid before
    /// the first round is recorded.
    pub fn continue_from(&mut self, first_sequence: u32) -> Result<()> {
        let state = self.state.as_mut().ok_or(ContextError::NotInitialized)?;
        if state.current_round > 0 {
            return Err(ContextError::RoundsRecorded {
                rounds: state.current_round,
            });
        }
        state.first_sequence = first_sequence;
        debug!(session_id = %state.session_id, first_sequence, "continuing session");
        Ok(())
    }

    /// A copy of the current state, for inspection.
    pub fn snapshot(&self) -> Option<ContextState> {
        self.state.clone()
    }

    /// Start tracking `session_id`.
    ///
    /// Re-initializing the active session resets it. A different session
    /// must be [`clear`](Self::clear)ed first.
    pub fn initialize(
        &mut self,
        session_id: SessionId,
        resume_text: impl Into<String>,
        jd_text: impl Into<String>,
    ) -> Result<()> {
        if let Some(active) = &self.state {
            if active.session_id != session_id {
                return Err(ContextError::SessionConflict {
                    active: active.session_id.clone(),
                    requested: session_id,
                });
            }
            info!(session_id = %session_id, "re-initializing active session, state reset");
        }

        let state = ContextState::new(session_id, resume_text.into(), jd_text.into());
        info!(
            session_id = %state.session_id,
            resume_chars = state.resume_text.chars().count(),
            jd_chars = state.jd_text.chars().count(),
            "context initialized"
        );

        if let Some(bridge) = &self.memory {
            if tokio::runtime::Handle::try_current().is_ok() {
                let handle = bridge.spawn_store_resume_and_jd(
                    state.session_id.clone(),
                    state.resume_text.clone(),
                    state.jd_text.clone(),
                );
                self.offloads.push(handle);
            } else {
                warn!(session_id = %state.session_id, "no async runtime, resume/JD offload skipped");
            }
        }

        self.state = Some(state);
        Ok(())
    }

    /// Messages for the next LLM call: system, windowed rounds, current question.
    pub fn get_optimized_context(&self, current_question: &str) -> Result<Vec<ChatMessage>> {
        let state = self.state.as_ref().ok_or(ContextError::NotInitialized)?;
        let system = system_prompt(state);
        Ok(self.assemble(state, system, current_question))
    }

    /// Like [`get_optimized_context`](Self::get_optimized_context), with
    /// fragments retrieved from semantic memory appended to the system message.
    ///
    /// Without a bridge, or when retrieval yields nothing, this is exactly the
    /// optimized context.
    pub async fn get_enriched_context(&self, current_question: &str) -> Result<Vec<ChatMessage>> {
        let state = self.state.as_ref().ok_or(ContextError::NotInitialized)?;
        let mut system = system_prompt(state);

        if let Some(bridge) = &self.memory {
            let (history, background) = tokio::join!(
                bridge.retrieve_relevant_conversations(&state.session_id, current_question, None),
                bridge.retrieve_relevant_resume_jd(&state.session_id, current_question, None),
            );
            debug!(
                session_id = %state.session_id,
                history = history.len(),
                background = background.len(),
                "retrieved memory fragments"
            );
            push_fragments(&mut system, RELEVANT_HISTORY_LABEL, &history);
            push_fragments(&mut system, RELEVANT_BACKGROUND_LABEL, &background);
        }

        Ok(self.assemble(state, system, current_question))
    }

    /// Append a finished round and run whatever summarization is due.
    ///
    /// Summarization and offload failures are logged; the round is recorded
    /// regardless.
    pub async fn record_conversation(
        &mut self,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<()> {
        let state = self.state.as_mut().ok_or(ContextError::NotInitialized)?;
        let question = question.into();
        let answer = answer.into();

        let sequence = state.next_sequence();
        if let Some(bridge) = &self.memory {
            let handle = bridge.spawn_store_conversation(
                state.session_id.clone(),
                sequence,
                question.clone(),
                answer.clone(),
            );
            self.offloads.push(handle);
        }

        state.rounds.push(ConversationRound {
            sequence,
            question,
            answer,
            timestamp: Utc::now(),
        });
        state.current_round += 1;
        debug!(session_id = %state.session_id, sequence, current_round = state.current_round, "round recorded");

        if !state.documents_summarized {
            summarize_documents(&self.summarizer, &self.config, state).await;
        }
        run_summary_cycle(&self.summarizer, &self.config, state).await;
        self.reap_offloads().await;
        Ok(())
    }

    /// Drop all state. Idempotent.
    ///
    /// Offloads still in flight are detached and keep running; their
    /// outcomes are no longer reported.
    pub fn clear(&mut self) {
        if let Some(state) = self.state.take() {
            info!(session_id = %state.session_id, rounds = state.rounds.len(), "context cleared");
        }
        if !self.offloads.is_empty() {
            debug!(pending = self.offloads.len(), "detaching pending offloads");
        }
        self.offloads.clear();
        self.settled.clear();
    }

    /// Offload tasks spawned but not yet collected.
    pub fn pending_offloads(&self) -> usize {
        self.offloads.len()
    }

    /// Wait for every pending offload and return all outcomes since the last
    /// drain, in the order they were collected.
    pub async fn drain_offloads(&mut self) -> Vec<OffloadResult> {
        let mut results = std::mem::take(&mut self.settled);
        for handle in std::mem::take(&mut self.offloads) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "offload task did not complete"),
            }
        }
        results
    }

    /// Collect the offloads that already finished.
    async fn reap_offloads(&mut self) {
        let (finished, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.offloads).into_iter().partition(JoinHandle::is_finished);
        self.offloads = pending;
        for handle in finished {
            match handle.await {
                Ok(result) => self.settled.push(result),
                Err(e) => warn!(error = %e, "offload task did not complete"),
            }
        }
    }

    fn assemble(&self, state: &ContextState, system: String, current_question: &str) -> Vec<ChatMessage> {
        let window = state.window(self.config.window_size);
        let mut messages = Vec::with_capacity(2 + window.len() * 2);
        messages.push(ChatMessage::system(system));
        for round in window {
            messages.push(ChatMessage::user(round.question.clone()));
            messages.push(ChatMessage::assistant(round.answer.clone()));
        }
        messages.push(ChatMessage::user(current_question));
        messages
    }
}

fn system_prompt(state: &ContextState) -> String {
    let mut text = String::from(INTERVIEWER_PREAMBLE);
    push_section(&mut text, JD_SECTION_LABEL, state.jd_for_prompt());
    push_section(&mut text, RESUME_SECTION_LABEL, state.resume_for_prompt());
    if let Some(summary) = &state.running_summary {
        push_section(&mut text, RUNNING_SUMMARY_LABEL, summary);
    }
    text
}

fn push_section(text: &mut String, label: &str, body: &str) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }
    let _ = write!(text, "\n\n{label}\n{body}");
}

fn push_fragments(text: &mut String, label: &str, fragments: &[ScoredFragment]) {
    if fragments.is_empty() {
        return;
    }
    let _ = write!(text, "\n\n{label}");
    for fragment in fragments {
        let _ = write!(text, "\n- {}", fragment.content);
    }
}

/// One-time resume and job description summaries. Each falls back to the
/// raw text independently.
async fn summarize_documents(summarizer: &Summarizer, config: &ContextConfig, state: &mut ContextState) {
    state.documents_summarized = true;

    if !state.resume_text.trim().is_empty() {
        match summarizer
            .summarize_resume(&state.resume_text, config.resume_summary_chars)
            .await
        {
            Ok(summary) => state.resume_summary = Some(summary),
            Err(e) => warn!(session_id = %state.session_id, error = %e, "resume summary failed, keeping raw text"),
        }
    }
    if !state.jd_text.trim().is_empty() {
        match summarizer.summarize_jd(&state.jd_text, config.jd_summary_chars).await {
            Ok(summary) => state.jd_summary = Some(summary),
            Err(e) => warn!(session_id = %state.session_id, error = %e, "JD summary failed, keeping raw text"),
        }
    }
}

async fn run_summary_cycle(summarizer: &Summarizer, config: &ContextConfig, state: &mut ContextState) {
    let elapsed = state.current_round - state.last_summary_round;
    if elapsed < config.summary_interval {
        return;
    }

    let start = state.last_summarized_index;
    let end = state.current_round.saturating_sub(config.window_size);
    if start >= end {
        trace!(session_id = %state.session_id, start, end, "no rounds outside the window to summarize");
        return;
    }

    info!(
        session_id = %state.session_id,
        from = start,
        to = end,
        current_round = state.current_round,
        "summarizing rounds outside the window"
    );
    let target = config.conversation_summary_chars;

    let fresh = match summarizer.summarize_rounds(&state.rounds[start..end], target).await {
        Ok(summary) => summary,
        Err(e) => {
            warn!(session_id = %state.session_id, error = %e, "conversation summary failed, will retry");
            return;
        }
    };

    let merged = match &state.running_summary {
        Some(existing) => match summarizer.merge(existing, &fresh, target).await {
            Ok(merged) => merged,
            Err(e) => {
                warn!(session_id = %state.session_id, error = %e, "summary merge failed, will retry");
                return;
            }
        },
        None => fresh,
    };

    state.running_summary = Some(merged);
    state.last_summarized_index = end;
    state.last_summary_round = state.current_round;
    trace!(
        session_id = %state.session_id,
        last_summarized_index = end,
        "summary cycle complete"
    );
}
