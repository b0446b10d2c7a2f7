//! Interview runtime.
//!
//! One runtime per window. It owns the context window manager and the session
//! tracker and shares the semantic memory bridge with the manager's offload
//! tasks.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use parley_context::{ContextConfig, ContextWindowManager};
use parley_core::{ClientError, LlmClient, QuestionPhase, RecordId, SessionId};
use parley_memory::{MemoryConfig, OffloadResult, SemanticMemoryBridge};
use parley_session::{QuestionTurn, SessionError, SessionSignalBus, SessionStateTracker};
use parley_settings::ParleySettings;

use crate::collaborators::Collaborators;
use crate::errors::{Result, RuntimeError};

/// Instruction appended as the current turn when asking for the next question.
const NEXT_QUESTION_PROMPT: &str = "请提出第{number}个面试问题（共{total}个）。只输出问题本身，不要附加解释。";

/// Instruction used when the total number of questions is unknown.
const OPEN_QUESTION_PROMPT: &str = "请提出第{number}个面试问题。只输出问题本身，不要附加解释。";

fn question_prompt(sequence: u32, total: u32) -> String {
    let number = (sequence + 1).to_string();
    if total == 0 {
        OPEN_QUESTION_PROMPT.replace("{number}", &number)
    } else {
        NEXT_QUESTION_PROMPT
            .replace("{number}", &number)
            .replace("{total}", &total.to_string())
    }
}

/// A question ready to be shown to the candidate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub sequence: u32,
    pub record_id: RecordId,
    pub text: String,
}

impl From<&QuestionTurn> for GeneratedQuestion {
    fn from(turn: &QuestionTurn) -> Self {
        Self {
            sequence: turn.sequence,
            record_id: turn.record_id.clone(),
            text: turn.question_text.clone(),
        }
    }
}

/// What [`InterviewRuntime::finish`] leaves behind.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSummary {
    pub session_id: SessionId,
    pub turns: Vec<QuestionTurn>,
    /// Outcomes of every semantic memory write of the session.
    pub offloads: Vec<OffloadResult>,
    /// `Some` when session memory deletion was attempted.
    pub memory_deleted: Option<bool>,
}

pub struct InterviewRuntime {
    context: ContextWindowManager,
    tracker: SessionStateTracker,
    memory: Arc<SemanticMemoryBridge>,
    llm: Arc<dyn LlmClient>,
    delete_on_finish: bool,
}

impl InterviewRuntime {
    pub fn new(settings: &ParleySettings, collaborators: Collaborators, signal: SessionSignalBus) -> Self {
        let memory = Arc::new(SemanticMemoryBridge::new(
            collaborators.semantic,
            MemoryConfig::from(&settings.memory),
        ));
        let context = ContextWindowManager::new(ContextConfig::from(&settings.context), Arc::clone(&collaborators.llm))
            .with_memory(Arc::clone(&memory));
        Self {
            context,
            tracker: SessionStateTracker::new(collaborators.records, signal),
            memory,
            llm: collaborators.llm,
            delete_on_finish: settings.memory.delete_on_finish,
        }
    }

    pub fn context(&self) -> &ContextWindowManager {
        &self.context
    }

    pub fn tracker(&self) -> &SessionStateTracker {
        &self.tracker
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.context.session_id()
    }

    /// Planned number of questions, 0 when unknown.
    pub fn total_questions(&self) -> u32 {
        self.tracker.session().map_or(0, |s| s.total_questions)
    }

    /// Whether every planned question has been answered.
    pub fn all_answered(&self) -> bool {
        let total = self.total_questions();
        total > 0 && self.context.next_sequence() >= total
    }

    /// Begin a new interview.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub fn start(
        &mut self,
        session_id: SessionId,
        resume_text: impl Into<String>,
        jd_text: impl Into<String>,
        total_questions: u32,
    ) -> Result<()> {
        self.context.initialize(session_id.clone(), resume_text, jd_text)?;
        self.tracker.initialize_session(session_id, total_questions);
        Ok(())
    }

    /// Join the session another window announced on the signal.
    ///
    /// Turns that window already answered are adopted and this window's
    /// rounds continue after them. Records it created but left unanswered are
    /// adopted as the questions are requested again.
    pub async fn resume_from_signal(
        &mut self,
        resume_text: impl Into<String>,
        jd_text: impl Into<String>,
        total_questions: u32,
    ) -> Result<SessionId> {
        let session_id = self.tracker.signal().session_id().ok_or(RuntimeError::NoActiveSession)?;
        self.start(session_id.clone(), resume_text, jd_text, total_questions)?;
        let answered = self.tracker.recover_answered().await?;
        self.context.continue_from(answered)?;
        info!(session_id = %session_id, answered, "resumed session from signal");
        Ok(session_id)
    }

    /// Produce the question for `sequence` and make sure its record exists.
    ///
    /// A question already generated in this window is returned as is, without
    /// another LLM call.
    pub async fn next_question(&mut self, sequence: u32) -> Result<GeneratedQuestion> {
        let session_id = self.session_id().cloned().ok_or(RuntimeError::NoActiveSession)?;
        let total = self.total_questions();
        if total > 0 && sequence >= total {
            return Err(RuntimeError::SequenceOutOfRange {
                requested: sequence,
                total,
            });
        }

        if let Some(turn) = self.tracker.get_question_state(sequence) {
            debug!(session_id = %session_id, sequence, "question already generated");
            return Ok(GeneratedQuestion::from(turn));
        }

        let messages = self.context.get_enriched_context(&question_prompt(sequence, total)).await?;
        let text = self.llm.complete(&messages).await?.trim().to_string();
        if text.is_empty() {
            return Err(ClientError::InvalidResponse("empty question".into()).into());
        }

        let record_id = self.tracker.create_question_record(sequence, &text).await?;
        // An adopted record keeps the text the other window asked.
        let question = self
            .tracker
            .get_question_state(sequence)
            .map_or_else(|| GeneratedQuestion { sequence, record_id, text }, GeneratedQuestion::from);
        info!(session_id = %session_id, sequence, record_id = %question.record_id, "question ready");
        Ok(question)
    }

    /// Persist the candidate's answer and feed the round into the context.
    ///
    /// Each question is answered once, in sequence order, so the turn being
    /// answered is always the context's next round.
    pub async fn submit_answer(&mut self, sequence: u32, answer: &str) -> Result<()> {
        let turn = self
            .tracker
            .get_question_state(sequence)
            .ok_or(SessionError::UnknownSequence(sequence))?;
        if turn.phase == QuestionPhase::Completed {
            return Err(RuntimeError::AlreadyAnswered(sequence));
        }
        let expected = self.context.next_sequence();
        if sequence != expected {
            return Err(RuntimeError::OutOfOrder {
                expected,
                requested: sequence,
            });
        }
        let question = turn.question_text.clone();

        self.tracker.record_answer(sequence, answer, None).await?;
        self.tracker.mark_question_complete(sequence)?;
        self.context.record_conversation(question, answer).await?;
        debug!(sequence, current_round = self.context.current_round(), "answer submitted");
        Ok(())
    }

    /// Complete the interview and release its state.
    ///
    /// Pending memory writes are awaited first so their outcomes appear in the
    /// summary and a configured deletion does not race them.
    pub async fn finish(&mut self) -> Result<InterviewSummary> {
        let session_id = self.session_id().cloned().ok_or(RuntimeError::NoActiveSession)?;
        self.tracker.mark_interview_complete()?;
        let turns = self.tracker.get_all_question_states();

        let offloads = self.context.drain_offloads().await;
        let failed = offloads.iter().filter(|o| !o.stored && o.documents > 0).count();
        if failed > 0 {
            warn!(session_id = %session_id, failed, "some memory writes failed during the session");
        }

        let memory_deleted = if self.delete_on_finish {
            Some(self.memory.delete_session_data(&session_id).await)
        } else {
            None
        };

        self.context.clear();
        self.tracker.reset_state();
        info!(session_id = %session_id, turns = turns.len(), "interview finished");
        Ok(InterviewSummary {
            session_id,
            turns,
            offloads,
            memory_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use parley_clients::{InMemoryRecordStore, InMemorySemanticStore, MockLlmClient};
    use parley_memory::conversation_collection;

    use super::*;

    struct Harness {
        records: Arc<InMemoryRecordStore>,
        semantic: Arc<InMemorySemanticStore>,
        llm: Arc<MockLlmClient>,
        signal: SessionSignalBus,
    }

    impl Harness {
        fn new(llm: MockLlmClient) -> Self {
            Self {
                records: Arc::new(InMemoryRecordStore::new()),
                semantic: Arc::new(InMemorySemanticStore::new()),
                llm: Arc::new(llm),
                signal: SessionSignalBus::new(),
            }
        }

        fn runtime(&self, settings: &ParleySettings) -> InterviewRuntime {
            let collaborators = Collaborators {
                records: self.records.clone(),
                semantic: self.semantic.clone(),
                llm: self.llm.clone(),
            };
            InterviewRuntime::new(settings, collaborators, self.signal.clone())
        }
    }

    const RESUME: &str = "Five years of Rust. Built a storage engine.";
    const JD: &str = "Backend engineer, async Rust, distributed systems.";

    #[test]
    fn prompt_numbers_from_one() {
        assert!(question_prompt(0, 5).contains("第1个"));
        assert!(question_prompt(0, 5).contains("共5个"));
        assert!(!question_prompt(2, 0).contains("共"));
    }

    #[tokio::test]
    async fn full_interview() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        let session = SessionId::new();
        runtime.start(session.clone(), RESUME, JD, 3).unwrap();

        for sequence in 0..3 {
            let question = runtime.next_question(sequence).await.unwrap();
            assert_eq!(question.sequence, sequence);
            assert!(!question.text.is_empty());
            runtime.submit_answer(sequence, &format!("answer {sequence}")).await.unwrap();
        }
        assert!(runtime.all_answered());
        assert_eq!(runtime.context().current_round(), 3);

        let summary = runtime.finish().await.unwrap();
        assert_eq!(summary.session_id, session);
        assert_eq!(summary.turns.len(), 3);
        assert!(summary.turns.iter().all(|t| t.phase == QuestionPhase::Completed));
        // resume/JD plus one write per round
        assert_eq!(summary.offloads.len(), 4);
        assert!(summary.offloads.iter().all(|o| o.stored));
        assert_eq!(summary.memory_deleted, None);

        let stored = harness.records.records_for(&session);
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[1].user_answer.as_deref(), Some("answer 1"));
        assert_eq!(harness.semantic.documents(&conversation_collection(&session)).len(), 3);

        assert!(runtime.session_id().is_none());
        assert_eq!(harness.signal.session_id(), None);
    }

    #[tokio::test]
    async fn repeated_request_reuses_question() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        runtime.start(SessionId::new(), RESUME, JD, 2).unwrap();

        let first = runtime.next_question(0).await.unwrap();
        let again = runtime.next_question(0).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(harness.llm.call_count(), 1);
        assert_eq!(harness.records.create_calls(), 1);
    }

    #[tokio::test]
    async fn sequence_bounds_and_order() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        assert_matches!(runtime.next_question(0).await, Err(RuntimeError::NoActiveSession));

        runtime.start(SessionId::new(), RESUME, JD, 2).unwrap();
        assert_matches!(
            runtime.next_question(2).await,
            Err(RuntimeError::SequenceOutOfRange { requested: 2, total: 2 })
        );
        assert_matches!(
            runtime.submit_answer(0, "too early").await,
            Err(RuntimeError::Session(SessionError::UnknownSequence(0)))
        );
    }

    #[tokio::test]
    async fn llm_failure_creates_nothing() {
        let harness = Harness::new(MockLlmClient::failing(ClientError::Unavailable("router down".into())));
        let mut runtime = harness.runtime(&ParleySettings::default());
        runtime.start(SessionId::new(), RESUME, JD, 2).unwrap();

        let err = runtime.next_question(0).await.unwrap_err();
        assert_matches!(err, RuntimeError::Llm(ClientError::Unavailable(_)));
        assert!(err.is_recoverable());
        assert_eq!(harness.records.create_calls(), 0);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let harness = Harness::new(MockLlmClient::always("   "));
        let mut runtime = harness.runtime(&ParleySettings::default());
        runtime.start(SessionId::new(), RESUME, JD, 1).unwrap();
        assert_matches!(
            runtime.next_question(0).await,
            Err(RuntimeError::Llm(ClientError::InvalidResponse(_)))
        );
    }

    #[tokio::test]
    async fn second_window_adopts_records() {
        let harness = Harness::new(MockLlmClient::echo());
        let settings = ParleySettings::default();
        let session = SessionId::new();

        let mut first = harness.runtime(&settings);
        first.start(session.clone(), RESUME, JD, 3).unwrap();
        let asked = first.next_question(0).await.unwrap();

        let mut second = harness.runtime(&settings);
        let joined = second.resume_from_signal(RESUME, JD, 3).await.unwrap();
        assert_eq!(joined, session);
        let adopted = second.next_question(0).await.unwrap();
        assert_eq!(adopted.record_id, asked.record_id);
        assert_eq!(adopted.text, asked.text);
        assert_eq!(harness.records.records_for(&session).len(), 1);

        second.submit_answer(0, "from the second window").await.unwrap();
        let stored = &harness.records.records_for(&session)[0];
        assert_eq!(stored.user_answer.as_deref(), Some("from the second window"));
    }

    #[tokio::test]
    async fn resume_without_signal_fails() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        assert_matches!(
            runtime.resume_from_signal(RESUME, JD, 1).await,
            Err(RuntimeError::NoActiveSession)
        );
    }

    #[tokio::test]
    async fn second_answer_to_a_question_is_rejected() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        let session = SessionId::new();
        runtime.start(session.clone(), RESUME, JD, 2).unwrap();
        let _ = runtime.next_question(0).await.unwrap();
        runtime.submit_answer(0, "first").await.unwrap();

        assert_matches!(
            runtime.submit_answer(0, "second").await,
            Err(RuntimeError::AlreadyAnswered(0))
        );
        let state = runtime.context().snapshot().unwrap();
        assert_eq!(state.current_round, 1);
        assert_eq!(state.rounds.len(), 1);
        assert_eq!(state.rounds[0].answer, "first");
        let stored = harness.records.records_for(&session);
        assert_eq!(stored[0].user_answer.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn answers_are_taken_in_order() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut runtime = harness.runtime(&ParleySettings::default());
        let session = SessionId::new();
        runtime.start(session.clone(), RESUME, JD, 2).unwrap();
        let q0 = runtime.next_question(0).await.unwrap();
        let _ = runtime.next_question(1).await.unwrap();

        assert_matches!(
            runtime.submit_answer(1, "ans1").await,
            Err(RuntimeError::OutOfOrder { expected: 0, requested: 1 })
        );
        assert_eq!(runtime.context().current_round(), 0);
        assert!(harness.records.records_for(&session).iter().all(|r| r.user_answer.is_none()));

        runtime.submit_answer(0, "ans0").await.unwrap();
        runtime.submit_answer(1, "ans1").await.unwrap();
        let state = runtime.context().snapshot().unwrap();
        assert_eq!(state.rounds[0].sequence, 0);
        assert_eq!(state.rounds[0].question, q0.text);
        assert_eq!(state.rounds[1].sequence, 1);
        assert_eq!(state.rounds[1].answer, "ans1");
    }

    #[tokio::test]
    async fn resumed_window_continues_after_answered_turns() {
        let harness = Harness::new(MockLlmClient::echo());
        let settings = ParleySettings::default();
        let session = SessionId::new();

        let mut first = harness.runtime(&settings);
        first.start(session.clone(), RESUME, JD, 3).unwrap();
        for sequence in 0..2 {
            let _ = first.next_question(sequence).await.unwrap();
            first.submit_answer(sequence, &format!("answer {sequence}")).await.unwrap();
        }
        drop(first);

        let mut second = harness.runtime(&settings);
        let _ = second.resume_from_signal(RESUME, JD, 3).await.unwrap();
        assert_eq!(second.context().next_sequence(), 2);
        assert_matches!(
            second.submit_answer(1, "again").await,
            Err(RuntimeError::AlreadyAnswered(1))
        );

        let _ = second.next_question(2).await.unwrap();
        second.submit_answer(2, "answer 2").await.unwrap();
        assert!(second.all_answered());
        let state = second.context().snapshot().unwrap();
        assert_eq!(state.rounds.len(), 1);
        assert_eq!(state.rounds[0].sequence, 2);
        assert_eq!(harness.records.records_for(&session).len(), 3);
    }

    #[tokio::test]
    async fn finish_deletes_memory_when_configured() {
        let harness = Harness::new(MockLlmClient::echo());
        let mut settings = ParleySettings::default();
        settings.memory.delete_on_finish = true;
        let mut runtime = harness.runtime(&settings);
        let session = SessionId::new();
        runtime.start(session.clone(), RESUME, JD, 1).unwrap();
        let _ = runtime.next_question(0).await.unwrap();
        runtime.submit_answer(0, "done").await.unwrap();

        let summary = runtime.finish().await.unwrap();
        assert_eq!(summary.memory_deleted, Some(true));
        assert!(!harness.semantic.has_collection(&conversation_collection(&session)));
    }

    #[tokio::test]
    async fn semantic_outage_does_not_block_interview() {
        let harness = Harness::new(MockLlmClient::echo());
        harness.semantic.set_fail_ingest(true);
        harness.semantic.set_fail_query(true);
        let mut runtime = harness.runtime(&ParleySettings::default());
        runtime.start(SessionId::new(), RESUME, JD, 1).unwrap();

        let _ = runtime.next_question(0).await.unwrap();
        runtime.submit_answer(0, "still works").await.unwrap();
        let summary = runtime.finish().await.unwrap();
        assert_eq!(summary.turns.len(), 1);
        assert!(summary.offloads.iter().all(|o| !o.stored));
    }
}
