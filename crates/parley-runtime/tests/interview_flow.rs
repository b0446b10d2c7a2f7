//! End-to-end interview runs against in-memory collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parley_clients::{InMemoryRecordStore, InMemorySemanticStore, MockLlmClient};
use parley_context::constants::{RELEVANT_HISTORY_LABEL, RUNNING_SUMMARY_LABEL};
use parley_core::{ChatMessage, QuestionPhase, SessionId};
use parley_memory::{conversation_collection, resume_jd_collection};
use parley_runtime::{Collaborators, InterviewRuntime};
use parley_session::SessionSignalBus;
use parley_settings::ParleySettings;

const RESUME: &str = "Rust engineer. Wrote a log-structured storage engine and a gRPC gateway.";
const JD: &str = "Senior backend engineer. Async Rust, storage, observability.";

/// Numbered questions for question prompts, a fixed summary for everything else.
fn scripted_llm() -> MockLlmClient {
    let asked = AtomicUsize::new(0);
    MockLlmClient::with_responder(move |messages: &[ChatMessage]| {
        let last = messages.last().map_or("", |m| m.content.as_str());
        if last.contains("面试问题") {
            let n = asked.fetch_add(1, Ordering::SeqCst);
            Ok(format!("Question {n}: describe a storage bug you fixed"))
        } else {
            Ok("SUMMARY".to_string())
        }
    })
}

struct World {
    records: Arc<InMemoryRecordStore>,
    semantic: Arc<InMemorySemanticStore>,
    llm: Arc<MockLlmClient>,
}

impl World {
    fn new() -> Self {
        Self {
            records: Arc::new(InMemoryRecordStore::new()),
            semantic: Arc::new(InMemorySemanticStore::new()),
            llm: Arc::new(scripted_llm()),
        }
    }

    fn runtime(&self, settings: &ParleySettings, signal: &SessionSignalBus) -> InterviewRuntime {
        let collaborators = Collaborators {
            records: self.records.clone(),
            semantic: self.semantic.clone(),
            llm: self.llm.clone(),
        };
        InterviewRuntime::new(settings, collaborators, signal.clone())
    }

    fn question_call(&self, number: u32) -> Vec<ChatMessage> {
        let marker = format!("第{number}个");
        self.llm
            .calls()
            .into_iter()
            .find(|call| call.last().is_some_and(|m| m.content.contains(&marker)))
            .unwrap_or_else(|| panic!("no prompt for question {number}"))
    }
}

#[tokio::test]
async fn six_question_interview_summarizes_and_offloads() {
    let world = World::new();
    let settings = ParleySettings::default();
    let mut runtime = world.runtime(&settings, &SessionSignalBus::new());
    let session = SessionId::new();
    runtime.start(session.clone(), RESUME, JD, 6).unwrap();

    for sequence in 0..6 {
        let _ = runtime.next_question(sequence).await.unwrap();
        runtime
            .submit_answer(sequence, &format!("I fixed a compaction bug, take {sequence}"))
            .await
            .unwrap();
        // let the detached memory writes land before the next retrieval
        tokio::task::yield_now().await;

        let state = runtime.context().snapshot().unwrap();
        assert_eq!(state.current_round, sequence as usize + 1);
        assert_eq!(state.rounds[sequence as usize].sequence, sequence);
    }

    // W=3, S=5: one cycle at round 5 over rounds [0, 2).
    let state = runtime.context().snapshot().unwrap();
    assert_eq!(state.running_summary.as_deref(), Some("SUMMARY"));
    assert_eq!(state.last_summarized_index, 2);
    assert_eq!(state.last_summary_round, 5);

    let sixth = world.question_call(6);
    assert_eq!(sixth.len(), 1 + 2 * 3 + 1);
    assert!(sixth[0].content.contains(RUNNING_SUMMARY_LABEL));
    assert!(sixth[0].content.contains(RELEVANT_HISTORY_LABEL));

    let summary = runtime.finish().await.unwrap();
    assert_eq!(summary.turns.len(), 6);
    assert!(summary.turns.iter().all(|t| t.phase == QuestionPhase::Completed));
    assert!(summary.offloads.iter().all(|o| o.stored));

    let records = world.records.records_for(&session);
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.user_answer.is_some()));
    assert_eq!(world.semantic.documents(&conversation_collection(&session)).len(), 6);
    assert!(world.semantic.has_collection(&resume_jd_collection(&session)));
}

#[tokio::test]
async fn raw_documents_only_on_first_turn() {
    let world = World::new();
    let mut settings = ParleySettings::default();
    settings.memory.enabled = false;
    let mut runtime = world.runtime(&settings, &SessionSignalBus::new());
    runtime.start(SessionId::new(), RESUME, JD, 2).unwrap();

    let _ = runtime.next_question(0).await.unwrap();
    runtime.submit_answer(0, "first answer").await.unwrap();
    let _ = runtime.next_question(1).await.unwrap();

    let first = world.question_call(1);
    assert_eq!(first.len(), 2);
    assert!(first[0].content.contains(RESUME));
    assert!(first[0].content.contains(JD));

    let second = world.question_call(2);
    assert_eq!(second.len(), 4);
    assert!(!second[0].content.contains(RESUME));
    assert!(!second[0].content.contains(JD));
    assert!(second[0].content.contains("SUMMARY"));
    assert_eq!(second[1].content, "Question 0: describe a storage bug you fixed");
    assert_eq!(second[2].content, "first answer");
}

#[tokio::test]
async fn restarted_window_continues_the_same_records() {
    let world = World::new();
    let settings = ParleySettings::default();
    let signal = SessionSignalBus::new();
    let session = SessionId::new();

    let mut first = world.runtime(&settings, &signal);
    first.start(session.clone(), RESUME, JD, 3).unwrap();
    let q0 = first.next_question(0).await.unwrap();
    first.submit_answer(0, "answer from the first window").await.unwrap();
    let q1 = first.next_question(1).await.unwrap();
    drop(first);

    let mut second = world.runtime(&settings, &signal);
    assert_eq!(second.resume_from_signal(RESUME, JD, 3).await.unwrap(), session);
    let again = second.next_question(1).await.unwrap();
    assert_eq!(again.record_id, q1.record_id);
    assert_ne!(again.record_id, q0.record_id);
    second.submit_answer(1, "answer from the second window").await.unwrap();
    let q2 = second.next_question(2).await.unwrap();
    second.submit_answer(2, "last one").await.unwrap();

    let records = world.records.records_for(&session);
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].id, q2.record_id);
    assert_eq!(world.records.create_calls(), 3);
}
