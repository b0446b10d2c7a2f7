//! Session state tracker.
//!
//! Guarantees at most one record per `(session, sequence)` on a best-effort
//! basis:
//!
//! 1. a turn already cached locally returns its record id
//! 2. otherwise the session's records are listed and an existing record for
//!    the sequence is adopted
//! 3. otherwise a record is created; a store-side conflict is resolved by
//!    listing again and adopting the winner
//!
//! Two windows racing through step 2 at the same time can still both create.
//! Stores with a unique `(sessionId, sequence)` key close that gap through the
//! conflict path.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use parley_core::{
    NewQuestionRecord, QuestionPhase, QuestionRecord, RecordId, RecordStore, RecordUpdate, SessionId,
};

use crate::errors::{Result, SessionError};
use crate::signal::SessionSignalBus;
use crate::types::{QuestionTurn, SessionState};

/// Tracks the question turns of the active session.
pub struct SessionStateTracker {
    store: Arc<dyn RecordStore>,
    signal: SessionSignalBus,
    state: Option<SessionState>,
}

impl SessionStateTracker {
    pub fn new(store: Arc<dyn RecordStore>, signal: SessionSignalBus) -> Self {
        Self {
            store,
            signal,
            state: None,
        }
    }

    pub fn signal(&self) -> &SessionSignalBus {
        &self.signal
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.state.as_ref().map(|s| &s.session_id)
    }

    /// Start fresh state for `session_id`, replacing whatever was tracked.
    pub fn initialize_session(&mut self, session_id: SessionId, total_questions: u32) {
        info!(session_id = %session_id, total_questions, "session initialized");
        let _ = self.signal.publish_session(Some(session_id.clone()));
        self.state = Some(SessionState::new(session_id, total_questions));
    }

    /// Return the record id for `sequence`, creating the record only if the
    /// store does not already hold one.
    pub async fn create_question_record(&mut self, sequence: u32, question_text: &str) -> Result<RecordId> {
        let state = self.ensure_state()?;

        if let Some(turn) = state.turns.get(&sequence) {
            debug!(session_id = %state.session_id, sequence, record_id = %turn.record_id, "turn already cached");
            return Ok(turn.record_id.clone());
        }

        let session_id = state.session_id.clone();
        let existing = match self.store.list_records(&session_id).await {
            Ok(records) => find_existing(&records, sequence).cloned(),
            Err(e) => {
                warn!(
                    session_id = %session_id,
                    sequence,
                    error = %e,
                    "record listing failed, skipping duplicate check"
                );
                None
            }
        };

        let turn = match existing {
            Some(record) => {
                info!(session_id = %session_id, sequence, record_id = %record.id, "adopting existing record");
                adopted_turn(sequence, question_text, &record)
            }
            None => {
                let record_id = self.create_or_adopt(&session_id, sequence, question_text).await?;
                QuestionTurn {
                    sequence,
                    record_id,
                    phase: QuestionPhase::QuestionGenerated,
                    question_text: question_text.to_string(),
                    reference_answer: None,
                    user_answer: None,
                    started_at: Utc::now(),
                }
            }
        };

        let record_id = turn.record_id.clone();
        if let Some(state) = self.state.as_mut() {
            let _ = state.turns.insert(sequence, turn);
        }
        Ok(record_id)
    }

    /// Adopt the answered turns of a session continued from another window.
    ///
    /// Sequences are walked from 0 and the walk stops at the first one whose
    /// record is missing or unanswered. Returns how many turns were adopted,
    /// which is the sequence this window continues from.
    pub async fn recover_answered(&mut self) -> Result<u32> {
        let session_id = self.ensure_state()?.session_id.clone();
        let records = self
            .store
            .list_records(&session_id)
            .await
            .map_err(|source| SessionError::RecordListing { source })?;

        let mut recovered = Vec::new();
        let mut next = 0;
        while let Some(record) = find_existing(&records, next) {
            if record.user_answer.is_none() {
                break;
            }
            let mut turn = adopted_turn(next, "", record);
            turn.phase = QuestionPhase::Completed;
            recovered.push(turn);
            next += 1;
        }

        if let Some(state) = self.state.as_mut() {
            for turn in recovered {
                let _ = state.turns.insert(turn.sequence, turn);
            }
        }
        info!(session_id = %session_id, answered = next, "recovered answered turns");
        Ok(next)
    }

    /// Move `sequence` to `completed`. Unknown sequences are ignored.
    pub fn mark_question_complete(&mut self, sequence: u32) -> Result<()> {
        let state = self.state.as_mut().ok_or(SessionError::NotInitialized)?;
        match state.turns.get_mut(&sequence) {
            Some(turn) => {
                turn.phase = QuestionPhase::Completed;
                debug!(session_id = %state.session_id, sequence, "question completed");
            }
            None => debug!(session_id = %state.session_id, sequence, "complete for unknown sequence ignored"),
        }
        Ok(())
    }

    /// Store the candidate's answer locally and on the record.
    ///
    /// The record is updated with the answer and the `completed` phase.
    /// Failures propagate and leave the local turn untouched.
    pub async fn record_answer(
        &mut self,
        sequence: u32,
        user_answer: &str,
        reference_answer: Option<&str>,
    ) -> Result<()> {
        let state = self.state.as_mut().ok_or(SessionError::NotInitialized)?;
        let turn = state
            .turns
            .get_mut(&sequence)
            .ok_or(SessionError::UnknownSequence(sequence))?;

        let update = RecordUpdate {
            phase: Some(QuestionPhase::Completed),
            user_answer: Some(user_answer.to_string()),
            reference_answer: reference_answer.map(str::to_string),
        };
        self.store
            .update_record(&turn.record_id, &update)
            .await
            .map_err(|source| SessionError::RecordUpdate { sequence, source })?;

        turn.user_answer = Some(user_answer.to_string());
        if let Some(reference) = reference_answer {
            turn.reference_answer = Some(reference.to_string());
        }
        turn.phase = QuestionPhase::Completed;
        debug!(session_id = %state.session_id, sequence, "answer recorded");
        Ok(())
    }

    pub fn get_question_state(&self, sequence: u32) -> Option<&QuestionTurn> {
        self.state.as_ref()?.turns.get(&sequence)
    }

    /// All turns ordered by sequence.
    pub fn get_all_question_states(&self) -> Vec<QuestionTurn> {
        self.state
            .as_ref()
            .map(|s| s.turns.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn mark_interview_complete(&mut self) -> Result<()> {
        let state = self.state.as_mut().ok_or(SessionError::NotInitialized)?;
        state.is_complete = true;
        state.end_time = Some(Utc::now());
        info!(session_id = %state.session_id, turns = state.turns.len(), "interview complete");
        Ok(())
    }

    /// Drop local state and withdraw the session from the signal.
    pub fn reset_state(&mut self) {
        if let Some(state) = self.state.take() {
            info!(session_id = %state.session_id, "session state reset");
            if self.signal.session_id().as_ref() == Some(&state.session_id) {
                let _ = self.signal.publish_session(None);
            }
        }
    }

    fn ensure_state(&mut self) -> Result<&SessionState> {
        if self.state.is_none() {
            let session_id = self.signal.session_id().ok_or(SessionError::NotInitialized)?;
            info!(session_id = %session_id, "recovered session from cross-window signal");
            self.state = Some(SessionState::new(session_id, 0));
        }
        self.state.as_ref().ok_or(SessionError::NotInitialized)
    }

    async fn create_or_adopt(&self, session_id: &SessionId, sequence: u32, question_text: &str) -> Result<RecordId> {
        let request = NewQuestionRecord {
            session_id: session_id.clone(),
            sequence,
            asked_question: question_text.to_string(),
            phase: QuestionPhase::QuestionGenerated,
        };

        match self.store.create_record(&request).await {
            Ok(id) => {
                info!(session_id = %session_id, sequence, record_id = %id, "record created");
                Ok(id)
            }
            Err(e) if e.is_conflict() => {
                warn!(session_id = %session_id, sequence, "record already exists, reading it back");
                let records = self
                    .store
                    .list_records(session_id)
                    .await
                    .map_err(|source| SessionError::RecordCreation { sequence, source })?;
                find_existing(&records, sequence)
                    .map(|r| r.id.clone())
                    .ok_or(SessionError::RecordCreation { sequence, source: e })
            }
            Err(source) => Err(SessionError::RecordCreation { sequence, source }),
        }
    }
}

fn adopted_turn(sequence: u32, question_text: &str, record: &QuestionRecord) -> QuestionTurn {
    QuestionTurn {
        sequence,
        record_id: record.id.clone(),
        phase: record.phase.unwrap_or(QuestionPhase::QuestionGenerated),
        question_text: record
            .question_text()
            .map_or_else(|| question_text.to_string(), str::to_string),
        reference_answer: record.reference_answer.clone(),
        user_answer: record.user_answer.clone(),
        started_at: record.created_at,
    }
}

/// The record of `sequence` among `records`, if any.
///
/// Records carrying an explicit `sequence` are matched on it. Only when no
/// record carries one is the creation-order position used instead.
fn find_existing(records: &[QuestionRecord], sequence: u32) -> Option<&QuestionRecord> {
    let mut ordered: Vec<&QuestionRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    let positional = usize::try_from(sequence)
        .ok()
        .and_then(|i| ordered.get(i).copied());

    if let Some(explicit) = records.iter().find(|r| r.sequence == Some(sequence)) {
        if let Some(p) = positional {
            if p.id != explicit.id {
                warn!(
                    sequence,
                    explicit = %explicit.id,
                    positional = %p.id,
                    "record listing order disagrees with stored sequence"
                );
            }
        }
        return Some(explicit);
    }

    if records.iter().any(|r| r.sequence.is_some()) {
        return None;
    }
    positional
}
