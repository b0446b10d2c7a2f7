//! Session and question turn state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::{QuestionPhase, RecordId, SessionId};

/// Local view of one question of the interview.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTurn {
    pub sequence: u32,
    /// Assigned once, never changes.
    pub record_id: RecordId,
    pub phase: QuestionPhase,
    pub question_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// State of the active interview.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: SessionId,
    pub total_questions: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_complete: bool,
    /// Turns keyed by sequence.
    pub turns: BTreeMap<u32, QuestionTurn>,
}

impl SessionState {
    pub fn new(session_id: SessionId, total_questions: u32) -> Self {
        Self {
            session_id,
            total_questions,
            start_time: Utc::now(),
            end_time: None,
            is_complete: false,
            turns: BTreeMap::new(),
        }
    }
}
