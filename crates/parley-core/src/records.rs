//! Wire shapes of the record store.
//!
//! All serializable types use `camelCase` for wire compatibility with the
//! backend database service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{RecordId, SessionId};

/// Lifecycle phase of a question turn.
///
/// The only transition is `QuestionGenerated -> Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionPhase {
    QuestionGenerated,
    Completed,
}

impl QuestionPhase {
    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }
}

impl std::fmt::Display for QuestionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::QuestionGenerated => write!(f, "question_generated"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A record as listed by the record store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: RecordId,
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asked_question: Option<String>,
    /// Legacy field some stores use instead of `askedQuestion`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Present only when the store persists the turn number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<QuestionPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
}

impl QuestionRecord {
    /// The question text, whichever field the store filled.
    pub fn question_text(&self) -> Option<&str> {
        self.asked_question.as_deref().or(self.content.as_deref())
    }
}

/// Body of a record creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestionRecord {
    pub session_id: SessionId,
    pub sequence: u32,
    pub asked_question: String,
    pub phase: QuestionPhase,
}

/// Partial update of an existing record. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<QuestionPhase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_answer: Option<String>,
}
