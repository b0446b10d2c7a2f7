//! Context state and configuration types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::SessionId;
use parley_settings::ContextWindowSettings;

/// Window and summarization parameters.
#[derive(Clone, Debug)]
pub struct ContextConfig {
    /// Rounds sent verbatim. Default: 3.
    pub window_size: usize,
    /// Rounds between summarization cycles. Default: 5.
    pub summary_interval: usize,
    pub conversation_summary_chars: usize,
    pub resume_summary_chars: usize,
    pub jd_summary_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self::from(&ContextWindowSettings::default())
    }
}

impl From<&ContextWindowSettings> for ContextConfig {
    fn from(settings: &ContextWindowSettings) -> Self {
        Self {
            window_size: settings.window_size,
            summary_interval: settings.summary_interval,
            conversation_summary_chars: settings.conversation_summary_chars,
            resume_summary_chars: settings.resume_summary_chars,
            jd_summary_chars: settings.jd_summary_chars,
        }
    }
}

/// One recorded question/answer exchange.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRound {
    pub sequence: u32,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// Rolling state of one session.
///
/// `last_summarized_index <= current_round` always holds, and
/// `running_summary` is set only after a successful summarization cycle.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextState {
    pub session_id: SessionId,
    pub resume_text: String,
    pub resume_summary: Option<String>,
    pub jd_text: String,
    pub jd_summary: Option<String>,
    pub rounds: Vec<ConversationRound>,
    pub running_summary: Option<String>,
    /// Rounds before this index are covered by `running_summary`.
    pub last_summarized_index: usize,
    pub current_round: usize,
    /// Sequence of the first round recorded here. Non-zero when this window
    /// continues a session whose earlier rounds were recorded elsewhere.
    #[serde(default)]
    pub first_sequence: u32,
    /// Value of `current_round` at the last successful summarization.
    pub last_summary_round: usize,
    /// Whether the one-time resume/JD summarization has run.
    pub documents_summarized: bool,
}

impl ContextState {
    pub fn new(session_id: SessionId, resume_text: String, jd_text: String) -> Self {
        Self {
            session_id,
            resume_text,
            resume_summary: None,
            jd_text,
            jd_summary: None,
            rounds: Vec::new(),
            running_summary: None,
            last_summarized_index: 0,
            current_round: 0,
            first_sequence: 0,
            last_summary_round: 0,
            documents_summarized: false,
        }
    }

    /// Sequence the next recorded round will carry.
    pub fn next_sequence(&self) -> u32 {
        self.first_sequence
            .saturating_add(u32::try_from(self.current_round).unwrap_or(u32::MAX))
    }

    /// Resume text for the system message: raw on the first turn, otherwise
    /// the summary when one exists.
    pub fn resume_for_prompt(&self) -> &str {
        match (&self.resume_summary, self.current_round) {
            (Some(summary), round) if round > 0 => summary,
            _ => &self.resume_text,
        }
    }

    /// Job description text for the system message, same rule as the resume.
    pub fn jd_for_prompt(&self) -> &str {
        match (&self.jd_summary, self.current_round) {
            (Some(summary), round) if round > 0 => summary,
            _ => &self.jd_text,
        }
    }

    /// The last `window` rounds, oldest first.
    pub fn window(&self, window: usize) -> &[ConversationRound] {
        let start = self.rounds.len().saturating_sub(window);
        &self.rounds[start..]
    }
}
