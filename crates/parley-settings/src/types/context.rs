//! Context window and memory settings.

use serde::{Deserialize, Serialize};

/// Sliding window and summarization settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextWindowSettings {
    /// Number of most recent rounds sent verbatim.
    pub window_size: usize,
    /// Rounds between two summarization cycles.
    pub summary_interval: usize,
    /// Target length of the running conversation summary (characters).
    pub conversation_summary_chars: usize,
    /// Target length of the resume summary (characters).
    pub resume_summary_chars: usize,
    /// Target length of the job description summary (characters).
    pub jd_summary_chars: usize,
}

impl Default for ContextWindowSettings {
    fn default() -> Self {
        Self {
            window_size: 3,
            summary_interval: 5,
            conversation_summary_chars: 500,
            resume_summary_chars: 200,
            jd_summary_chars: 100,
        }
    }
}

/// Semantic memory settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemorySettings {
    /// Whether offload and retrieval are performed at all.
    pub enabled: bool,
    /// Target chunk size for resume text (characters).
    pub resume_chunk_chars: usize,
    /// Target chunk size for job description text (characters).
    pub jd_chunk_chars: usize,
    /// Default number of conversation fragments to retrieve.
    pub conversation_top_k: usize,
    /// Default number of resume/JD fragments to retrieve.
    pub resume_jd_top_k: usize,
    /// Delete the session's collections when the interview finishes.
    pub delete_on_finish: bool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            resume_chunk_chars: 500,
            jd_chunk_chars: 300,
            conversation_top_k: 3,
            resume_jd_top_k: 2,
            delete_on_finish: false,
        }
    }
}
