//! Configuration and outcome types of the memory bridge.

use serde::{Deserialize, Serialize};

use parley_settings::MemorySettings;

/// Bridge configuration.
#[derive(Clone, Debug)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub resume_chunk_chars: usize,
    pub jd_chunk_chars: usize,
    pub conversation_top_k: usize,
    pub resume_jd_top_k: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self::from(&MemorySettings::default())
    }
}

impl From<&MemorySettings> for MemoryConfig {
    fn from(settings: &MemorySettings) -> Self {
        Self {
            enabled: settings.enabled,
            resume_chunk_chars: settings.resume_chunk_chars,
            jd_chunk_chars: settings.jd_chunk_chars,
            conversation_top_k: settings.conversation_top_k,
            resume_jd_top_k: settings.resume_jd_top_k,
        }
    }
}

/// Outcome of a store operation. Never an error: failures are values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffloadResult {
    /// Whether the documents reached the store.
    pub stored: bool,
    /// Number of documents written (or that would have been written).
    pub documents: usize,
    /// Set when nothing was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl OffloadResult {
    #[must_use]
    pub fn written(documents: usize) -> Self {
        Self {
            stored: true,
            documents,
            reason: None,
        }
    }

    /// Nothing was attempted (disabled, empty input).
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            stored: false,
            documents: 0,
            reason: Some(reason.into()),
        }
    }

    /// The store rejected or failed the write.
    #[must_use]
    pub fn failed(documents: usize, reason: impl Into<String>) -> Self {
        Self {
            stored: false,
            documents,
            reason: Some(reason.into()),
        }
    }
}
