//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Types marked with `#[serde(default)]`
//! allow partial JSON: missing fields get their default value.

mod backend;
mod context;

pub use backend::*;
pub use context::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "context": { "windowSize": 4 },
///   "backend": { "llmUrl": "http://localhost:9000" }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParleySettings {
    /// Sliding window and summarization.
    pub context: ContextWindowSettings,
    /// Semantic memory offload and retrieval.
    pub memory: MemorySettings,
    /// Collaborator endpoints.
    pub backend: BackendSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl ParleySettings {
    /// Reject values the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("context.windowSize", self.context.window_size),
            ("context.summaryInterval", self.context.summary_interval),
            ("context.conversationSummaryChars", self.context.conversation_summary_chars),
            ("context.resumeSummaryChars", self.context.resume_summary_chars),
            ("context.jdSummaryChars", self.context.jd_summary_chars),
            ("memory.resumeChunkChars", self.memory.resume_chunk_chars),
            ("memory.jdChunkChars", self.memory.jd_chunk_chars),
            ("memory.conversationTopK", self.memory.conversation_top_k),
            ("memory.resumeJdTopK", self.memory.resume_jd_top_k),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(SettingsError::InvalidValue(format!("{key} must be >= 1")));
            }
        }
        if self.backend.request_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "backend.requestTimeoutMs must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level (`trace`..`error`). `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
