//! Context manager errors.

use parley_core::SessionId;

/// Errors surfaced to callers of the context window manager.
///
/// Collaborator failures never appear here: summarization and memory
/// problems are logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("context manager not initialized")]
    NotInitialized,

    #[error("session {active} is still active; clear it before initializing {requested}")]
    SessionConflict {
        active: SessionId,
        requested: SessionId,
    },

    #[error("{rounds} rounds already recorded; the first sequence can no longer change")]
    RoundsRecorded { rounds: usize },
}

pub type Result<T> = std::result::Result<T, ContextError>;
