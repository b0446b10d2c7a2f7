//! Runtime error types.

use parley_context::ContextError;
use parley_core::ClientError;
use parley_session::SessionError;

/// Errors surfaced by [`InterviewRuntime`](crate::InterviewRuntime).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("context error: {0}")]
    Context(#[from] ContextError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Question generation failed after any configured retries.
    #[error("llm error: {0}")]
    Llm(#[from] ClientError),

    /// No session on this runtime and none announced on the signal.
    #[error("no active session")]
    NoActiveSession,

    #[error("sequence {requested} is out of range for {total} questions")]
    SequenceOutOfRange { requested: u32, total: u32 },

    /// The turn is already completed; answers are not replaced.
    #[error("question {0} was already answered")]
    AlreadyAnswered(u32),

    /// Answers are taken in sequence order only.
    #[error("expected an answer for sequence {expected}, got {requested}")]
    OutOfOrder { expected: u32, requested: u32 },
}

impl RuntimeError {
    /// Whether retrying the same call may succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::Session(
                SessionError::RecordCreation { source, .. }
                | SessionError::RecordUpdate { source, .. }
                | SessionError::RecordListing { source },
            ) => source.is_retryable(),
            Self::Context(_)
            | Self::Session(_)
            | Self::NoActiveSession
            | Self::SequenceOutOfRange { .. }
            | Self::AlreadyAnswered(_)
            | Self::OutOfOrder { .. } => false,
        }
    }

    /// Error category string for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Context(_) => "context",
            Self::Session(_) => "session",
            Self::Llm(_) => "llm",
            Self::NoActiveSession => "no_active_session",
            Self::SequenceOutOfRange { .. } => "sequence_out_of_range",
            Self::AlreadyAnswered(_) => "already_answered",
            Self::OutOfOrder { .. } => "out_of_order",
        }
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
