//! Session tracker errors.

use parley_core::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No local state and no session id on the cross-window signal.
    #[error("session not initialized")]
    NotInitialized,

    #[error("no question turn for sequence {0}")]
    UnknownSequence(u32),

    #[error("failed to create record for sequence {sequence}: {source}")]
    RecordCreation {
        sequence: u32,
        #[source]
        source: ClientError,
    },

    #[error("failed to list records: {source}")]
    RecordListing {
        #[source]
        source: ClientError,
    },

    #[error("failed to update record for sequence {sequence}: {source}")]
    RecordUpdate {
        sequence: u32,
        #[source]
        source: ClientError,
    },
}

pub type Result<T> = std::result::Result<T, SessionError>;
