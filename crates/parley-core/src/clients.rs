//! Contracts of the external collaborators.
//!
//! The engine only ever talks to these traits. Concrete HTTP adapters and
//! in-memory doubles live in `parley-clients`.

use async_trait::async_trait;

use crate::documents::{Document, ScoredFragment};
use crate::errors::ClientError;
use crate::ids::{RecordId, SessionId};
use crate::messages::ChatMessage;
use crate::records::{NewQuestionRecord, QuestionRecord, RecordUpdate};

/// Request/response access to a language model.
#[async_trait]
pub trait LlmClient: Send + Sync {
    fn name(&self) -> &str;

    /// Complete a chat and return the assistant text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ClientError>;
}

/// Append log of question records, keyed by session.
///
/// The store itself knows nothing about idempotency; deduplication is the
/// session state tracker's job. A store that enforces a unique
/// `(sessionId, sequence)` key reports a rejected duplicate as
/// [`ClientError::Conflict`].
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list_records(&self, session_id: &SessionId) -> Result<Vec<QuestionRecord>, ClientError>;

    async fn create_record(&self, record: &NewQuestionRecord) -> Result<RecordId, ClientError>;

    async fn update_record(&self, record_id: &RecordId, update: &RecordUpdate) -> Result<(), ClientError>;
}

/// Embedding storage with similarity search, used as long-term memory.
#[async_trait]
pub trait SemanticStore: Send + Sync {
    async fn ingest_batch(&self, collection: &str, documents: &[Document]) -> Result<(), ClientError>;

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, ClientError>;

    async fn delete_collection(&self, collection: &str) -> Result<(), ClientError>;
}
