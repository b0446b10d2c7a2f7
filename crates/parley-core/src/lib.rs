//! # parley-core
//!
//! Foundation types shared by every crate of the interview engine.
//!
//! - **IDs**: branded [`SessionId`] and [`RecordId`] newtypes
//! - **Messages**: the role-tagged [`ChatMessage`] sent to the LLM
//! - **Records / documents**: wire shapes of the record and semantic stores
//! - **Contracts**: the [`LlmClient`], [`RecordStore`] and [`SemanticStore`]
//!   traits the engine depends on
//! - **Errors**: [`ClientError`], the classified failure of any collaborator

#![deny(unsafe_code)]

pub mod clients;
pub mod documents;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod records;

pub use clients::{LlmClient, RecordStore, SemanticStore};
pub use documents::{Document, ScoredFragment};
pub use errors::ClientError;
pub use ids::{RecordId, SessionId};
pub use messages::{ChatMessage, Role};
pub use records::{NewQuestionRecord, QuestionPhase, QuestionRecord, RecordUpdate};
