//! # parley-memory
//!
//! Long-term memory for an interview session.
//!
//! The [`SemanticMemoryBridge`] turns context events (resume and job
//! description text, finished question rounds) into documents of a
//! [`SemanticStore`](parley_core::SemanticStore) and answers relevance queries
//! against them. Every operation is fail-silent: writes report an
//! [`OffloadResult`], reads degrade to an empty list.

#![deny(unsafe_code)]

pub mod bridge;
pub mod chunking;
pub mod types;

pub use bridge::{SemanticMemoryBridge, conversation_collection, resume_jd_collection};
pub use chunking::{chunk_text, split_sentences};
pub use types::{MemoryConfig, OffloadResult};
