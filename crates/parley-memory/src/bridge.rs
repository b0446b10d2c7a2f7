//! Semantic memory bridge.
//!
//! Two collections per session:
//! - `resume_jd_{session}`: chunked resume and job description
//! - `conversation_{session}`: one document per finished round
//!
//! All operations are **fail-silent**. Store writes return an
//! [`OffloadResult`], queries return an empty list, deletion is best-effort.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use parley_core::{Document, ScoredFragment, SemanticStore, SessionId};

use crate::chunking::chunk_text;
use crate::types::{MemoryConfig, OffloadResult};

/// Collection holding the resume and job description chunks of a session.
pub fn resume_jd_collection(session_id: &SessionId) -> String {
    format!("resume_jd_{session_id}")
}

/// Collection holding the conversation rounds of a session.
pub fn conversation_collection(session_id: &SessionId) -> String {
    format!("conversation_{session_id}")
}

/// Adapter between context events and a [`SemanticStore`].
pub struct SemanticMemoryBridge {
    store: Arc<dyn SemanticStore>,
    config: MemoryConfig,
}

impl SemanticMemoryBridge {
    pub fn new(store: Arc<dyn SemanticStore>, config: MemoryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Chunk and store the resume and job description in one batch.
    pub async fn store_resume_and_jd(
        &self,
        session_id: &SessionId,
        resume_text: &str,
        jd_text: &str,
    ) -> OffloadResult {
        if !self.config.enabled {
            debug!(session_id = %session_id, "memory disabled, skipping resume/JD offload");
            return OffloadResult::skipped("memory disabled");
        }

        let mut documents = Vec::new();
        for (kind, text, target) in [
            ("resume", resume_text, self.config.resume_chunk_chars),
            ("jd", jd_text, self.config.jd_chunk_chars),
        ] {
            for (index, chunk) in chunk_text(text, target).into_iter().enumerate() {
                documents.push(Document::new(
                    chunk,
                    json!({
                        "type": kind,
                        "chunkIndex": index,
                        "sessionId": session_id,
                    }),
                ));
            }
        }
        if documents.is_empty() {
            return OffloadResult::skipped("no resume or job description text");
        }

        let collection = resume_jd_collection(session_id);
        self.ingest(&collection, &documents).await
    }

    /// Store one finished round as a single document.
    pub async fn store_conversation(
        &self,
        session_id: &SessionId,
        sequence: u32,
        question: &str,
        answer: &str,
    ) -> OffloadResult {
        if !self.config.enabled {
            debug!(session_id = %session_id, sequence, "memory disabled, skipping round offload");
            return OffloadResult::skipped("memory disabled");
        }

        let document = Document::new(
            format!("问题: {question}\n回答: {answer}"),
            json!({
                "type": "conversation",
                "sessionId": session_id,
                "sequence": sequence,
                "question": question,
                "answer": answer,
                "timestamp": Utc::now().to_rfc3339(),
            }),
        );
        let collection = conversation_collection(session_id);
        self.ingest(&collection, std::slice::from_ref(&document)).await
    }

    /// Past rounds most relevant to `query`. `top_k` defaults to the configured value.
    pub async fn retrieve_relevant_conversations(
        &self,
        session_id: &SessionId,
        query: &str,
        top_k: Option<usize>,
    ) -> Vec<ScoredFragment> {
        let k = top_k.unwrap_or(self.config.conversation_top_k);
        self.retrieve(&conversation_collection(session_id), query, k).await
    }

    /// Resume/JD chunks most relevant to `query`. `top_k` defaults to the configured value.
    pub async fn retrieve_relevant_resume_jd(
        &self,
        session_id: &SessionId,
        query: &str,
        top_k: Option<usize>,
    ) -> Vec<ScoredFragment> {
        let k = top_k.unwrap_or(self.config.resume_jd_top_k);
        self.retrieve(&resume_jd_collection(session_id), query, k).await
    }

    /// Delete both collections of a session. Returns `true` if both deletes succeeded.
    pub async fn delete_session_data(&self, session_id: &SessionId) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut all_ok = true;
        for collection in [resume_jd_collection(session_id), conversation_collection(session_id)] {
            if let Err(e) = self.store.delete_collection(&collection).await {
                warn!(collection = %collection, error = %e, "failed to delete collection");
                all_ok = false;
            }
        }
        if all_ok {
            info!(session_id = %session_id, "deleted session memory");
        }
        all_ok
    }

    /// [`store_resume_and_jd`](Self::store_resume_and_jd) on a detached task.
    pub fn spawn_store_resume_and_jd(
        self: &Arc<Self>,
        session_id: SessionId,
        resume_text: String,
        jd_text: String,
    ) -> JoinHandle<OffloadResult> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            bridge
                .store_resume_and_jd(&session_id, &resume_text, &jd_text)
                .await
        })
    }

    /// [`store_conversation`](Self::store_conversation) on a detached task.
    pub fn spawn_store_conversation(
        self: &Arc<Self>,
        session_id: SessionId,
        sequence: u32,
        question: String,
        answer: String,
    ) -> JoinHandle<OffloadResult> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            bridge
                .store_conversation(&session_id, sequence, &question, &answer)
                .await
        })
    }

    async fn ingest(&self, collection: &str, documents: &[Document]) -> OffloadResult {
        match self.store.ingest_batch(collection, documents).await {
            Ok(()) => {
                debug!(collection, documents = documents.len(), "offloaded to semantic store");
                OffloadResult::written(documents.len())
            }
            Err(e) => {
                warn!(
                    collection,
                    documents = documents.len(),
                    error_kind = e.error_kind(),
                    error = %e,
                    "semantic store offload failed"
                );
                OffloadResult::failed(documents.len(), e.to_string())
            }
        }
    }

    async fn retrieve(&self, collection: &str, query: &str, top_k: usize) -> Vec<ScoredFragment> {
        if !self.config.enabled || top_k == 0 {
            return Vec::new();
        }
        match self.store.query(collection, query, top_k).await {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!(collection, error = %e, "semantic retrieval failed, continuing without it");
                Vec::new()
            }
        }
    }
}
