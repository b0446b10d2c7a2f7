//! In-memory record and semantic stores.
//!
//! Both stores expose failure switches so tests can drive the engine's
//! degraded paths without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;

use parley_core::{
    ClientError, Document, NewQuestionRecord, QuestionRecord, RecordId, RecordStore, RecordUpdate,
    ScoredFragment, SemanticStore, SessionId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Record store
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only record log held in memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: Mutex<Vec<QuestionRecord>>,
    last_created_at: Mutex<Option<DateTime<Utc>>>,
    unique_sequence: bool,
    drop_sequence: bool,
    reverse_listing: bool,
    fail_list: AtomicBool,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    create_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject a second record for the same `(session, sequence)` with
    /// [`ClientError::Conflict`].
    #[must_use]
    pub fn with_unique_sequence(mut self) -> Self {
        self.unique_sequence = true;
        self
    }

    /// Behave like a store that does not persist the `sequence` field.
    #[must_use]
    pub fn without_sequence_field(mut self) -> Self {
        self.drop_sequence = true;
        self
    }

    /// List newest first instead of in insertion order.
    #[must_use]
    pub fn with_reversed_listing(mut self) -> Self {
        self.reverse_listing = true;
        self
    }

    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Number of `create_record` calls, including rejected ones.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// All records of `session_id` in insertion order.
    pub fn records_for(&self, session_id: &SessionId) -> Vec<QuestionRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| &r.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Insert a record directly, bypassing failure switches.
    pub fn seed(&self, record: QuestionRecord) {
        self.records.lock().push(record);
    }

    fn next_created_at(&self) -> DateTime<Utc> {
        let mut last = self.last_created_at.lock();
        let now = Utc::now();
        let stamp = match *last {
            Some(prev) if now <= prev => prev + ChronoDuration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list_records(&self, session_id: &SessionId) -> Result<Vec<QuestionRecord>, ClientError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("record store listing disabled".into()));
        }
        let mut records = self.records_for(session_id);
        if self.reverse_listing {
            records.reverse();
        }
        Ok(records)
    }

    async fn create_record(&self, record: &NewQuestionRecord) -> Result<RecordId, ClientError> {
        let _ = self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("record store writes disabled".into()));
        }

        let created_at = self.next_created_at();
        let mut records = self.records.lock();
        if self.unique_sequence {
            let duplicate = records
                .iter()
                .any(|r| r.session_id == record.session_id && r.sequence == Some(record.sequence));
            if duplicate {
                return Err(ClientError::Conflict(format!(
                    "sequence {} already exists for session {}",
                    record.sequence, record.session_id
                )));
            }
        }

        let id = RecordId::new();
        records.push(QuestionRecord {
            id: id.clone(),
            session_id: record.session_id.clone(),
            created_at,
            asked_question: Some(record.asked_question.clone()),
            content: None,
            sequence: (!self.drop_sequence).then_some(record.sequence),
            phase: Some(record.phase),
            user_answer: None,
            reference_answer: None,
        });
        Ok(id)
    }

    async fn update_record(&self, record_id: &RecordId, update: &RecordUpdate) -> Result<(), ClientError> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("record store writes disabled".into()));
        }
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| &r.id == record_id)
            .ok_or_else(|| ClientError::NotFound(format!("record {record_id}")))?;
        if let Some(phase) = update.phase {
            record.phase = Some(phase);
        }
        if let Some(answer) = &update.user_answer {
            record.user_answer = Some(answer.clone());
        }
        if let Some(reference) = &update.reference_answer {
            record.reference_answer = Some(reference.clone());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Semantic store
// ─────────────────────────────────────────────────────────────────────────────

/// Collections of documents ranked by term overlap with the query.
#[derive(Default)]
pub struct InMemorySemanticStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    fail_ingest: AtomicBool,
    fail_query: AtomicBool,
    ingest_calls: AtomicUsize,
}

impl InMemorySemanticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_ingest(&self, fail: bool) {
        self.fail_ingest.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_query(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn ingest_calls(&self) -> usize {
        self.ingest_calls.load(Ordering::SeqCst)
    }

    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_collection(&self, collection: &str) -> bool {
        self.collections.lock().contains_key(collection)
    }
}

/// Lowercased ASCII words plus every CJK character as its own term.
fn terms(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            word.push(c.to_ascii_lowercase());
            continue;
        }
        if !word.is_empty() {
            let _ = out.insert(std::mem::take(&mut word));
        }
        if c.is_alphanumeric() {
            let _ = out.insert(c.to_string());
        }
    }
    if !word.is_empty() {
        let _ = out.insert(word);
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn overlap(query: &HashSet<String>, content: &str) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let doc = terms(content);
    let shared = query.intersection(&doc).count();
    shared as f64 / query.len() as f64
}

#[async_trait]
impl SemanticStore for InMemorySemanticStore {
    async fn ingest_batch(&self, collection: &str, documents: &[Document]) -> Result<(), ClientError> {
        let _ = self.ingest_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_ingest.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("semantic store ingest disabled".into()));
        }
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .extend_from_slice(documents);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, ClientError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable("semantic store query disabled".into()));
        }
        let query = terms(query_text);
        let mut scored: Vec<ScoredFragment> = self
            .documents(collection)
            .into_iter()
            .map(|doc| ScoredFragment {
                similarity: overlap(&query, &doc.content),
                content: doc.content,
                metadata: doc.metadata,
            })
            .filter(|f| f.similarity > 0.0)
            .collect();
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), ClientError> {
        let _ = self.collections.lock().remove(collection);
        Ok(())
    }
}
