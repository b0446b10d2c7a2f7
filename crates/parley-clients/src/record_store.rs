//! Record store over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

use parley_core::{ClientError, NewQuestionRecord, QuestionRecord, RecordId, RecordStore, RecordUpdate, SessionId};

use crate::http::{HttpEndpoint, read_json};

/// [`RecordStore`] backed by the interview database service.
///
/// - `GET  {base}/sessions/{sid}/records`
/// - `POST {base}/sessions/{sid}/records` (409 when the sequence already exists)
/// - `PATCH {base}/records/{rid}`
#[derive(Debug)]
pub struct HttpRecordStore {
    endpoint: HttpEndpoint,
}

#[derive(Deserialize)]
struct CreatedRecord {
    id: RecordId,
}

impl HttpRecordStore {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<SecretString>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            endpoint: HttpEndpoint::new(base_url, timeout, token)?,
        })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn list_records(&self, session_id: &SessionId) -> Result<Vec<QuestionRecord>, ClientError> {
        let path = format!("sessions/{session_id}/records");
        let response = self.endpoint.send(self.endpoint.request(Method::GET, &path)).await?;
        let records: Vec<QuestionRecord> = read_json(response).await?;
        debug!(session_id = %session_id, count = records.len(), "listed records");
        Ok(records)
    }

    async fn create_record(&self, record: &NewQuestionRecord) -> Result<RecordId, ClientError> {
        let path = format!("sessions/{}/records", record.session_id);
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::POST, &path).json(record))
            .await?;
        let created: CreatedRecord = read_json(response).await?;
        Ok(created.id)
    }

    async fn update_record(&self, record_id: &RecordId, update: &RecordUpdate) -> Result<(), ClientError> {
        let path = format!("records/{record_id}");
        let _ = self
            .endpoint
            .send(self.endpoint.request(Method::PATCH, &path).json(update))
            .await?;
        Ok(())
    }
}
