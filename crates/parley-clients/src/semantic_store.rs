//! Semantic (RAG) store over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use parley_core::{ClientError, Document, ScoredFragment, SemanticStore};

use crate::http::{HttpEndpoint, read_json};

/// [`SemanticStore`] backed by a vector database service.
#[derive(Debug)]
pub struct HttpSemanticStore {
    endpoint: HttpEndpoint,
}

#[derive(Serialize)]
struct IngestBody<'a> {
    documents: &'a [Document],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    query: &'a str,
    top_k: usize,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<ScoredFragment>,
}

impl HttpSemanticStore {
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
impl SemanticStore for HttpSemanticStore {
    async fn ingest_batch(&self, collection: &str, documents: &[Document]) -> Result<(), ClientError> {
        let path = format!("collections/{collection}/documents");
        let _ = self
            .endpoint
            .send(
                self.endpoint
                    .request(Method::POST, &path)
                    .json(&IngestBody { documents }),
            )
            .await?;
        debug!(collection, count = documents.len(), "ingested documents");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredFragment>, ClientError> {
        let path = format!("collections/{collection}/query");
        let response = self
            .endpoint
            .send(self.endpoint.request(Method::POST, &path).json(&QueryBody {
                query: query_text,
                top_k,
            }))
            .await?;
        let parsed: QueryResponse = read_json(response).await?;
        Ok(parsed.results)
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), ClientError> {
        let path = format!("collections/{collection}");
        match self
            .endpoint
            .send(self.endpoint.request(Method::DELETE, &path))
            .await
        {
            Ok(_) | Err(ClientError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
