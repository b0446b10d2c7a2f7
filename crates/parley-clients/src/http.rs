//! Shared HTTP plumbing for the collaborator adapters.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use parley_core::ClientError;

/// Base URL, client, timeout and optional bearer token of one service.
#[derive(Debug)]
pub struct HttpEndpoint {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    token: Option<SecretString>,
}

impl HttpEndpoint {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        token: Option<SecretString>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send and map transport failures and non-2xx statuses to [`ClientError`].
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response, ClientError> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "collaborator returned error status");

        match ClientError::from_status(status.as_u16(), body) {
            ClientError::RateLimited { .. } => Err(ClientError::RateLimited { retry_after }),
            other => Err(other),
        }
    }
}

/// Decode a JSON body, reporting shape mismatches as `InvalidResponse`.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ClientError::InvalidResponse(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::InvalidResponse(format!("unexpected response shape: {e}")))
}

fn transport_error(err: &reqwest::Error, timeout: Duration) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(timeout)
    } else if err.is_decode() {
        ClientError::InvalidResponse(err.to_string())
    } else {
        ClientError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn url_joining_trims_slashes() {
        let endpoint = HttpEndpoint::new("http://host/api/", Duration::from_secs(1), None).unwrap();
        assert_eq!(endpoint.base_url(), "http://host/api");
        assert_eq!(endpoint.url("/sessions/s1"), "http://host/api/sessions/s1");
        assert_eq!(endpoint.url("records/r1"), "http://host/api/records/r1");
    }

    #[tokio::test]
    async fn bearer_token_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("authorization", "Bearer s3cret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(
            server.uri(),
            Duration::from_secs(5),
            Some(SecretString::from("s3cret".to_string())),
        )
        .unwrap();
        let response = endpoint.send(endpoint.request(Method::GET, "ping")).await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(server.uri(), Duration::from_secs(5), None).unwrap();
        let err = endpoint
            .send(endpoint.request(Method::GET, "x"))
            .await
            .unwrap_err();
        assert_eq!(err.suggested_delay(), Some(Duration::from_secs(7)));
    }

    #[tokio::test]
    async fn connection_refused_is_unavailable() {
        let endpoint =
            HttpEndpoint::new("http://127.0.0.1:1", Duration::from_secs(2), None).unwrap();
        let err = endpoint
            .send(endpoint.request(Method::GET, "x"))
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::Unavailable(_));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let endpoint = HttpEndpoint::new(server.uri(), Duration::from_millis(50), None).unwrap();
        let err = endpoint
            .send(endpoint.request(Method::GET, "x"))
            .await
            .unwrap_err();
        assert_matches!(err, ClientError::Timeout(_));
    }
}
