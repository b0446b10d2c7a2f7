use std::time::Duration;

/// Typed failure of an external collaborator (record store, semantic store, LLM).
///
/// Classifies errors as retryable, fatal, or conflict so callers can decide
/// between retrying, degrading, and conflict-then-read.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    // Fatal, never retried
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    // Write rejected by a uniqueness constraint
    #[error("conflict: {0}")]
    Conflict(String),

    // Retryable
    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("server error {status}: {body}")]
    ServerError { status: u16, body: String },
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("timeout after {0:?}")]
    Timeout(Duration),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Unavailable(_) | Self::Timeout(_)
        )
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed(_)
                | Self::InvalidRequest(_)
                | Self::NotFound(_)
                | Self::InvalidResponse(_)
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn suggested_delay(&self) -> Option<Duration> {
        if let Self::RateLimited { retry_after } = self {
            *retry_after
        } else {
            None
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "authentication_failed",
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound(_) => "not_found",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Conflict(_) => "conflict",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify an HTTP status code into the appropriate error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed(body),
            400 | 422 => Self::InvalidRequest(body),
            404 => Self::NotFound(body),
            409 => Self::Conflict(body),
            429 => Self::RateLimited { retry_after: None },
            502..=504 => Self::Unavailable(format!("status {status}: {body}")),
            500..=599 => Self::ServerError { status, body },
            _ => Self::InvalidRequest(format!("unexpected status {status}: {body}")),
        }
    }
}
