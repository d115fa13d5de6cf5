use thiserror::Error;

/// Errors surfaced by the [`crate::Provider`] trait.
///
/// The engine's retry/substitute policy (§7) only needs to know whether a
/// failure is worth retrying, so every variant is classified as either
/// [`ProviderError::is_transient`] or not. The client itself never retries;
/// that decision belongs to the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 429 or 5xx from the gateway, or a network-level failure. Safe to retry
    /// with backoff.
    #[error("transient gateway error: {0}")]
    Transient(String),

    /// 400, 401, 404, or a content-filter rejection. Retrying would not help.
    #[error("permanent gateway error: {0}")]
    Permanent(String),

    /// The shared deadline for a stage elapsed before the call returned.
    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The gateway response could not be parsed into the expected shape.
    #[error("failed to parse gateway response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Whether a caller may retry this call with jittered backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout(_))
    }

    /// Classifies an HTTP status code per §4.1's transient/permanent split.
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let body = body.into();

        if status.as_u16() == 429 || status.is_server_error() {
            Self::Transient(format!("{status}: {body}"))
        } else {
            Self::Permanent(format!("{status}: {body}"))
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(std::time::Duration::default())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
