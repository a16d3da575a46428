use thiserror::Error;

/// Failure of a single call to the external inventory service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Transport failures, rate limiting and server errors are retried;
    /// other client errors and malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Status { status, .. } => *status == 429 || (500..600).contains(status),
            RemoteError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActivityLogError {
    #[error("activity log unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Non-retryable remote failure.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: RemoteError },

    #[error(transparent)]
    Log(#[from] ActivityLogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(RemoteError::Network("reset".into()).is_retryable());
        assert!(RemoteError::Timeout.is_retryable());
        assert!(RemoteError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(RemoteError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!RemoteError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!RemoteError::Status { status: 409, body: String::new() }.is_retryable());
        assert!(!RemoteError::Decode("eof".into()).is_retryable());
    }
}
