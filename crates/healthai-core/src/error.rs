use std::time::Duration;

use thiserror::Error;

/// Failures from a single chat-completion call.
///
/// Every variant renders a human-readable, non-empty message; the
/// orchestrator shows it to the user in place of a plan.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("authentication failed ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("rate limit reached: {0}")]
    RateLimited(String),

    #[error("request rejected ({status}): {message}")]
    BadRequest { status: u16, message: String },

    #[error("provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("could not reach completion service: {0}")]
    Transport(String),

    #[error("could not decode provider response: {0}")]
    MalformedResponse(String),

    #[error("provider returned no content")]
    EmptyResponse,
}

impl CompletionError {
    /// Classify a non-success HTTP status and its (already extracted) message.
    pub fn from_status(status: u16, message: String) -> Self {
        let message = if message.trim().is_empty() {
            "no details provided".to_string()
        } else {
            message
        };

        match status {
            401 | 403 => CompletionError::Unauthorized { status, message },
            429 => CompletionError::RateLimited(message),
            400 | 404 | 413 | 422 => CompletionError::BadRequest { status, message },
            _ => CompletionError::Provider { status, message },
        }
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CompletionError::MalformedResponse(err.to_string())
        } else {
            CompletionError::Transport(err.to_string())
        }
    }
}

/// Outcome of one adapter invocation.
pub type CompletionResult = Result<String, CompletionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            CompletionError::from_status(401, "Invalid API Key".into()),
            CompletionError::Unauthorized { status: 401, .. }
        ));
        assert!(matches!(
            CompletionError::from_status(429, "slow down".into()),
            CompletionError::RateLimited(_)
        ));
        assert!(matches!(
            CompletionError::from_status(400, "bad".into()),
            CompletionError::BadRequest { .. }
        ));
        assert!(matches!(
            CompletionError::from_status(503, "down".into()),
            CompletionError::Provider { status: 503, .. }
        ));
    }

    #[test]
    fn test_empty_provider_message_still_describes_failure() {
        let err = CompletionError::from_status(500, "   ".into());
        assert_eq!(err.to_string(), "provider error 500: no details provided");
    }

    #[test]
    fn test_timeout_message() {
        let err = CompletionError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "request timed out after 30s");
    }
}
