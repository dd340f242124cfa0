use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the stream client for one turn.
///
/// None of these trigger an internal retry; whether to resend belongs to the
/// caller. Caller-initiated cancellation is not represented here at all:
/// a cancelled stream ends silently.
#[derive(Debug, Error)]
pub enum StreamError {
    /// 4xx from the gateway, rate limiting excluded. The request itself is
    /// bad and resending it unchanged will not help.
    #[error("chat endpoint rejected the request: {0}")]
    Client(StatusCode),

    /// 5xx or 429. Possibly transient, surfaced without retry.
    #[error("chat endpoint is unavailable: {0}")]
    Upstream(StatusCode),

    /// Connection could not be opened, or broke mid-stream.
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway sends no heartbeat, so a silent stream is indistinguishable
    /// from a dead one past this deadline.
    #[error("no event received within {0:?}")]
    IdleTimeout(Duration),
}

impl StreamError {
    /// Classify a response status. `None` means the stream may be consumed.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            None
        } else if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
            Some(StreamError::Client(status))
        } else {
            Some(StreamError::Upstream(status))
        }
    }
}

/// Failures surfaced by the chat session layer.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A response is still streaming for this conversation. The prior stream
    /// is left running; stop it explicitly before sending again.
    #[error("a response is already streaming for this conversation")]
    StreamInFlight,

    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_statuses_pass_through() {
        assert!(StreamError::from_status(StatusCode::OK).is_none());
        assert!(StreamError::from_status(StatusCode::CREATED).is_none());
    }

    #[test]
    fn client_errors_are_fatal() {
        assert!(matches!(
            StreamError::from_status(StatusCode::NOT_FOUND),
            Some(StreamError::Client(status)) if status == StatusCode::NOT_FOUND
        ));
        assert!(matches!(
            StreamError::from_status(StatusCode::BAD_REQUEST),
            Some(StreamError::Client(_))
        ));
    }

    #[test]
    fn rate_limit_is_classified_upstream() {
        assert!(matches!(
            StreamError::from_status(StatusCode::TOO_MANY_REQUESTS),
            Some(StreamError::Upstream(status)) if status == StatusCode::TOO_MANY_REQUESTS
        ));
    }

    #[test]
    fn server_errors_are_upstream() {
        assert!(matches!(
            StreamError::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(StreamError::Upstream(_))
        ));
        assert!(matches!(
            StreamError::from_status(StatusCode::BAD_GATEWAY),
            Some(StreamError::Upstream(_))
        ));
    }
}
