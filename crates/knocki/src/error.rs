//! Error types for the Knocki client

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Result type for client operations
pub type KnockiResult<T> = Result<T, KnockiError>;

/// Errors returned by [`KnockiClient`](crate::KnockiClient)
#[derive(Debug, Error)]
pub enum KnockiError {
    #[error("timeout occurred while connecting to Knocki")]
    Timeout,

    #[error("error occurred while communicating with Knocki: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("websocket error while communicating with Knocki: {0}")]
    WebSocket(#[source] Box<tungstenite::Error>),

    #[error("unexpected status {status} from Knocki: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// Credentials or token were rejected
    #[error("invalid credentials for Knocki")]
    InvalidAuth,

    /// An authenticated call was made before a token was set
    #[error("not authenticated, log in or set a token first")]
    NotAuthenticated,

    #[error("unexpected response from Knocki (content type '{content_type}'): {body}")]
    UnexpectedResponse { content_type: String, body: String },

    #[error("failed to parse Knocki response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("a websocket listener is already running")]
    ListenerAlreadyRunning,
}

impl KnockiError {
    /// Whether the failure happened on the wire rather than in the payload
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            KnockiError::Timeout
                | KnockiError::Connection(_)
                | KnockiError::WebSocket(_)
                | KnockiError::UnexpectedStatus { .. }
        )
    }
}

impl From<reqwest::Error> for KnockiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            KnockiError::Timeout
        } else {
            KnockiError::Connection(err)
        }
    }
}

impl From<tungstenite::Error> for KnockiError {
    fn from(err: tungstenite::Error) -> Self {
        KnockiError::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_classification() {
        assert!(KnockiError::Timeout.is_connection_error());
        assert!(KnockiError::UnexpectedStatus {
            status: 500,
            body: String::new()
        }
        .is_connection_error());
        assert!(KnockiError::from(tungstenite::Error::ConnectionClosed).is_connection_error());

        assert!(!KnockiError::InvalidAuth.is_connection_error());
        assert!(!KnockiError::NotAuthenticated.is_connection_error());
        assert!(!KnockiError::UnexpectedResponse {
            content_type: "plain/text".into(),
            body: "Yes".into()
        }
        .is_connection_error());
    }
}
