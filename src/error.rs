// Error types - NEO Watch
// Shared by the feed client, the physics model and the background tasks

use thiserror::Error;

/// Result type for NEO Watch operations
pub type NeoResult<T> = Result<T, NeoError>;

#[derive(Error, Debug)]
pub enum NeoError {
    /// Request failed or the API answered with a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// Response body was not in the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Numeric input outside the model's domain
    #[error("Validation error: {0}")]
    Validation(String),

    /// A background task (render thread or feed poller) could not be
    /// started, failed while drawing, or died before it was joined
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),
}

impl NeoError {
    /// True for errors raised by the feed collaborator, which the
    /// presentation layer turns into an "unavailable" state.
    pub fn is_feed_error(&self) -> bool {
        matches!(self, NeoError::Network(_) | NeoError::Parse(_))
    }
}

impl From<reqwest::Error> for NeoError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            NeoError::Parse(err.to_string())
        } else {
            NeoError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NeoError {
    fn from(err: serde_json::Error) -> Self {
        NeoError::Parse(err.to_string())
    }
}

impl From<chrono::ParseError> for NeoError {
    fn from(err: chrono::ParseError) -> Self {
        NeoError::Validation(format!("bad date: {}", err))
    }
}
