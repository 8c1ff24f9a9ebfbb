use thiserror::Error;

/// Failures of a single request against the graph platform.
///
/// None of these are retried by the transport layer itself.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    Decode(String),

    #[error("Request failed: {0}")]
    Network(String),
}

impl TransportError {
    /// HTTP status code, when the platform answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TandemError {
    // Platform errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("No run_id returned from the API")]
    NoRunId,

    #[error("Stream error: {0}")]
    Stream(String),

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    // Local agent errors
    #[error("Error in question agent: {0}")]
    Reasoning(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TandemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_error_keeps_error_prefix() {
        let err = TandemError::Reasoning("model unavailable".into());
        assert!(err.to_string().starts_with("Error"));
    }

    #[test]
    fn test_transport_status_is_transparent() {
        let err: TandemError = TransportError::Status {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_eq!(err.to_string(), "HTTP 503: busy");
    }
}
