use thiserror::Error;

#[derive(Debug, Error)]
pub enum OptionScanError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid expiration: {expiration} — {reason}")]
    InvalidExpiration { expiration: String, reason: String },

    #[error("Position not found: {id}")]
    NotFound { id: String },

    #[error("Position {id} is already {status}")]
    AlreadyClosed { id: String, status: String },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for OptionScanError {
    fn from(e: serde_json::Error) -> Self {
        OptionScanError::SerializationError(e.to_string())
    }
}
