use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by ModelScope operations.
#[derive(Error, Debug)]
pub enum ModelScopeError {
    /// Neither the primary nor the fallback credential variable held a token.
    #[error("No API key found: set {primary} or {fallback}")]
    MissingApiKey { primary: String, fallback: String },

    /// The configured token was empty.
    #[error("API key must not be empty")]
    EmptyApiKey,

    /// A blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// The request was rejected before anything was sent.
    #[error("prompt must not be empty")]
    EmptyPrompt,

    /// ModelScope returned a non-success HTTP status.
    #[error("API request failed: HTTP {status}")]
    Http { status: u16, body: String },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The downloaded bytes could not be decoded or re-encoded.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Filesystem failure while saving the output.
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ModelScopeError>;
