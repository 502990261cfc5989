use thiserror::Error;

/// Errors produced by the annotation core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Non-fatal: callers fall back to the built-in face.
    #[error("Font unavailable: {0}")]
    FontUnavailable(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed detection at row {index}: {reason}")]
    MalformedDetection { index: usize, reason: String },

    #[error("Sample dataset error: {0}")]
    Samples(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
