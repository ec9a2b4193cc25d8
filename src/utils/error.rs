//! Error Handling Module
//!
//! Defines the error type shared by every stage of the classification pipeline.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for tomato leaf classification
#[derive(Error, Debug)]
pub enum LeafError {
    /// Missing or invalid startup artifact (label map, description table, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The model record could not be loaded
    #[error("Failed to load model at '{0}': {1}")]
    ModelLoad(PathBuf, String),

    /// Rejected upload (missing file, disallowed extension, empty payload)
    #[error("Invalid upload: {0}")]
    Validation(String),

    /// Request body exceeded the configured upload limit
    #[error("Upload too large: {0}")]
    TooLarge(String),

    /// The uploaded bytes are not a decodable image
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// Failure inside the prediction call
    #[error("Inference error: {0}")]
    Inference(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeafError {
    /// Whether the error was caused by the caller's input rather than by the server.
    ///
    /// Front-ends map user errors to a 4xx-equivalent and everything else to a
    /// 500-equivalent.
    pub fn is_user_error(&self) -> bool {
        matches!(self, LeafError::Validation(_) | LeafError::TooLarge(_))
    }
}

impl From<image::ImageError> for LeafError {
    fn from(err: image::ImageError) -> Self {
        LeafError::Decode(err.to_string())
    }
}

/// Convenience Result type for classification operations
pub type Result<T> = std::result::Result<T, LeafError>;

/// Extension trait for turning foreign errors into configuration errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| LeafError::Config(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| LeafError::Config(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| LeafError::Config(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| LeafError::Config(f()))
    }
}
