//! Error types for the Chatbrain analysis pipeline.
//!
//! Errors are organized by the layer that raises them: input validation and
//! normalization happen before any pipeline state exists, remote errors are
//! tagged with the stage that produced them.

use thiserror::Error;

use crate::types::{Generation, Stage};

/// Top-level error type for Chatbrain operations.
#[derive(Error, Debug)]
pub enum ChatbrainError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Submitted input set was rejected
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Image normalization failed
    #[error("Normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    /// Remote stage call failed
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Reasons a submitted input set is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No files were submitted")]
    Empty,

    #[error("Too many files: {count} submitted, at most {max} allowed")]
    TooManyItems { count: usize, max: usize },

    #[error("A file of an invalid format was submitted: {name} ({mime_type})")]
    UnsupportedKind { name: String, mime_type: String },

    #[error("All files should be of the same type and extension")]
    MixedKinds,

    #[error("All files should be of the same type and extension (found: {})", .extensions.join(", "))]
    MixedExtensions { extensions: Vec<String> },

    #[error("Only one text file is allowed, {count} submitted")]
    MultipleTextItems { count: usize },

    #[error("The total size of the files ({total} bytes) exceeds the {max} byte limit")]
    TooLarge { total: u64, max: u64 },
}

/// Image normalization failures. Any one of these fails the whole input set.
#[derive(Error, Debug)]
pub enum NormalizeError {
    /// Image bytes could not be decoded
    #[error("Decode error for {name}: {message}")]
    Decode { name: String, message: String },

    /// Resized image could not be re-encoded
    #[error("Encode error for {name}: {message}")]
    Encode { name: String, message: String },

    /// The blocking decode task did not complete
    #[error("Decode task for {name} failed: {message}")]
    Join { name: String, message: String },
}

/// Failures of a remote stage call.
#[derive(Error, Debug, Clone)]
pub enum RemoteError {
    /// The request could not be built or sent
    #[error("{stage} request failed: {message}")]
    Request { stage: Stage, message: String },

    /// The service answered with a non-success status
    #[error("{stage} HTTP {status}: {body}")]
    Http {
        stage: Stage,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected record
    #[error("Failed to parse {stage} response: {message}")]
    Decode { stage: Stage, message: String },

    /// Configured request timeout elapsed
    #[error("{stage} call timed out after {timeout_ms}ms")]
    Timeout { stage: Stage, timeout_ms: u64 },
}

impl RemoteError {
    /// The stage whose call produced this error.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Request { stage, .. }
            | Self::Http { stage, .. }
            | Self::Decode { stage, .. }
            | Self::Timeout { stage, .. } => *stage,
        }
    }
}

/// Result aggregation refused an update.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    #[error("Stale {what} for generation {got}, current generation is {current}")]
    StaleGeneration {
        what: &'static str,
        got: Generation,
        current: Generation,
    },
}

/// Convenience type alias for Chatbrain results.
pub type Result<T> = std::result::Result<T, ChatbrainError>;
