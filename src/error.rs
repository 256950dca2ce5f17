//! @ai:module:intent Define error types for the doc-block parser and printer
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for API misuse and the I/O around it
///
/// Content anomalies (malformed comments, unknown tags) never show up here;
/// they degrade into generic tokens and nodes instead.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller broke the API contract, e.g. passed an empty tag name.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Internal state is inconsistent, e.g. printing a detached block.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// @ai:intent Shorthand for building a contract violation
    pub fn contract(message: impl Into<String>) -> Self {
        Error::ContractViolation(message.into())
    }

    /// @ai:intent Shorthand for building an invariant violation
    pub fn invariant(message: impl Into<String>) -> Self {
        Error::InvariantViolation(message.into())
    }
}
