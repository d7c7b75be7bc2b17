//! Error types for deck editing and rendering.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing or rendering a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// The text-completion oracle could not produce a reply.
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// A candidate document failed schema validation.
    #[error("Invalid document: {0}")]
    InvalidDocument(#[from] ValidationError),

    /// Writing the slide-deck container failed.
    #[error("Render failure: {0}")]
    RenderFailure(String),

    /// Failed to read or write a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (reading a rendered deck).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (reading a rendered deck).
    #[error("XML parsing error: {0}")]
    XmlError(String),
}

/// Reason a candidate payload was not accepted as a [`Document`](crate::Document).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
