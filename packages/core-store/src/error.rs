//! Error types for file store operations.

use std::fmt;

use crate::path::{FilePath, PathError};

/// A failure raised by a caller-supplied chunk producer.
///
/// The store never inspects the inner error; it only aborts the write
/// and hands the failure back to the caller.
#[derive(Debug)]
pub struct ProducerError {
    inner: Box<dyn std::error::Error + Send + Sync>,
}

impl ProducerError {
    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ProducerError {
            inner: error.into(),
        }
    }

    /// Producer failure with a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(message.into())
    }

    pub fn into_inner(self) -> Box<dyn std::error::Error + Send + Sync> {
        self.inner
    }
}

impl fmt::Display for ProducerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl std::error::Error for ProducerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.inner.as_ref())
    }
}

impl From<std::io::Error> for ProducerError {
    fn from(e: std::io::Error) -> Self {
        ProducerError::new(e)
    }
}

/// Errors returned by file store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not a well-formed path, or the path is not allowed for
    /// the operation (e.g. writing to the root, moving a directory into
    /// itself).
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Nothing exists at the path.
    #[error("not found: {path}")]
    NotFound { path: FilePath },

    /// The operation needs a directory at (or above) the path and found a
    /// file, or needs a file slot and found a populated directory.
    #[error("not a directory: {path}")]
    NotADirectory { path: FilePath },

    /// The operation needs a file and found a directory.
    #[error("not a file: {path}")]
    NotAFile { path: FilePath },

    /// The chunk producer failed before it was exhausted.
    #[error("chunk producer failed: {0}")]
    Producer(#[from] ProducerError),

    /// Error from the backing medium.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_path(path: impl fmt::Display, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}

impl From<PathError> for Error {
    fn from(e: PathError) -> Self {
        Error::InvalidPath {
            path: e.input().to_string(),
            reason: e.to_string(),
        }
    }
}

/// Result type alias for file store operations.
pub type Result<T> = std::result::Result<T, Error>;
