//! Storage error types.

use thiserror::Error;

/// Errors from a user storage backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backend could not be read or written.
    ///
    /// May be transient (disk full, lock contention) or permanent
    /// (permissions). Check the message.
    #[error("storage I/O error: {0}")]
    Io(String),

    /// The stored document could not be encoded or decoded.
    ///
    /// Indicates a corrupt or hand-edited document. Not retryable.
    #[error("storage serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
