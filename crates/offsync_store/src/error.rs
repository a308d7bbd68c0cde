//! Error types for the store crate.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error from the underlying file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The persisted snapshot is corrupt or from an unknown version.
    #[error("snapshot corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },
}

impl StoreError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::codec("bad tag");
        assert_eq!(err.to_string(), "codec error: bad tag");

        let err = StoreError::corruption("short header");
        assert!(err.to_string().contains("short header"));
    }
}
