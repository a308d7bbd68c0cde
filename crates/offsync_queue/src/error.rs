//! Error types for the sync queue.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur in the sync queue.
///
/// A terminal item failure is a *status* (`ItemStatus::Failed`), not an
/// error: drain passes report it through history and events and keep
/// going. These variants surface store failures, codec failures, and
/// transport-level outcomes of individual calls.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Durable store error.
    #[error("store error: {0}")]
    Store(#[from] offsync_store::StoreError),

    /// Item encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The injected transport rejected or failed a call.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the call can be retried.
        retryable: bool,
    },

    /// A transport call exceeded the configured timeout.
    #[error("transport call timed out")]
    Timeout,

    /// The host reports no connectivity.
    #[error("not connected")]
    Offline,
}

impl QueueError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        QueueError::Codec(message.into())
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        QueueError::Transport {
            message: message.into(),
            retryable,
        }
    }

    /// Returns true if the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::Transport { retryable, .. } => *retryable,
            QueueError::Timeout | QueueError::Offline => true,
            QueueError::Store(_) | QueueError::Codec(_) => false,
        }
    }
}
