//! Error types for the cache tier.

use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur in the cache tier.
///
/// A read miss is **not** an error; `get` resolves misses through the
/// caller-supplied fallback. These variants surface only store failures,
/// codec failures, and transform failures on the write path.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Durable store error.
    #[error("store error: {0}")]
    Store(#[from] offsync_store::StoreError),

    /// Entry encoding or decoding failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The pluggable value transform failed to invert a stored value.
    #[error("transform error: {0}")]
    Transform(String),

    /// A transformed entry was read but no transform is configured.
    #[error("entry {key} is transformed but no transform is configured")]
    MissingTransform {
        /// The affected cache key.
        key: String,
    },
}

impl CacheError {
    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }

    /// Creates a transform error.
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }
}
