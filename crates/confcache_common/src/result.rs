//! Common result and error types for the configuration cache.

/// The standard result type for operations that can only fail on a bug.
///
/// `Err` indicates an internal consistency failure in the cache (for example,
/// decorating two root builds in one build tree), never an invalidation.
pub type CacheResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in the cache wiring, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal configuration cache error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
