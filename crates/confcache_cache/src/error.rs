//! Error types for cache operations.

use std::path::PathBuf;

use confcache_common::{InternalError, ScopePath};
use confcache_fingerprint::FingerprintError;

/// Errors that can occur during cache operations.
///
/// Reads of stored entries are fail-safe and turn problems into cache misses;
/// these errors come from writes, from failed fingerprint checks, and from the
/// build logic that configures projects.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// Recording or checking the fingerprint failed.
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// The cache was wired up inconsistently.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// Build logic failed to configure a project.
    #[error("failed to configure {project}: {reason}")]
    Configuration {
        /// The project being configured.
        project: ScopePath,
        /// Description of the failure.
        reason: String,
    },

    /// No provider knows the requested project component.
    #[error("{project} not found.")]
    ComponentNotFound {
        /// The requested project.
        project: ScopePath,
    },
}

impl CacheError {
    /// Wraps an I/O error raised for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
