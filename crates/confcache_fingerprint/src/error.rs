//! Error types for fingerprint recording and checking.
//!
//! None of these represent an invalidation. A stale input is reported as data
//! in the verdict; these errors mean the check itself could not be completed
//! and the whole build attempt must not trust the stored entry.

use std::path::PathBuf;

use confcache_common::ScopePath;

/// Errors that abort fingerprint recording or checking.
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// An I/O error occurred while probing a file.
    #[error("fingerprint I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A host probe could not produce a definitive answer.
    #[error("probe '{operation}' failed: {reason}")]
    Probe {
        /// Name of the failed probe.
        operation: &'static str,
        /// Description of the failure.
        reason: String,
    },

    /// A recorded value source names a type the host cannot instantiate.
    #[error("unknown value source type '{type_name}'")]
    UnknownValueSource {
        /// The unrecognized type name.
        type_name: String,
    },

    /// The stream contains an input this reader does not understand.
    #[error("unexpected configuration cache fingerprint: {reason}")]
    UnexpectedFingerprint {
        /// Description of the decoding failure.
        reason: String,
    },

    /// The stream framing is damaged (truncated or oversized frame).
    #[error("corrupt fingerprint stream: {reason}")]
    CorruptStream {
        /// Description of the damage.
        reason: String,
    },

    /// The stream header does not match this format.
    #[error("unsupported fingerprint stream format: {reason}")]
    UnsupportedFormat {
        /// Description of the header problem.
        reason: String,
    },

    /// A global-only input was recorded against a scope.
    #[error("{kind} input cannot be scoped to {scope}")]
    UnscopableInput {
        /// Kind of the rejected input.
        kind: &'static str,
        /// The scope it was recorded against.
        scope: ScopePath,
    },

    /// An input could not be encoded into the stream.
    #[error("fingerprint serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl FingerprintError {
    /// Wraps an I/O error raised for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
