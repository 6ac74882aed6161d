//! Build-logic input fingerprints and the cache validity check.
//!
//! During a cache-miss build every input the build logic reads is recorded as a
//! [`RecordedInput`], optionally scoped to one project. On later builds the
//! [`FingerprintChecker`] re-evaluates the recorded stream against the current
//! [`Host`] state and produces a [`CheckedFingerprint`] verdict deciding which
//! parts of the stored configuration can be reused.

#![warn(missing_docs)]

pub mod checker;
pub mod error;
pub mod hasher;
pub mod host;
pub mod input;
pub mod recorder;
pub mod stream;
pub mod system;

pub use checker::{CheckedFingerprint, FingerprintChecker, InvalidationReason};
pub use error::FingerprintError;
pub use hasher::FileHasher;
pub use host::{Host, ValueSource};
pub use input::{FileSet, FingerprintEntry, InputFile, ObtainedValue, RecordedInput, ValueSnapshot};
pub use recorder::FingerprintRecorder;
pub use stream::{encode_entries, FingerprintReader, FingerprintWriter};
pub use system::{FileSystemHost, ValueSourceRegistry};
