//! The environment probe consulted while checking a fingerprint.

use std::path::{Path, PathBuf};

use confcache_common::ContentHash;

use crate::error::FingerprintError;
use crate::input::{FileSet, ObtainedValue, ValueSnapshot};

/// Read-only view of the current build environment.
///
/// Every operation reads current process, filesystem, or environment state and
/// never mutates it. Operations may be expensive (hashing large files), so the
/// checker calls them only when an input actually needs evaluating.
pub trait Host {
    /// The user home directory of the current build.
    fn gradle_user_home_dir(&self) -> PathBuf;

    /// The init scripts of the current build, in application order.
    fn all_init_scripts(&self) -> Vec<PathBuf>;

    /// Start time of the current build, in epoch milliseconds.
    fn build_start_time(&self) -> u64;

    /// Fingerprint of the runtime executing the current build.
    fn jvm_fingerprint(&self) -> String;

    /// Current value of a Gradle property.
    fn gradle_property(&self, name: &str) -> Option<String>;

    /// Current value of a system property.
    fn system_property(&self, name: &str) -> Option<String>;

    /// Current value of an environment variable.
    ///
    /// A value that is set but cannot be read as text is an error, not `None`.
    fn environment_variable(&self, name: &str) -> Result<Option<String>, FingerprintError>;

    /// Current aggregate fingerprint of a declared file set.
    fn fingerprint_of(&self, file_set: &FileSet) -> Result<ContentHash, FingerprintError>;

    /// Current content hash of a file, `None` if it no longer exists.
    fn hash_code_of(&self, file: &Path) -> Result<Option<ContentHash>, FingerprintError>;

    /// Human-readable name of a file or directory for invalidation messages.
    fn display_name_of(&self, file_or_directory: &Path) -> String;

    /// Rebuilds the value source that produced `obtained_value`.
    fn instantiate_value_source(
        &self,
        obtained_value: &ObtainedValue,
    ) -> Result<Box<dyn ValueSource>, FingerprintError>;
}

/// A recomputable build-logic input.
pub trait ValueSource {
    /// Computes the current value.
    fn obtain(&self) -> Result<ValueSnapshot, FingerprintError>;

    /// Type name used in generic invalidation messages.
    fn type_name(&self) -> &str;

    /// Self-description used in invalidation messages, if the source has one.
    fn display_name(&self) -> Option<String> {
        None
    }
}
