//! Cache keys identifying one build invocation shape.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use confcache_common::ContentHasher;

/// Identifies the stored entry that may serve a build.
///
/// Two invocations share a key when they run the same tool version on the
/// same build root with the same requested tasks and start parameters. Task
/// order is significant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigurationCacheKey(String);

impl ConfigurationCacheKey {
    /// Computes the key of an invocation.
    pub fn new(
        tool_version: &str,
        build_root: &Path,
        requested_tasks: &[String],
        start_parameters: &BTreeMap<String, String>,
    ) -> Self {
        let mut hasher = ContentHasher::new();
        hasher
            .put_str(tool_version)
            .put_str(&build_root.to_string_lossy());
        hasher.put_bytes(&(requested_tasks.len() as u64).to_le_bytes());
        for task in requested_tasks {
            hasher.put_str(task);
        }
        for (name, value) in start_parameters {
            hasher.put_str(name).put_str(value);
        }
        Self(hasher.finish().to_string())
    }

    /// Returns the key as a hex string, usable as a directory name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigurationCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
