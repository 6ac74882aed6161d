//! Configuration types deserialized from `confcache.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default cache directory, relative to the build root.
pub const DEFAULT_CACHE_DIR: &str = ".confcache";

/// Tool version recorded in entries when the configuration does not name one.
pub const DEFAULT_TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The top-level configuration parsed from `confcache.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildModelParameters {
    /// Configuration cache settings.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// The `[cache]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether the configuration cache is used at all.
    pub enabled: bool,
    /// Whether stale scope-specific inputs invalidate only their scope.
    ///
    /// When `false`, any stale input discards the whole entry.
    pub project_scope_model_cache: bool,
    /// Cache root, resolved against the build root when relative.
    pub dir: PathBuf,
    /// Version of the tool writing entries. Entries from other versions are ignored.
    pub tool_version: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            project_scope_model_cache: true,
            dir: PathBuf::from(DEFAULT_CACHE_DIR),
            tool_version: DEFAULT_TOOL_VERSION.to_string(),
        }
    }
}

impl BuildModelParameters {
    /// Returns `true` if the configuration cache is enabled.
    pub fn is_configuration_cache(&self) -> bool {
        self.cache.enabled
    }

    /// Returns `true` if stored state may be reused per scope.
    pub fn is_project_scope_model_cache(&self) -> bool {
        self.cache.enabled && self.cache.project_scope_model_cache
    }

    /// Resolves the cache directory against `build_root`.
    pub fn cache_dir(&self, build_root: &Path) -> PathBuf {
        if self.cache.dir.is_absolute() {
            self.cache.dir.clone()
        } else {
            build_root.join(&self.cache.dir)
        }
    }
}
