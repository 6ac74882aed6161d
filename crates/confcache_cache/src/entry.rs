//! Manifest of a stored cache entry.
//!
//! The manifest is stored as `entry.json` in the entry directory. It is written
//! last when an entry is stored, so an entry without a readable manifest is
//! treated as absent.

use std::collections::BTreeMap;
use std::path::Path;

use confcache_common::ScopePath;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Name of the manifest file within an entry directory.
pub(crate) const ENTRY_FILE: &str = "entry.json";

/// Index of one stored configuration cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryManifest {
    /// Tool version that produced this entry. Invalidate on version change.
    pub tool_version: String,

    /// Cache key the entry was stored under.
    pub key: String,

    /// Model artifact key of every configured project.
    pub projects: BTreeMap<ScopePath, String>,
}

impl EntryManifest {
    /// Creates an empty manifest.
    pub fn new(tool_version: &str, key: &str) -> Self {
        Self {
            tool_version: tool_version.to_string(),
            key: key.to_string(),
            projects: BTreeMap::new(),
        }
    }

    /// Loads the manifest from `entry_dir`, returning `None` if the file
    /// doesn't exist or can't be parsed.
    pub fn load(entry_dir: &Path) -> Option<Self> {
        let path = entry_dir.join(ENTRY_FILE);
        let content = std::fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Saves the manifest to `entry_dir`, creating the directory if needed.
    pub fn save(&self, entry_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(entry_dir).map_err(|e| CacheError::io(entry_dir, e))?;
        let path = entry_dir.join(ENTRY_FILE);
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        std::fs::write(&path, json).map_err(|e| CacheError::io(path, e))
    }

    /// Returns `true` if this entry was produced by a compatible tool version.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.tool_version == current_version
    }
}
