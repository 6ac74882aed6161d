//! On-disk layout of configuration cache entries.
//!
//! Each entry lives in `<cache_dir>/<key>/`:
//!
//! - `fingerprint.bin`: the recorded fingerprint stream
//! - `models/`: one artifact per configured project
//! - `entry.json`: the [`EntryManifest`], written last
//!
//! Reads are fail-safe: a missing, partial, or incompatible entry is a cache
//! miss, never an error.

use std::path::{Path, PathBuf};

use confcache_common::ScopePath;
use confcache_fingerprint::{FingerprintError, FingerprintReader};
use tracing::{debug, warn};

use crate::artifact::ModelStore;
use crate::entry::{EntryManifest, ENTRY_FILE};
use crate::error::CacheError;
use crate::key::ConfigurationCacheKey;
use crate::model::{BuildModel, ProjectModel};

/// Name of the fingerprint stream file within an entry directory.
const FINGERPRINT_FILE: &str = "fingerprint.bin";

/// Subdirectory holding model artifacts.
const MODELS_SUBDIR: &str = "models";

/// Reads and writes cache entries under one cache directory.
pub struct ConfigurationCacheRepository {
    cache_dir: PathBuf,
    tool_version: String,
}

/// A cache entry loaded from disk.
pub struct StoredEntry {
    manifest: EntryManifest,
    fingerprint: Vec<u8>,
    models: ModelStore,
}

impl ConfigurationCacheRepository {
    /// Creates a repository rooted at `cache_dir`.
    pub fn new(cache_dir: &Path, tool_version: &str) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
            tool_version: tool_version.to_string(),
        }
    }

    /// Returns the directory of the entry stored under `key`.
    pub fn entry_dir(&self, key: &ConfigurationCacheKey) -> PathBuf {
        self.cache_dir.join(key.as_str())
    }

    /// Loads the entry stored under `key`.
    pub fn load(&self, key: &ConfigurationCacheKey) -> Option<StoredEntry> {
        let dir = self.entry_dir(key);
        let Some(manifest) = EntryManifest::load(&dir) else {
            debug!("no readable entry at {}", dir.display());
            return None;
        };
        if !manifest.is_compatible(&self.tool_version) {
            debug!(
                "entry {key} was stored by version {}, ignoring it",
                manifest.tool_version
            );
            return None;
        }
        if manifest.key != key.as_str() {
            warn!("entry {key} names key {}, ignoring it", manifest.key);
            return None;
        }
        let fingerprint_path = dir.join(FINGERPRINT_FILE);
        let fingerprint = match std::fs::read(&fingerprint_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("cannot read {}: {e}", fingerprint_path.display());
                return None;
            }
        };
        Some(StoredEntry {
            manifest,
            fingerprint,
            models: ModelStore::new(&dir.join(MODELS_SUBDIR), &self.tool_version),
        })
    }

    /// Stores `model` and its fingerprint stream under `key`.
    ///
    /// The previous manifest is removed first and the new one written last, so
    /// an interrupted store leaves no loadable entry behind.
    pub fn store(
        &self,
        key: &ConfigurationCacheKey,
        fingerprint: &[u8],
        model: &BuildModel,
    ) -> Result<(), CacheError> {
        let dir = self.entry_dir(key);
        remove_if_present(&dir.join(ENTRY_FILE))?;
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;

        let models = ModelStore::new(&dir.join(MODELS_SUBDIR), &self.tool_version);
        let mut manifest = EntryManifest::new(&self.tool_version, key.as_str());
        for (path, project) in &model.projects {
            let model_key = models.write_model(project)?;
            manifest.projects.insert(path.clone(), model_key);
        }

        let fingerprint_path = dir.join(FINGERPRINT_FILE);
        std::fs::write(&fingerprint_path, fingerprint)
            .map_err(|e| CacheError::io(fingerprint_path, e))?;
        manifest.save(&dir)?;

        let live_keys: Vec<&str> = manifest.projects.values().map(String::as_str).collect();
        let removed = models.gc(&live_keys)?;
        debug!(
            "stored entry {key} with {} projects, removed {removed} stale models",
            manifest.projects.len()
        );
        Ok(())
    }

    /// Deletes the entry stored under `key`, if any.
    pub fn invalidate(&self, key: &ConfigurationCacheKey) -> Result<(), CacheError> {
        let dir = self.entry_dir(key);
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io(dir, e)),
        }
    }
}

impl StoredEntry {
    /// Returns the entry manifest.
    pub fn manifest(&self) -> &EntryManifest {
        &self.manifest
    }

    /// Returns the raw fingerprint stream.
    pub fn fingerprint(&self) -> &[u8] {
        &self.fingerprint
    }

    /// Opens the fingerprint stream for reading.
    pub fn fingerprint_reader(&self) -> Result<FingerprintReader<&[u8]>, FingerprintError> {
        FingerprintReader::new(self.fingerprint.as_slice())
    }

    /// Returns the projects recorded in the entry.
    pub fn projects(&self) -> impl Iterator<Item = &ScopePath> {
        self.manifest.projects.keys()
    }

    /// Loads the stored model of `project`.
    ///
    /// Returns `None` if the project is not part of the entry or its artifact
    /// is missing or corrupt.
    pub fn load_project(&self, project: &ScopePath) -> Option<ProjectModel> {
        let model_key = self.manifest.projects.get(project)?;
        self.models
            .read_model(model_key)
            .filter(|model| &model.path == project)
    }

    /// Loads every stored project model, or `None` if any one is unreadable.
    pub fn load_all(&self) -> Option<BuildModel> {
        let mut projects = Vec::with_capacity(self.manifest.projects.len());
        for project in self.manifest.projects.keys() {
            projects.push(self.load_project(project)?);
        }
        Some(BuildModel::from_projects(projects))
    }
}

fn remove_if_present(path: &Path) -> Result<(), CacheError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(path, e)),
    }
}
