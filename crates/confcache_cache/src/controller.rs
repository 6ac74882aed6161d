//! Reuse-or-rebuild decision for the root build and the controllers that act on it.
//!
//! [`BuildTreeConfigurationCache::prepare`] checks the stored fingerprint
//! against the current host and turns the verdict into a [`ConfigurationPlan`].
//! [`ConfigurationCacheAwareModelController`] carries the plan out against the
//! uncached [`BuildModelCreator`] and stores the refreshed entry.

use std::collections::BTreeSet;
use std::path::Path;

use confcache_common::{InternalError, ScopePath};
use confcache_config::BuildModelParameters;
use confcache_fingerprint::{
    CheckedFingerprint, FingerprintChecker, FingerprintEntry, FingerprintError,
    FingerprintRecorder, Host, InvalidationReason,
};
use tracing::{debug, info, warn};

use crate::component::{
    CacheAwareComponentProvider, LocalComponentProvider, LocalComponentRegistry,
};
use crate::error::CacheError;
use crate::key::ConfigurationCacheKey;
use crate::model::{BuildModel, BuildModelCreator, ProjectModel};
use crate::repository::{ConfigurationCacheRepository, StoredEntry};

/// Reason reported when no usable entry is stored.
pub const NO_CACHED_CONFIGURATION: &str = "no cached configuration available";

/// What the root build must do to obtain its model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationPlan {
    /// Every stored project is up to date.
    Reuse {
        /// The stored model.
        model: BuildModel,
    },
    /// Some projects must be configured again; the rest are loaded.
    PartialRebuild {
        /// First stale input found.
        reason: InvalidationReason,
        /// Stored models of the up-to-date projects.
        reused: BuildModel,
        /// Projects to configure again.
        rebuild: BTreeSet<ScopePath>,
    },
    /// The stored entry is unusable and the whole build must be configured.
    FullRebuild {
        /// Why nothing could be reused.
        reason: InvalidationReason,
    },
}

/// The configuration cache of one build tree.
pub struct BuildTreeConfigurationCache {
    repository: ConfigurationCacheRepository,
    key: ConfigurationCacheKey,
    project_scope_model_cache: bool,
    retained: Vec<FingerprintEntry>,
}

impl BuildTreeConfigurationCache {
    /// Creates the cache of the build rooted at `build_root` for invocations
    /// identified by `key`.
    pub fn new(
        params: &BuildModelParameters,
        build_root: &Path,
        key: ConfigurationCacheKey,
    ) -> Self {
        Self {
            repository: ConfigurationCacheRepository::new(
                &params.cache_dir(build_root),
                &params.cache.tool_version,
            ),
            key,
            project_scope_model_cache: params.is_project_scope_model_cache(),
            retained: Vec::new(),
        }
    }

    /// Returns the key entries are stored under.
    pub fn key(&self) -> &ConfigurationCacheKey {
        &self.key
    }

    /// Decides how the root build obtains its model.
    ///
    /// A missing or unreadable entry is a full rebuild, and so is a stream with
    /// damaged framing, which is deleted. An input the stream reader does not
    /// understand is returned as an error after the entry is deleted, so the
    /// next attempt starts from a miss. Failing host probes are returned as
    /// errors and leave the entry in place.
    pub fn prepare(&mut self, host: &dyn Host) -> Result<ConfigurationPlan, CacheError> {
        self.retained.clear();
        let Some(entry) = self.repository.load(&self.key) else {
            info!("configuration cache miss: {NO_CACHED_CONFIGURATION}");
            return Ok(full_rebuild(NO_CACHED_CONFIGURATION));
        };
        let reader = match entry.fingerprint_reader() {
            Ok(reader) => reader,
            Err(e) => {
                warn!("ignoring entry {}: {e}", self.key);
                return Ok(full_rebuild(NO_CACHED_CONFIGURATION));
            }
        };

        let verdict = match FingerprintChecker::new(host).check_fingerprint(reader) {
            Ok(verdict) => verdict,
            Err(FingerprintError::CorruptStream { reason }) => {
                warn!("entry {} has a corrupt fingerprint stream: {reason}", self.key);
                self.repository.invalidate(&self.key)?;
                return Ok(full_rebuild(NO_CACHED_CONFIGURATION));
            }
            Err(e @ FingerprintError::UnexpectedFingerprint { .. }) => {
                warn!("deleting entry {}: {e}", self.key);
                if let Err(cleanup) = self.repository.invalidate(&self.key) {
                    warn!("cannot delete entry {}: {cleanup}", self.key);
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        let plan = match verdict {
            CheckedFingerprint::Valid => match entry.load_all() {
                Some(model) => ConfigurationPlan::Reuse { model },
                None => {
                    warn!("entry {} has unreadable project models", self.key);
                    full_rebuild(NO_CACHED_CONFIGURATION)
                }
            },
            CheckedFingerprint::EntryInvalid { reason } => {
                ConfigurationPlan::FullRebuild { reason }
            }
            CheckedFingerprint::ProjectsInvalid { reason, .. }
                if !self.project_scope_model_cache =>
            {
                ConfigurationPlan::FullRebuild { reason }
            }
            CheckedFingerprint::ProjectsInvalid {
                reason,
                invalid_projects,
            } => self.partial_rebuild(&entry, reason, invalid_projects)?,
        };

        match &plan {
            ConfigurationPlan::Reuse { model } => info!(
                "reusing configuration cache entry ({} projects)",
                model.projects.len()
            ),
            ConfigurationPlan::PartialRebuild {
                reason, rebuild, ..
            } => info!(
                "configuration cache partially reused, {} projects to configure because {reason}",
                rebuild.len()
            ),
            ConfigurationPlan::FullRebuild { reason } => {
                info!("configuration cache cannot be reused because {reason}")
            }
        }
        Ok(plan)
    }

    fn partial_rebuild(
        &mut self,
        entry: &StoredEntry,
        reason: InvalidationReason,
        mut condemned: BTreeSet<ScopePath>,
    ) -> Result<ConfigurationPlan, CacheError> {
        let mut reused = Vec::new();
        let mut rebuild = BTreeSet::new();
        for project in entry.projects() {
            if condemned.contains(project) {
                rebuild.insert(project.clone());
                continue;
            }
            match entry.load_project(project) {
                Some(model) => reused.push(model),
                None => {
                    debug!("stored model of {project} is unreadable, configuring it again");
                    condemned.insert(project.clone());
                    rebuild.insert(project.clone());
                }
            }
        }

        // Global inputs and inputs of reused projects stay valid for the next entry.
        for item in entry.fingerprint_reader()? {
            let item = item?;
            if item.scope().map_or(true, |scope| !condemned.contains(scope)) {
                self.retained.push(item);
            }
        }

        Ok(ConfigurationPlan::PartialRebuild {
            reason,
            reused: BuildModel::from_projects(reused),
            rebuild,
        })
    }

    /// Takes the fingerprint entries of the stored stream that remain valid
    /// after the last partial rebuild decision.
    pub fn take_retained_entries(&mut self) -> Vec<FingerprintEntry> {
        std::mem::take(&mut self.retained)
    }

    /// Stores `model` with the inputs captured by `recorder`.
    pub fn store(
        &self,
        recorder: &FingerprintRecorder,
        model: &BuildModel,
    ) -> Result<(), CacheError> {
        let fingerprint = recorder.encode()?;
        self.repository.store(&self.key, &fingerprint, model)?;
        info!(
            "stored configuration cache entry {} ({} inputs)",
            self.key,
            recorder.len()
        );
        Ok(())
    }

    /// Deletes the stored entry.
    pub fn invalidate(&self) -> Result<(), CacheError> {
        self.repository.invalidate(&self.key)
    }
}

fn full_rebuild(reason: &str) -> ConfigurationPlan {
    ConfigurationPlan::FullRebuild {
        reason: reason.to_string(),
    }
}

/// How the model of a configured build was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationOutcome {
    /// Configured without the cache.
    Uncached,
    /// Loaded from the cache without running build logic.
    Reused,
    /// Some projects were configured again, the rest were loaded.
    PartiallyReused {
        /// First stale input found.
        reason: InvalidationReason,
        /// Projects configured again.
        rebuilt: BTreeSet<ScopePath>,
    },
    /// Configured from scratch and stored.
    Rebuilt {
        /// Why the stored entry could not be used.
        reason: InvalidationReason,
    },
}

/// A configured build model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfiguredBuild {
    /// The model of every project.
    pub model: BuildModel,
    /// How the model was obtained.
    pub outcome: ConfigurationOutcome,
}

impl ConfiguredBuild {
    /// Returns the projects whose model was loaded from the cache.
    pub fn reused_projects(&self) -> Vec<&ScopePath> {
        match &self.outcome {
            ConfigurationOutcome::Reused => self.model.projects.keys().collect(),
            ConfigurationOutcome::PartiallyReused { rebuilt, .. } => self
                .model
                .projects
                .keys()
                .filter(|project| !rebuilt.contains(*project))
                .collect(),
            ConfigurationOutcome::Uncached | ConfigurationOutcome::Rebuilt { .. } => Vec::new(),
        }
    }

    /// Creates the component registry of this build.
    ///
    /// Components of reused projects are answered from their stored models
    /// before `providers` are asked.
    pub fn component_registry(
        &self,
        providers: Vec<Box<dyn LocalComponentProvider>>,
    ) -> LocalComponentRegistry {
        let reused = self.reused_projects();
        if reused.is_empty() {
            return LocalComponentRegistry::new(providers);
        }
        let cached = CacheAwareComponentProvider::from_models(
            reused
                .into_iter()
                .filter_map(|project| self.model.project(project)),
        );
        LocalComponentRegistry::with_cache(cached, providers)
    }
}

/// Configures the build by running build logic for every project.
pub struct VintageModelController<C> {
    creator: C,
}

impl<C: BuildModelCreator> VintageModelController<C> {
    /// Wraps the uncached model creator.
    pub fn new(creator: C) -> Self {
        Self { creator }
    }

    /// Configures every project.
    pub fn configure(&mut self, host: &dyn Host) -> Result<ConfiguredBuild, CacheError> {
        let mut recorder = FingerprintRecorder::new();
        let model = configure_all(&mut self.creator, host, &mut recorder)?;
        Ok(ConfiguredBuild {
            model,
            outcome: ConfigurationOutcome::Uncached,
        })
    }

    /// Returns the wrapped creator.
    pub fn into_inner(self) -> C {
        self.creator
    }
}

/// Configures the root build through the configuration cache.
pub struct ConfigurationCacheAwareModelController<C> {
    creator: C,
    cache: BuildTreeConfigurationCache,
}

impl<C: BuildModelCreator> ConfigurationCacheAwareModelController<C> {
    /// Wraps the uncached model creator with `cache`.
    pub fn new(creator: C, cache: BuildTreeConfigurationCache) -> Self {
        Self { creator, cache }
    }

    /// Loads, partially rebuilds, or fully rebuilds the model, storing the
    /// refreshed entry whenever build logic ran.
    pub fn configure(&mut self, host: &dyn Host) -> Result<ConfiguredBuild, CacheError> {
        match self.cache.prepare(host)? {
            ConfigurationPlan::Reuse { model } => Ok(ConfiguredBuild {
                model,
                outcome: ConfigurationOutcome::Reused,
            }),
            ConfigurationPlan::PartialRebuild {
                reason,
                reused,
                rebuild,
            } => {
                let mut recorder = FingerprintRecorder::new();
                for entry in self.cache.take_retained_entries() {
                    recorder.push_entry(entry);
                }
                let mut model = reused;
                for project in &rebuild {
                    let configured =
                        configure_project(&mut self.creator, project, host, &mut recorder)?;
                    model.projects.insert(project.clone(), configured);
                }
                self.cache.store(&recorder, &model)?;
                Ok(ConfiguredBuild {
                    model,
                    outcome: ConfigurationOutcome::PartiallyReused {
                        reason,
                        rebuilt: rebuild,
                    },
                })
            }
            ConfigurationPlan::FullRebuild { reason } => {
                let mut recorder = FingerprintRecorder::new();
                recorder.record_environment(host);
                recorder.record_init_scripts(host)?;
                let model = configure_all(&mut self.creator, host, &mut recorder)?;
                self.cache.store(&recorder, &model)?;
                Ok(ConfiguredBuild {
                    model,
                    outcome: ConfigurationOutcome::Rebuilt { reason },
                })
            }
        }
    }

    /// Returns the build tree cache.
    pub fn cache(&self) -> &BuildTreeConfigurationCache {
        &self.cache
    }

    /// Returns the wrapped creator.
    pub fn into_inner(self) -> C {
        self.creator
    }
}

fn configure_all<C: BuildModelCreator + ?Sized>(
    creator: &mut C,
    host: &dyn Host,
    recorder: &mut FingerprintRecorder,
) -> Result<BuildModel, CacheError> {
    let projects = creator.projects(host, recorder)?;
    let mut models = Vec::with_capacity(projects.len());
    for project in &projects {
        models.push(configure_project(creator, project, host, recorder)?);
    }
    Ok(BuildModel::from_projects(models))
}

fn configure_project<C: BuildModelCreator + ?Sized>(
    creator: &mut C,
    project: &ScopePath,
    host: &dyn Host,
    recorder: &mut FingerprintRecorder,
) -> Result<ProjectModel, CacheError> {
    debug!("configuring {project}");
    let model = creator.configure_project(project, host, recorder)?;
    if &model.path != project {
        return Err(InternalError::new(format!(
            "configuring {project} produced the model of {}",
            model.path
        ))
        .into());
    }
    Ok(model)
}
