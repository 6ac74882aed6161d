//! Creation of build controllers for the builds of one build tree.
//!
//! Only the root build is configured through the configuration cache. Every
//! other build (included builds, `buildSrc`) runs build logic directly.

use std::path::Path;

use confcache_common::{CacheResult, InternalError};
use confcache_config::BuildModelParameters;
use confcache_fingerprint::Host;
use tracing::debug;

use crate::controller::{
    BuildTreeConfigurationCache, ConfigurationCacheAwareModelController, ConfiguredBuild,
    VintageModelController,
};
use crate::error::CacheError;
use crate::key::ConfigurationCacheKey;
use crate::model::BuildModelCreator;

/// Configures one build, with or without the configuration cache.
pub enum BuildTreeController<C> {
    /// Runs build logic for every project.
    Vintage(VintageModelController<C>),
    /// Reuses stored state where the fingerprint allows it.
    Cached(ConfigurationCacheAwareModelController<C>),
}

impl<C: BuildModelCreator> BuildTreeController<C> {
    /// Configures the build.
    pub fn configure(&mut self, host: &dyn Host) -> Result<ConfiguredBuild, CacheError> {
        match self {
            Self::Vintage(controller) => controller.configure(host),
            Self::Cached(controller) => controller.configure(host),
        }
    }

    /// Returns `true` if this controller goes through the configuration cache.
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    /// Returns the wrapped creator.
    pub fn into_inner(self) -> C {
        match self {
            Self::Vintage(controller) => controller.into_inner(),
            Self::Cached(controller) => controller.into_inner(),
        }
    }
}

/// Hands out build controllers for one build tree invocation.
pub struct BuildTreeControllerFactory {
    cache: Option<BuildTreeConfigurationCache>,
    root_created: bool,
}

impl BuildTreeControllerFactory {
    /// Creates the factory of the build tree rooted at `build_root`.
    ///
    /// Nothing is looked up when the configuration cache is disabled.
    pub fn new(
        params: &BuildModelParameters,
        build_root: &Path,
        key: ConfigurationCacheKey,
    ) -> Self {
        let cache = params
            .is_configuration_cache()
            .then(|| BuildTreeConfigurationCache::new(params, build_root, key));
        Self {
            cache,
            root_created: false,
        }
    }

    /// Creates the controller of the root build.
    ///
    /// The root build is configured through the cache when it is enabled.
    /// Asking for a second root controller is an error.
    pub fn create_root_build_controller<C: BuildModelCreator>(
        &mut self,
        creator: C,
    ) -> CacheResult<BuildTreeController<C>> {
        if self.root_created {
            return Err(InternalError::new(
                "the root build controller has already been created for this build tree",
            ));
        }
        self.root_created = true;
        Ok(match self.cache.take() {
            Some(cache) => {
                debug!("configuring the root build through the configuration cache");
                BuildTreeController::Cached(ConfigurationCacheAwareModelController::new(
                    creator, cache,
                ))
            }
            None => BuildTreeController::Vintage(VintageModelController::new(creator)),
        })
    }

    /// Creates the controller of a build other than the root.
    pub fn create_controller<C: BuildModelCreator>(&self, creator: C) -> BuildTreeController<C> {
        BuildTreeController::Vintage(VintageModelController::new(creator))
    }
}
