//! Persistent configuration cache for build trees.
//!
//! This crate stores the configured build model together with the fingerprint
//! of every input that produced it, and on each later build decides whether the
//! stored model can be reused in full, reused for some projects only, or must be
//! discarded. Caching is applied to the root build of a build tree only.

#![warn(missing_docs)]

pub mod artifact;
pub mod component;
pub mod controller;
pub mod entry;
pub mod error;
pub mod factory;
pub mod key;
pub mod model;
pub mod repository;

pub use artifact::ModelStore;
pub use component::{
    CacheAwareComponentProvider, LocalComponentMetadata, LocalComponentProvider,
    LocalComponentRegistry,
};
pub use controller::{
    BuildTreeConfigurationCache, ConfigurationCacheAwareModelController, ConfigurationOutcome,
    ConfigurationPlan, ConfiguredBuild, VintageModelController, NO_CACHED_CONFIGURATION,
};
pub use entry::EntryManifest;
pub use error::CacheError;
pub use factory::{BuildTreeController, BuildTreeControllerFactory};
pub use key::ConfigurationCacheKey;
pub use model::{BuildModel, BuildModelCreator, ProjectModel};
pub use repository::{ConfigurationCacheRepository, StoredEntry};
