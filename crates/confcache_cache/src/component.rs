//! Lookup of components published by projects of the build.
//!
//! Dependency resolution asks the registry for a project's component. The
//! registry asks its providers in order and remembers the first answer. With
//! the configuration cache on, reused projects are answered from the stored
//! model instead of configuring them.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use confcache_common::ScopePath;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::model::ProjectModel;

/// Metadata describing the component a project publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalComponentMetadata {
    /// The publishing project.
    pub project: ScopePath,
    /// Module coordinates, variants and other attributes.
    pub attributes: BTreeMap<String, String>,
}

/// A source of project component metadata.
pub trait LocalComponentProvider: Send + Sync {
    /// Returns the component of `project`, or `None` if this provider does not know it.
    fn component(&self, project: &ScopePath) -> Option<LocalComponentMetadata>;
}

/// Answers from components stored with reused project models.
pub struct CacheAwareComponentProvider {
    components: BTreeMap<ScopePath, LocalComponentMetadata>,
}

impl CacheAwareComponentProvider {
    /// Collects the stored components of `models`.
    pub fn from_models<'a, I>(models: I) -> Self
    where
        I: IntoIterator<Item = &'a ProjectModel>,
    {
        Self {
            components: models
                .into_iter()
                .filter_map(|m| m.component.clone().map(|c| (m.path.clone(), c)))
                .collect(),
        }
    }
}

impl LocalComponentProvider for CacheAwareComponentProvider {
    fn component(&self, project: &ScopePath) -> Option<LocalComponentMetadata> {
        self.components.get(project).cloned()
    }
}

/// Memoizing registry of project components.
pub struct LocalComponentRegistry {
    providers: Vec<Box<dyn LocalComponentProvider>>,
    components: Mutex<HashMap<ScopePath, Arc<LocalComponentMetadata>>>,
}

impl LocalComponentRegistry {
    /// Creates a registry consulting `providers` in order.
    pub fn new(providers: Vec<Box<dyn LocalComponentProvider>>) -> Self {
        Self {
            providers,
            components: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a registry that answers from `cached` before asking `providers`.
    pub fn with_cache(
        cached: CacheAwareComponentProvider,
        providers: Vec<Box<dyn LocalComponentProvider>>,
    ) -> Self {
        let mut all: Vec<Box<dyn LocalComponentProvider>> = Vec::with_capacity(providers.len() + 1);
        all.push(Box::new(cached));
        all.extend(providers);
        Self::new(all)
    }

    /// Returns the component of `project`, computing it on first request.
    pub fn get_component(
        &self,
        project: &ScopePath,
    ) -> Result<Arc<LocalComponentMetadata>, CacheError> {
        let mut components = self
            .components
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(component) = components.get(project) {
            return Ok(Arc::clone(component));
        }
        let component = self
            .providers
            .iter()
            .find_map(|provider| provider.component(project))
            .map(Arc::new)
            .ok_or_else(|| CacheError::ComponentNotFound {
                project: project.clone(),
            })?;
        components.insert(project.clone(), Arc::clone(&component));
        Ok(component)
    }
}
