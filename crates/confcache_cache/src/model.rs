//! The configured build model and the uncached path that produces it.

use std::collections::BTreeMap;

use confcache_common::ScopePath;
use confcache_fingerprint::{FingerprintRecorder, Host};
use serde::{Deserialize, Serialize};

use crate::component::LocalComponentMetadata;
use crate::error::CacheError;

/// Configured state of a single project.
///
/// `state` is opaque to the cache: build logic serializes whatever it needs to
/// restore the project without re-running its build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    /// The project this state belongs to.
    pub path: ScopePath,
    /// Serialized project state.
    pub state: Vec<u8>,
    /// Component published by the project for dependency resolution, if any.
    pub component: Option<LocalComponentMetadata>,
}

/// Configured state of every project in the root build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildModel {
    /// Project states keyed by project path.
    pub projects: BTreeMap<ScopePath, ProjectModel>,
}

impl BuildModel {
    /// Creates a model from project states.
    pub fn from_projects<I>(projects: I) -> Self
    where
        I: IntoIterator<Item = ProjectModel>,
    {
        Self {
            projects: projects
                .into_iter()
                .map(|project| (project.path.clone(), project))
                .collect(),
        }
    }

    /// Returns the state of `project`.
    pub fn project(&self, project: &ScopePath) -> Option<&ProjectModel> {
        self.projects.get(project)
    }
}

/// The uncached configuration path: runs build logic.
///
/// Implementations record every input they read into the supplied recorder so
/// the result can be cached. Inputs specific to one project should be recorded
/// with [`FingerprintRecorder::record_for`].
pub trait BuildModelCreator {
    /// Evaluates settings and returns the projects of the build.
    fn projects(
        &mut self,
        host: &dyn Host,
        recorder: &mut FingerprintRecorder,
    ) -> Result<Vec<ScopePath>, CacheError>;

    /// Runs the build logic of one project.
    fn configure_project(
        &mut self,
        project: &ScopePath,
        host: &dyn Host,
        recorder: &mut FingerprintRecorder,
    ) -> Result<ProjectModel, CacheError>;
}
