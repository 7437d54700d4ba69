//! Shared build context
//!
//! Carries the command runner and the build-wide policies every image
//! operation needs. Images hold it behind an `Arc`.

use crate::hashsum::CacheVersion;
use crate::introspect::IntrospectPolicy;
use crate::shell::CommandRunner;
use std::sync::Arc;

/// Cache-format version mixed into every stage signature.
///
/// Bumping it invalidates every stage image built by earlier releases.
pub const BUILD_CACHE_VERSION: i64 = 3;

/// Default project name used in stage image names
pub const DEFAULT_PROJECT_NAME: &str = "stagecache";

pub struct BuildContext {
    runner: Arc<dyn CommandRunner>,
    introspect: IntrospectPolicy,
    cache_version: CacheVersion,
    project_name: String,
}

impl BuildContext {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            introspect: IntrospectPolicy::default(),
            cache_version: CacheVersion::Int(BUILD_CACHE_VERSION),
            project_name: DEFAULT_PROJECT_NAME.to_string(),
        }
    }

    pub fn with_introspect(mut self, introspect: IntrospectPolicy) -> Self {
        self.introspect = introspect;
        self
    }

    pub fn with_cache_version(mut self, cache_version: impl Into<CacheVersion>) -> Self {
        self.cache_version = cache_version.into();
        self
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.project_name = project_name.into();
        self
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn introspect(&self) -> IntrospectPolicy {
        self.introspect
    }

    pub fn cache_version(&self) -> &CacheVersion {
        &self.cache_version
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("introspect", &self.introspect)
            .field("cache_version", &self.cache_version)
            .field("project_name", &self.project_name)
            .finish_non_exhaustive()
    }
}
