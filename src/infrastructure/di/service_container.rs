//! Service container for dependency injection
//!
//! Wires settings, the filesystem and hierarchy stores into services.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::{HierarchyService, MarkingOptions, PartialTreeBuilder};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{MarkingFilter, Node};
use crate::infrastructure::loader::load_hierarchy;
use crate::infrastructure::traits::{FileSystem, HierarchyStore, RealFileSystem};
use crate::infrastructure::{InMemoryHierarchy, InfraResult};

/// Container holding settings and I/O abstractions.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    /// Resolve the hierarchy source: explicit argument first, then `hierarchy_file`.
    pub fn resolve_source(&self, source: Option<&Path>) -> ApplicationResult<PathBuf> {
        source
            .map(Path::to_path_buf)
            .or_else(|| self.settings.hierarchy_file.clone())
            .ok_or_else(|| ApplicationError::Config {
                message: "no hierarchy source given and hierarchy_file is not set".to_string(),
            })
    }

    /// Load the hierarchy store, applying `hide_from_hierarchy`.
    #[instrument(level = "debug", skip(self))]
    pub fn load_store(&self, source: Option<&Path>) -> InfraResult<Arc<InMemoryHierarchy>> {
        let path = self.resolve_source(source)?;
        let store = load_hierarchy(self.fs.as_ref(), &path)?
            .with_hidden_kinds(self.settings.hide_from_hierarchy.iter().cloned());
        debug!("load_store: {} nodes from {}", store.len(), path.display());
        Ok(Arc::new(store))
    }

    /// Marking options from settings.
    pub fn marking_options(&self) -> ApplicationResult<MarkingOptions> {
        Ok(MarkingOptions {
            children_method: self.settings.children_method.parse()?,
            count_method: self.settings.count_method.parse()?,
            node_count_threshold: self.settings.node_threshold_total,
            max_child_nodes: self.settings.node_threshold_leaf,
            limiting_enabled: self.settings.limiting_enabled,
        })
    }

    /// Marking filter from the `marking_filter` expression, if any.
    pub fn marking_filter(&self) -> ApplicationResult<MarkingFilter> {
        match &self.settings.marking_filter {
            Some(expr) => Ok(MarkingFilter::parse(expr)?),
            None => Ok(MarkingFilter::None),
        }
    }

    /// A tree builder over `root` configured from settings.
    pub fn tree_builder(
        &self,
        store: Arc<dyn HierarchyStore>,
        root: Node,
        options: MarkingOptions,
    ) -> ApplicationResult<PartialTreeBuilder> {
        let mut builder = PartialTreeBuilder::new(store, root, options)?;
        builder.set_filter(self.marking_filter()?);
        Ok(builder)
    }

    pub fn hierarchy_service(&self, store: Arc<dyn HierarchyStore>) -> HierarchyService {
        HierarchyService::new(store)
    }
}
