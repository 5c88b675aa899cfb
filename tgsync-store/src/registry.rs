//! Per-project handle registry
//!
//! Hosts create one registry at startup and pass it to every consumer. The
//! registry guarantees a single store and a single notification bus per
//! project folder without any process-global state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::store::TextGridStore;
use crate::watcher::NotificationBus;

/// Store and bus shared by every consumer of one project
#[derive(Debug)]
pub struct ProjectHandles {
    pub store: Arc<TextGridStore>,
    pub bus: Arc<NotificationBus>,
}

impl ProjectHandles {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let store = TextGridStore::new(project_root);
        let bus = NotificationBus::new(store.folder());
        Self {
            store: Arc::new(store),
            bus: Arc::new(bus),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectRegistry {
    projects: Mutex<HashMap<PathBuf, Arc<ProjectHandles>>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles for `project_root`, created on first use
    pub fn project(&self, project_root: &Path) -> Arc<ProjectHandles> {
        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        projects
            .entry(project_root.to_path_buf())
            .or_insert_with(|| {
                debug!("Registering project {}", project_root.display());
                Arc::new(ProjectHandles::new(project_root))
            })
            .clone()
    }

    /// Forget a project. Outstanding handles stay valid.
    pub fn remove(&self, project_root: &Path) -> Option<Arc<ProjectHandles>> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(project_root)
    }

    pub fn len(&self) -> usize {
        self.projects.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
