use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use tokio::sync::watch;

use crate::types::project::AppProject;

/// The narrow interface this core needs from the external resource store:
/// read current project state, create the bootstrap project, and be told
/// when something changed. The actual watch/informer machinery lives with
/// the collaborator implementing this trait.
pub trait ProjectStore: Send + Sync {
    fn list(&self) -> Result<Vec<AppProject>>;

    fn get(&self, name: &str) -> Result<Option<AppProject>>;

    fn create(&self, project: AppProject) -> Result<()>;

    /// Change notification channel. The receiver is marked changed after
    /// every mutation; subscribers re-list and rebuild rather than applying
    /// incremental patches.
    fn subscribe(&self) -> watch::Receiver<()>;
}

/// In-memory project store, used by tests and single-process embeddings.
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<String, AppProject>>,
    notify: watch::Sender<()>,
}

impl Default for MemoryProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        let (notify, _) = watch::channel(());
        Self {
            projects: RwLock::new(HashMap::new()),
            notify,
        }
    }

    pub fn with_projects(projects: impl IntoIterator<Item = AppProject>) -> Self {
        let store = Self::new();
        for project in projects {
            store.upsert(project);
        }
        store
    }

    /// Creates or replaces a project and notifies subscribers.
    pub fn upsert(&self, project: AppProject) {
        self.projects
            .write()
            .unwrap()
            .insert(project.name.clone(), project);
        _ = self.notify.send(());
    }

    pub fn remove(&self, name: &str) {
        if self.projects.write().unwrap().remove(name).is_some() {
            _ = self.notify.send(());
        }
    }
}

impl ProjectStore for MemoryProjectStore {
    fn list(&self) -> Result<Vec<AppProject>> {
        let mut projects: Vec<AppProject> = self.projects.read().unwrap().values().cloned().collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    fn get(&self, name: &str) -> Result<Option<AppProject>> {
        Ok(self.projects.read().unwrap().get(name).cloned())
    }

    fn create(&self, project: AppProject) -> Result<()> {
        let mut projects = self.projects.write().unwrap();
        if projects.contains_key(&project.name) {
            bail!("project '{}' already exists", project.name);
        }
        projects.insert(project.name.clone(), project);
        drop(projects);
        _ = self.notify.send(());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<()> {
        self.notify.subscribe()
    }
}
