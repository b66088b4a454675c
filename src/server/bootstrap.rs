use anyhow::{Context, Result};
use log::info;

use crate::types::project::{AppProject, DEFAULT_PROJECT_NAME};

use super::store::ProjectStore;

/// Ensures the default project exists.
///
/// A fresh installation gets the allow-everything wildcard project so
/// applications can be created before any operator configuration happens.
/// An existing project under the reserved name is left untouched, whatever
/// its spec says; running this repeatedly is a no-op.
pub fn initialize_default_project(store: &dyn ProjectStore) -> Result<()> {
    let existing = store
        .get(DEFAULT_PROJECT_NAME)
        .context("look up default project")?;
    if existing.is_some() {
        return Ok(());
    }

    info!("Default project not found, creating it");
    store
        .create(AppProject::default_project())
        .context("create default project")
}
