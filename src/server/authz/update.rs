use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, error, info};

use crate::server::store::ProjectStore;

use super::enforcer::RbacEnforcer;

/// Loads current project state and swaps in a fresh policy/registry
/// generation. Used once at startup and from the watch loop afterwards.
pub fn refresh_from_store(enforcer: &RbacEnforcer, store: &dyn ProjectStore) -> Result<()> {
    let projects = store.list().context("list projects")?;
    debug!("Rebuilding policy from {} project(s)", projects.len());
    enforcer.refresh(&projects)
}

/// Background update flow: waits for project change notifications and
/// rebuilds the enforcer's view after each one.
///
/// This is the only writer of the policy/registry snapshots. Rebuild
/// failures are logged and leave the previous generation active; in-flight
/// enforcement calls are never affected. Returns when the store side of the
/// subscription is dropped.
pub async fn watch_projects(enforcer: Arc<RbacEnforcer>, store: Arc<dyn ProjectStore>) {
    let mut changes = store.subscribe();
    info!("Watching project changes for policy updates");

    while changes.changed().await.is_ok() {
        if let Err(e) = refresh_from_store(&enforcer, store.as_ref()) {
            error!("Failed to rebuild policy, keeping previous generation: {e:#}");
        }
    }

    debug!("Project subscription closed, stopping policy updates");
}
