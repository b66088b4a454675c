use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};

use super::policy::{parse_policy, PolicySet};

/// Holds the compiled rule set: built-in policy, operator-supplied policy
/// and the policy derived from project resources.
///
/// Readers take one `Arc` snapshot per decision and never block on updates;
/// updates recompile everything and swap the snapshot atomically. A source
/// that fails to compile leaves the active snapshot untouched.
pub struct PolicyStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    builtin: String,
    user: String,
    projects: String,
    snapshot: Arc<PolicySet>,
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn set_builtin_policy(&self, text: &str) -> Result<()> {
        self.update(|inner| inner.builtin = text.to_string())
            .context("compile builtin policy")
    }

    pub fn set_user_policy(&self, text: &str) -> Result<()> {
        self.update(|inner| inner.user = text.to_string())
            .context("compile user policy")
    }

    pub fn set_project_policy(&self, text: &str) -> Result<()> {
        self.update(|inner| inner.projects = text.to_string())
            .context("compile project policy")
    }

    /// The current policy generation. Holding the returned Arc keeps one
    /// consistent view for the duration of a decision regardless of
    /// concurrent updates.
    pub fn snapshot(&self) -> Arc<PolicySet> {
        self.inner.read().unwrap().snapshot.clone()
    }

    fn update(&self, apply: impl FnOnce(&mut Inner)) -> Result<()> {
        let mut inner = self.inner.write().unwrap();

        // Compile against a staged copy of the sources so a parse failure
        // leaves both the sources and the active snapshot as they were.
        let mut staged = Inner {
            builtin: inner.builtin.clone(),
            user: inner.user.clone(),
            projects: inner.projects.clone(),
            snapshot: Arc::default(),
        };
        apply(&mut staged);

        let text = format!("{}\n{}\n{}", staged.builtin, staged.user, staged.projects);
        staged.snapshot = Arc::new(parse_policy(&text)?);

        *inner = staged;
        Ok(())
    }
}
