use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Arc, RwLock};

use crate::types::project::{AppProject, JwtToken};

/// Per-role view derived from project resources: the issued-token ledger
/// and the groups bound to the role.
#[derive(Debug, Clone, Default)]
pub struct RoleEntry {
    pub tokens: Vec<JwtToken>,
    pub groups: Vec<String>,
}

/// One consistent registry generation, keyed by the role subject string
/// `proj:<project>:<role>`.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    roles: HashMap<String, RoleEntry>,
    policy: String,
}

impl RegistrySnapshot {
    pub fn role(&self, project: &str, role: &str) -> Option<&RoleEntry> {
        self.roles.get(&format!("proj:{project}:{role}"))
    }

    /// Combined policy text of all projects: every role's own policy lines,
    /// an implicit rule letting each role read its own project, and the
    /// role's group bindings.
    pub fn policy(&self) -> &str {
        &self.policy
    }
}

/// Derives the role/ledger view from project resource state.
///
/// Rebuilt wholesale on every project change notification; queries during a
/// rebuild see the previous generation until the new one is swapped in.
pub struct ProjectRoleRegistry {
    snapshot: RwLock<Arc<RegistrySnapshot>>,
}

impl Default for ProjectRoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectRoleRegistry {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::default()),
        }
    }

    /// Builds a fresh snapshot from project state without activating it.
    /// The caller validates the combined policy text first and then commits
    /// via [`swap`](Self::swap), so a project with broken policy lines never
    /// replaces a working generation.
    pub fn build(projects: &[AppProject]) -> RegistrySnapshot {
        let mut snapshot = RegistrySnapshot::default();

        for project in projects {
            for role in &project.spec.roles {
                let subject = project.role_subject(&role.name);

                for line in &role.policies {
                    _ = writeln!(snapshot.policy, "{}", line.trim());
                }
                // A role token is always allowed to read the project it
                // belongs to.
                _ = writeln!(
                    snapshot.policy,
                    "p, {subject}, projects, get, {}, allow",
                    project.name
                );
                for group in &role.groups {
                    _ = writeln!(snapshot.policy, "g, {group}, {subject}");
                }

                snapshot.roles.insert(
                    subject,
                    RoleEntry {
                        tokens: role.jwt_tokens.clone(),
                        groups: role.groups.clone(),
                    },
                );
            }
        }

        snapshot
    }

    pub fn swap(&self, snapshot: RegistrySnapshot) {
        *self.snapshot.write().unwrap() = Arc::new(snapshot);
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.read().unwrap().clone()
    }

    /// The issued-token ledger of a role, or None when the project or role
    /// does not exist.
    pub fn role_tokens(&self, project: &str, role: &str) -> Option<Vec<JwtToken>> {
        self.snapshot()
            .role(project, role)
            .map(|entry| entry.tokens.clone())
    }

    /// The groups bound to a role, or None when the project or role does
    /// not exist.
    pub fn role_groups(&self, project: &str, role: &str) -> Option<Vec<String>> {
        self.snapshot()
            .role(project, role)
            .map(|entry| entry.groups.clone())
    }
}
