use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::Result;

use crate::types::claims::Claims;
use crate::types::project::AppProject;

use super::policy::{Effect, GroupBinding};
use super::registry::ProjectRoleRegistry;
use super::store::PolicyStore;

/// The claims-based decision engine: given authenticated claims and a
/// requested (resource, action, object), decides allow or deny.
///
/// Decisions never error; anything unresolved is a deny. One explicit
/// instance owns its policy store and role registry — request handlers hold
/// it by reference, there is no process-wide singleton.
pub struct RbacEnforcer {
    store: PolicyStore,
    registry: ProjectRoleRegistry,
    default_role: RwLock<Option<String>>,
}

impl Default for RbacEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl RbacEnforcer {
    pub fn new() -> Self {
        Self {
            store: PolicyStore::new(),
            registry: ProjectRoleRegistry::new(),
            default_role: RwLock::new(None),
        }
    }

    pub fn set_builtin_policy(&self, text: &str) -> Result<()> {
        self.store.set_builtin_policy(text)
    }

    pub fn set_user_policy(&self, text: &str) -> Result<()> {
        self.store.set_user_policy(text)
    }

    /// Role granted to requests that match no other rule, including
    /// anonymous ones. An empty name clears it.
    pub fn set_default_role(&self, role: &str) {
        let role = (!role.is_empty()).then(|| role.to_string());
        *self.default_role.write().unwrap() = role;
    }

    pub fn registry(&self) -> &ProjectRoleRegistry {
        &self.registry
    }

    /// Rebuilds the registry and the project policy from fresh project
    /// state. On failure (unparsable policy text) the previously active
    /// generation stays in place and keeps serving decisions.
    pub fn refresh(&self, projects: &[AppProject]) -> Result<()> {
        let candidate = ProjectRoleRegistry::build(projects);
        self.store.set_project_policy(candidate.policy())?;
        self.registry.swap(candidate);
        Ok(())
    }

    /// The decision function.
    ///
    /// Project-role subjects are revocation-gated against the role's
    /// issued-token ledger before any rule is considered: an id claim must
    /// match a ledger entry's id, otherwise the issued-at must match. A
    /// role with no surviving ledger entry denies everything regardless of
    /// policy. Among matching rules, deny beats allow.
    pub fn enforce(
        &self,
        claims: Option<&Claims>,
        resource: &str,
        action: &str,
        object: &str,
    ) -> bool {
        let policy = self.store.snapshot();
        let registry = self.registry.snapshot();

        let mut subjects: Vec<String> = Vec::new();
        if let Some(claims) = claims {
            if claims.sub.starts_with("proj:") {
                let Some((project, role)) = claims.project_role() else {
                    // Looks like a role token but does not parse: deny.
                    return false;
                };
                let Some(entry) = registry.role(project, role) else {
                    return false;
                };
                let valid = match &claims.jti {
                    Some(id) => entry.tokens.iter().any(|t| t.id.as_deref() == Some(id)),
                    None => match claims.iat {
                        Some(iat) => entry.tokens.iter().any(|t| t.iat == iat),
                        None => false,
                    },
                };
                if !valid {
                    return false;
                }
            }

            if !claims.sub.is_empty() {
                subjects.push(claims.sub.clone());
            }
            subjects.extend(claims.groups.iter().cloned());
        }

        if let Some(role) = self.default_role.read().unwrap().clone() {
            subjects.push(role);
        }
        if subjects.is_empty() {
            return false;
        }

        let subjects = expand_subjects(subjects, &policy.groups);

        let mut allowed = false;
        for rule in &policy.rules {
            if !subjects.contains(&rule.subject) || !rule.matches(resource, action, object) {
                continue;
            }
            match rule.effect {
                Effect::Deny => return false,
                Effect::Allow => allowed = true,
            }
        }
        allowed
    }
}

/// Expands the subject set through `g` bindings to a fixpoint, so chained
/// role inheritance works.
fn expand_subjects(seed: Vec<String>, bindings: &[GroupBinding]) -> HashSet<String> {
    let mut subjects: HashSet<String> = seed.into_iter().collect();
    loop {
        let mut grown = false;
        for binding in bindings {
            if subjects.contains(&binding.member) && !subjects.contains(&binding.role) {
                subjects.insert(binding.role.clone());
                grown = true;
            }
        }
        if !grown {
            return subjects;
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::authz::policy::BUILTIN_POLICY;
    use crate::types::project::{JwtToken, ProjectRole};

    use super::*;

    fn project_claims(sub: &str, iat: Option<i64>, jti: Option<&str>) -> Claims {
        Claims {
            sub: sub.to_string(),
            iat,
            jti: jti.map(String::from),
            ..Default::default()
        }
    }

    fn demo_project(tokens: Vec<JwtToken>) -> AppProject {
        let mut project = AppProject::default_project();
        project.name = "demo".to_string();
        project.spec.roles = vec![ProjectRole {
            name: "ci".to_string(),
            policies: vec!["p, proj:demo:ci, applications, get, demo/*, allow".to_string()],
            groups: Vec::new(),
            jwt_tokens: tokens,
        }];
        project
    }

    #[test]
    fn test_issued_at_gate() {
        let enforcer = RbacEnforcer::new();
        enforcer
            .refresh(&[demo_project(vec![JwtToken { iat: 1, id: None }])])
            .unwrap();

        let claims = project_claims("proj:demo:ci", Some(1), None);
        assert!(enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));
        assert!(enforcer.enforce(Some(&claims), "projects", "get", "demo"));
        assert!(!enforcer.enforce(Some(&claims), "applications", "get", "other/app"));

        let stale = project_claims("proj:demo:ci", Some(2), None);
        assert!(!enforcer.enforce(Some(&stale), "applications", "get", "demo/app"));
    }

    #[test]
    fn test_id_gate() {
        let enforcer = RbacEnforcer::new();
        enforcer
            .refresh(&[demo_project(vec![JwtToken {
                iat: 1,
                id: Some("token-a".to_string()),
            }])])
            .unwrap();

        // An id match is authoritative, no issued-at required.
        let claims = project_claims("proj:demo:ci", None, Some("token-a"));
        assert!(enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));

        let unknown = project_claims("proj:demo:ci", None, Some("token-b"));
        assert!(!enforcer.enforce(Some(&unknown), "applications", "get", "demo/app"));
    }

    #[test]
    fn test_empty_ledger_denies() {
        let enforcer = RbacEnforcer::new();
        enforcer.refresh(&[demo_project(Vec::new())]).unwrap();

        let claims = project_claims("proj:demo:ci", Some(1), None);
        assert!(!enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));
    }

    #[test]
    fn test_malformed_project_subject() {
        let enforcer = RbacEnforcer::new();
        enforcer
            .refresh(&[demo_project(vec![JwtToken { iat: 1, id: None }])])
            .unwrap();

        let claims = project_claims("proj:demo", Some(1), None);
        assert!(!enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));
    }

    #[test]
    fn test_deny_overrides_allow() {
        let enforcer = RbacEnforcer::new();
        let mut project = demo_project(vec![JwtToken { iat: 1, id: None }]);
        project.spec.roles[0].policies = vec![
            "p, proj:demo:ci, applications, get, demo/*, allow".to_string(),
            "p, proj:demo:ci, applications, get, demo/denied, deny".to_string(),
        ];
        enforcer.refresh(&[project]).unwrap();

        let claims = project_claims("proj:demo:ci", Some(1), None);
        assert!(enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));
        assert!(!enforcer.enforce(Some(&claims), "applications", "get", "demo/denied"));
    }

    #[test]
    fn test_default_role() {
        let enforcer = RbacEnforcer::new();
        enforcer.set_builtin_policy(BUILTIN_POLICY).unwrap();

        assert!(!enforcer.enforce(None, "applications", "get", "demo/app"));

        enforcer.set_default_role("role:readonly");
        assert!(enforcer.enforce(None, "applications", "get", "demo/app"));
        assert!(!enforcer.enforce(None, "applications", "delete", "demo/app"));

        enforcer.set_default_role("");
        assert!(!enforcer.enforce(None, "applications", "get", "demo/app"));
    }

    #[test]
    fn test_group_bindings() {
        let enforcer = RbacEnforcer::new();
        enforcer.set_builtin_policy(BUILTIN_POLICY).unwrap();
        enforcer
            .set_user_policy("g, org2:team2, role:admin\ng, bob, role:admin")
            .unwrap();

        let by_group = Claims {
            groups: vec!["org1:team1".to_string(), "org2:team2".to_string()],
            ..Default::default()
        };
        assert!(enforcer.enforce(Some(&by_group), "applications", "delete", "demo/app"));

        let by_subject = Claims {
            sub: "bob".to_string(),
            ..Default::default()
        };
        assert!(enforcer.enforce(Some(&by_subject), "applications", "delete", "demo/app"));

        let outsider = Claims {
            groups: vec!["org3:team3".to_string()],
            ..Default::default()
        };
        assert!(!enforcer.enforce(Some(&outsider), "applications", "delete", "demo/app"));
    }

    #[test]
    fn test_failed_refresh_keeps_generation() {
        let enforcer = RbacEnforcer::new();
        enforcer
            .refresh(&[demo_project(vec![JwtToken { iat: 1, id: None }])])
            .unwrap();

        let mut broken = demo_project(vec![JwtToken { iat: 1, id: None }]);
        broken.spec.roles[0].policies = vec!["p, not enough fields".to_string()];
        assert!(enforcer.refresh(&[broken]).is_err());

        // The previous generation keeps serving.
        let claims = project_claims("proj:demo:ci", Some(1), None);
        assert!(enforcer.enforce(Some(&claims), "applications", "get", "demo/app"));
    }
}
