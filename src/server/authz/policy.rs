use std::str::FromStr;

use anyhow::{bail, Error, Result};
use serde::{Deserialize, Serialize};

/// Policy shipped with the server. Operators extend it with their own rules
/// and bind users or groups to these roles.
pub const BUILTIN_POLICY: &str = "\
p, role:readonly, applications, get, */*, allow
p, role:readonly, certificates, get, *, allow
p, role:readonly, clusters, get, *, allow
p, role:readonly, projects, get, *, allow
p, role:readonly, repositories, get, *, allow
p, role:admin, applications, *, */*, allow
p, role:admin, certificates, *, *, allow
p, role:admin, clusters, *, *, allow
p, role:admin, projects, *, *, allow
p, role:admin, repositories, *, *, allow
g, admin, role:admin
";

/// Rule effect. Deny takes absolute precedence: one matching deny rule
/// overrules any number of matching allow rules.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    Allow,
    Deny,
}

impl FromStr for Effect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "allow" => Ok(Effect::Allow),
            "deny" => Ok(Effect::Deny),
            _ => bail!("invalid rule effect '{s}', expected 'allow' or 'deny'"),
        }
    }
}

/// One compiled `p, <subject>, <resource>, <action>, <object>, <effect>`
/// line. Immutable once part of a policy generation.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRule {
    pub subject: String,
    pub resource: String,
    pub action: String,
    pub object: String,
    pub effect: Effect,
}

impl PolicyRule {
    /// Resource and action match exactly or against a full `*` wildcard;
    /// objects match per `/`-segment, so `demo/*` covers every object under
    /// the `demo` project.
    pub fn matches(&self, resource: &str, action: &str, object: &str) -> bool {
        match_pattern(&self.resource, resource)
            && match_pattern(&self.action, action)
            && match_object(&self.object, object)
    }
}

/// One `g, <member>, <role>` line: `member` (a subject or group name)
/// inherits every rule of `role`. Bindings chain transitively.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBinding {
    pub member: String,
    pub role: String,
}

/// A compiled policy generation.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    pub rules: Vec<PolicyRule>,
    pub groups: Vec<GroupBinding>,
}

/// Parses policy text. Empty lines and `#` comments are skipped; any
/// malformed line fails the whole parse so a bad generation is never
/// activated.
pub fn parse_policy(text: &str) -> Result<PolicySet> {
    let mut set = PolicySet::default();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        match fields.as_slice() {
            ["p", subject, resource, action, object, effect] => set.rules.push(PolicyRule {
                subject: subject.to_string(),
                resource: resource.to_string(),
                action: action.to_string(),
                object: object.to_string(),
                effect: effect.parse()?,
            }),
            ["g", member, role] => set.groups.push(GroupBinding {
                member: member.to_string(),
                role: role.to_string(),
            }),
            _ => bail!("invalid policy line {}: '{line}'", idx + 1),
        }
    }

    Ok(set)
}

fn match_pattern(pattern: &str, value: &str) -> bool {
    pattern == "*" || pattern == value
}

fn match_object(pattern: &str, object: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let mut pattern_segments = pattern.split('/');
    let mut object_segments = object.split('/');
    loop {
        match (pattern_segments.next(), object_segments.next()) {
            (Some(p), Some(o)) => {
                if p != "*" && p != o {
                    return false;
                }
            }
            (None, None) => return true,
            _ => return false,
        }
    }
}
