use serde::{Deserialize, Serialize};

/// Name of the project every application belongs to unless stated otherwise.
/// Created at startup if absent, never modified if present.
pub const DEFAULT_PROJECT_NAME: &str = "default";

/// A project resource as owned by the external resource store. This core
/// only reads projects; all mutations happen through the store and reach us
/// via change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppProject {
    pub name: String,

    #[serde(default)]
    pub spec: AppProjectSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppProjectSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_repos: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destinations: Vec<ApplicationDestination>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cluster_resource_whitelist: Vec<GroupKind>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<ProjectRole>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDestination {
    pub server: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

/// A named role inside a project. Its policy lines are scoped to the role's
/// subject, its groups bind external group claims to the role, and its token
/// ledger records which issued tokens are still valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectRole {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jwt_tokens: Vec<JwtToken>,
}

/// One entry in a role's issued-token ledger. Presence in the ledger is the
/// sole revocation record: removing the entry revokes the token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JwtToken {
    #[serde(default)]
    pub iat: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl AppProject {
    /// The project every fresh installation starts with: everything is
    /// allowed until an operator narrows it down.
    pub fn default_project() -> Self {
        Self {
            name: DEFAULT_PROJECT_NAME.to_string(),
            spec: AppProjectSpec {
                source_repos: vec!["*".to_string()],
                destinations: vec![ApplicationDestination {
                    server: "*".to_string(),
                    namespace: "*".to_string(),
                }],
                cluster_resource_whitelist: vec![GroupKind {
                    group: "*".to_string(),
                    kind: "*".to_string(),
                }],
                roles: Vec::new(),
            },
        }
    }

    /// Subject string a token issued for `role` in this project carries.
    pub fn role_subject(&self, role: &str) -> String {
        format!("proj:{}:{}", self.name, role)
    }
}
