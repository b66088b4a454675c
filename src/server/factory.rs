use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use rand::RngCore;

use super::authn::oidc::OidcProvider;
use super::authn::session::SessionManager;
use super::authn::verify::TokenVerifier;
use super::authn::Authenticator;
use super::authz::enforcer::RbacEnforcer;
use super::authz::policy::BUILTIN_POLICY;
use super::authz::update;
use super::bootstrap::initialize_default_project;
use super::config::AuthConfig;
use super::store::ProjectStore;

const GENERATED_SECRET_LENGTH: usize = 32;

/// The wired-up authentication/authorization core. Constructed once at
/// startup and passed by reference into every request-handling path.
pub struct ServerAuth {
    pub session: Arc<SessionManager>,
    pub authenticator: Authenticator,
    pub enforcer: Arc<RbacEnforcer>,
}

/// Builds the core from configuration: session manager, verifier with the
/// optional federated provider, authenticator, and a policy enforcer
/// primed from current project state.
pub struct AuthFactory;

impl Default for AuthFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, cfg: &AuthConfig, store: &dyn ProjectStore) -> Result<ServerAuth> {
        let secret = match cfg.session.secret.as_str() {
            "" => {
                info!("No session signing secret configured, generating a random one");
                random_secret()
            }
            secret => secret.as_bytes().to_vec(),
        };
        let session = Arc::new(SessionManager::new(
            &cfg.session.issuer,
            &secret,
            cfg.session.expiry,
        ));

        let oidc = match &cfg.oidc {
            Some(oidc_cfg) => {
                info!("Using OIDC provider '{}'", oidc_cfg.issuer);
                Some(Arc::new(
                    OidcProvider::new(oidc_cfg).context("configure oidc provider")?,
                ))
            }
            None => None,
        };

        let verifier = Arc::new(TokenVerifier::new(session.clone(), oidc));
        if cfg.anonymous_enabled {
            warn!("Anonymous access is enabled, unauthenticated requests will be served");
        }
        let authenticator = Authenticator::new(verifier, cfg.anonymous_enabled);

        let enforcer = Arc::new(RbacEnforcer::new());
        enforcer.set_builtin_policy(BUILTIN_POLICY)?;
        if let Some(policy) = &cfg.policy {
            enforcer.set_user_policy(policy)?;
        }
        if let Some(role) = &cfg.default_role {
            enforcer.set_default_role(role);
        }

        initialize_default_project(store)?;
        update::refresh_from_store(&enforcer, store).context("load initial project policy")?;

        Ok(ServerAuth {
            session,
            authenticator,
            enforcer,
        })
    }
}

fn random_secret() -> Vec<u8> {
    let mut secret = vec![0u8; GENERATED_SECRET_LENGTH];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

#[cfg(test)]
mod tests {
    use crate::server::metadata::RequestMetadata;
    use crate::server::store::MemoryProjectStore;
    use crate::types::project::DEFAULT_PROJECT_NAME;

    use super::*;

    #[tokio::test]
    async fn test_build() {
        let store = MemoryProjectStore::new();
        let cfg = AuthConfig::default();
        let auth = AuthFactory::new().build(&cfg, &store).unwrap();

        // Bootstrap ran.
        assert!(store.get(DEFAULT_PROJECT_NAME).unwrap().is_some());

        // Issued tokens authenticate round-trip.
        let token = auth.session.create("admin", 0, "").unwrap();
        let md = RequestMetadata::pairs([("token", &*token)]);
        let claims = auth.authenticator.authenticate(&md).await.unwrap().unwrap();
        assert_eq!(claims.sub, "admin");

        // Builtin policy is active: admin may do everything.
        assert!(auth
            .enforcer
            .enforce(Some(&claims), "applications", "delete", "demo/app"));
    }

    #[test]
    fn test_build_rejects_bad_policy() {
        let store = MemoryProjectStore::new();
        let cfg = AuthConfig {
            policy: Some("p, broken".to_string()),
            ..Default::default()
        };
        assert!(AuthFactory::new().build(&cfg, &store).is_err());
    }
}
