use std::sync::Arc;

use crate::server::error::AuthError;
use crate::types::claims::Claims;

use super::oidc::OidcProvider;
use super::session::SessionManager;

/// Exactly two ways to verify a bearer token. The strategy is picked by
/// comparing the token's (unverified) issuer claim against the server's own
/// session issuer; there is no other dispatch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VerifyStrategy {
    /// Self-issued session token, verified with the server's HMAC key.
    LocalSymmetric,
    /// Federated id token, verified with the provider's published keys.
    FederatedAsymmetric,
}

/// Verifies raw bearer tokens into normalized claims.
pub struct TokenVerifier {
    session: Arc<SessionManager>,
    oidc: Option<Arc<OidcProvider>>,
}

impl TokenVerifier {
    pub fn new(session: Arc<SessionManager>, oidc: Option<Arc<OidcProvider>>) -> Self {
        Self { session, oidc }
    }

    pub fn strategy(&self, claims: &Claims) -> VerifyStrategy {
        if claims.iss == self.session.issuer() {
            VerifyStrategy::LocalSymmetric
        } else {
            VerifyStrategy::FederatedAsymmetric
        }
    }

    /// Verifies the token's signature and standard claims, branching between
    /// the local and federated paths. Taking the federated path on a server
    /// with no identity provider configured fails with `SsoNotConfigured`
    /// before any network activity.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let unverified = Claims::parse_unverified(token)?;

        match self.strategy(&unverified) {
            VerifyStrategy::LocalSymmetric => self.session.verify(token),
            VerifyStrategy::FederatedAsymmetric => match &self.oidc {
                Some(provider) => provider.verify(token).await,
                None => Err(AuthError::SsoNotConfigured),
            },
        }
    }
}
