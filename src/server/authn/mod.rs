pub mod cookie;
pub mod extract;
pub mod oidc;
pub mod session;
pub mod verify;

use std::sync::Arc;

use log::debug;

use crate::server::error::AuthError;
use crate::server::metadata::RequestMetadata;
use crate::types::claims::Claims;

use self::extract::TokenExtractor;
use self::verify::TokenVerifier;

/// Request-level authentication: extract a candidate token, verify it, and
/// produce the identity the request proceeds with.
///
/// `Ok(Some(claims))` is an authenticated identity, `Ok(None)` is anonymous
/// access (only possible when enabled), and `Err` rejects the request.
pub struct Authenticator {
    extractor: TokenExtractor,
    verifier: Arc<TokenVerifier>,
    anonymous_enabled: bool,
}

impl Authenticator {
    pub fn new(verifier: Arc<TokenVerifier>, anonymous_enabled: bool) -> Self {
        Self {
            extractor: TokenExtractor::new(),
            verifier,
            anonymous_enabled,
        }
    }

    pub async fn authenticate(&self, md: &RequestMetadata) -> Result<Option<Claims>, AuthError> {
        let Some(token) = self.extractor.extract(md) else {
            if self.anonymous_enabled {
                return Ok(None);
            }
            return Err(AuthError::NoSessionInformation);
        };

        match self.verifier.verify(&token).await {
            // A present and valid token always wins over anonymous access.
            Ok(claims) => Ok(Some(claims)),
            // Anonymous access is a blanket fallback: expired, malformed and
            // otherwise rejected tokens all degrade to "no identity".
            Err(e) if self.anonymous_enabled => {
                debug!("Treating request with invalid token as anonymous: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
