use anyhow::{bail, Result};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::server::error::AuthError;
use crate::types::claims::Claims;

/// Issuer claim stamped into every self-issued session token. Tokens whose
/// issuer differs are handed to the federated verification path instead.
pub const SESSION_ISSUER: &str = "argod";

const TOKEN_ID_LENGTH: usize = 24;

/// Issues and verifies the server's own session tokens.
///
/// Session tokens are stateless HMAC-signed JWTs: nothing is stored
/// server-side at issuance, and revocation (for project-role tokens) works
/// through the role's issued-token ledger, not a blacklist.
pub struct SessionManager {
    issuer: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry: i64,
}

impl SessionManager {
    /// `expiry` is the default token lifetime in seconds; 0 means tokens do
    /// not expire unless the caller asks for a bounded lifetime.
    pub fn new(issuer: impl Into<String>, secret: &[u8], expiry: i64) -> Self {
        Self {
            issuer: issuer.into(),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            expiry,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signs a new session token for `subject`.
    ///
    /// `expires_in` overrides the configured lifetime when nonzero. An
    /// empty `id` gets a random one; the id ends up in the `jti` claim and,
    /// for project-role tokens, in the role's ledger.
    pub fn create(&self, subject: &str, expires_in: i64, id: &str) -> Result<String> {
        if subject.is_empty() {
            bail!("cannot issue a session token with an empty subject");
        }

        let now = Utc::now().timestamp();
        let expires_in = if expires_in == 0 { self.expiry } else { expires_in };

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: subject.to_string(),
            iat: Some(now),
            nbf: Some(now),
            exp: (expires_in != 0).then(|| now + expires_in),
            jti: Some(if id.is_empty() { random_id() } else { id.to_string() }),
            ..Default::default()
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key) {
            Ok(token) => Ok(token),
            Err(e) => bail!("sign session token: {e}"),
        }
    }

    /// Verifies a self-issued token: HMAC signature with the server's
    /// signing key, then issuer, expiry and not-before. Only the HS*
    /// algorithm family is acceptable on this path.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(map_parse_error)?;
        if !matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let mut validation = Validation::new(header.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();
        validation.set_issuer(&[&self.issuer]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(map_parse_error)?
            .claims;

        if claims.sub.is_empty() {
            return Err(AuthError::verification("token has an empty subject"));
        }

        let now = Utc::now().timestamp();
        if claims.exp.is_some_and(|exp| now >= exp) {
            return Err(AuthError::ExpiredToken);
        }
        if claims.nbf.is_some_and(|nbf| now < nbf) {
            return Err(AuthError::verification("token is not valid yet"));
        }

        Ok(claims)
    }
}

fn map_parse_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            AuthError::MalformedToken
        }
        ErrorKind::InvalidSignature => AuthError::verification("signature verification failed"),
        ErrorKind::InvalidIssuer => AuthError::verification("token has an invalid issuer"),
        ErrorKind::InvalidAlgorithm => AuthError::UnsupportedAlgorithm,
        _ => AuthError::verification(e.to_string()),
    }
}

fn random_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_ID_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new(SESSION_ISSUER, b"test-signing-key", 3600)
    }

    #[test]
    fn test_roundtrip() {
        let mgr = manager();
        for subject in ["admin", "alice", "proj:demo:ci"] {
            let token = mgr.create(subject, 0, "").unwrap();
            let claims = mgr.verify(&token).unwrap();
            assert_eq!(claims.sub, subject);
            assert_eq!(claims.iss, SESSION_ISSUER);
            assert!(claims.jti.is_some_and(|id| !id.is_empty()));
        }

        assert!(mgr.create("", 0, "").is_err());
    }

    #[test]
    fn test_explicit_id() {
        let mgr = manager();
        let token = mgr.create("proj:demo:ci", 0, "token-a").unwrap();
        let claims = mgr.verify(&token).unwrap();
        assert_eq!(claims.jti.as_deref(), Some("token-a"));
    }

    #[test]
    fn test_expired() {
        let mgr = manager();
        let token = mgr.create("admin", -60, "").unwrap();
        assert_eq!(mgr.verify(&token), Err(AuthError::ExpiredToken));
    }

    #[test]
    fn test_wrong_key() {
        let token = manager().create("admin", 0, "").unwrap();
        let other = SessionManager::new(SESSION_ISSUER, b"another-key", 3600);
        assert_eq!(
            other.verify(&token),
            Err(AuthError::verification("signature verification failed"))
        );
    }

    #[test]
    fn test_malformed() {
        let mgr = manager();
        assert_eq!(mgr.verify("bad"), Err(AuthError::MalformedToken));
        assert_eq!(mgr.verify(""), Err(AuthError::MalformedToken));
    }
}
