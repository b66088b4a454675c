use thiserror::Error;

/// Request-scoped authentication failures. All variants are non-fatal to the
/// server process; the transport layer maps them to a rejected request.
///
/// The Display strings are part of the external contract: API clients match
/// on these substrings to tell the failure cases apart.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("no session information")]
    NoSessionInformation,

    #[error("token contains an invalid number of segments")]
    MalformedToken,

    #[error("token is expired")]
    ExpiredToken,

    #[error("id token signed with unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("no audience found in the token")]
    NoAudience,

    #[error("SSO is not configured")]
    SsoNotConfigured,

    /// Residual verification failures: bad signature, issuer mismatch,
    /// unknown key id, discovery or key-set fetch problems.
    #[error("token verification failed: {0}")]
    Verification(String),
}

impl AuthError {
    pub fn verification(msg: impl Into<String>) -> Self {
        Self::Verification(msg.into())
    }
}
