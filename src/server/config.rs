use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Authentication/authorization configuration of the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Allow requests without (or with invalid) credentials to proceed
    /// anonymously. Defaults to false.
    #[serde(default = "AuthConfig::default_anonymous_enabled")]
    pub anonymous_enabled: bool,

    /// Role granted to requests matching no other rule, e.g.
    /// "role:readonly". Defaults to none (deny by default).
    #[serde(default)]
    pub default_role: Option<String>,

    /// Operator-supplied policy text, appended to the built-in policy.
    #[serde(default)]
    pub policy: Option<String>,

    #[serde(default)]
    pub session: SessionConfig,

    /// Federated identity provider. When unset, only self-issued session
    /// tokens are accepted and SSO logins fail as not configured.
    #[serde(default)]
    pub oidc: Option<OidcConfig>,
}

/// Self-issued session token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Issuer claim for tokens this server signs; also how incoming tokens
    /// are recognized as self-issued.
    #[serde(default = "SessionConfig::default_issuer")]
    pub issuer: String,

    /// HMAC signing secret. When empty, a random secret is generated at
    /// startup (sessions then do not survive a restart).
    #[serde(default)]
    pub secret: String,

    /// Token lifetime in seconds; 0 issues non-expiring tokens.
    /// Defaults to 24 hours.
    #[serde(default = "SessionConfig::default_expiry")]
    pub expiry: i64,
}

/// Federated identity provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Issuer URL, e.g. "https://accounts.example.com". The discovery
    /// document is fetched under its `/.well-known/openid-configuration`.
    pub issuer: String,

    /// Client identifier this server is registered as; id tokens must list
    /// it in their audience.
    pub client_id: String,

    /// Seconds to cache the provider's discovery document and key set.
    #[serde(default = "OidcConfig::default_cache_expiry")]
    pub cache_expiry: u64,

    /// Timeout in seconds for discovery and key-set requests.
    #[serde(default = "OidcConfig::default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            anonymous_enabled: Self::default_anonymous_enabled(),
            default_role: None,
            policy: None,
            session: SessionConfig::default(),
            oidc: None,
        }
    }
}

impl AuthConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut cfg = match fs::read_to_string(path) {
            Ok(text) => toml::from_str(&text)
                .with_context(|| format!("parse config file '{}'", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                return Err(err).with_context(|| format!("read config file '{}'", path.display()))
            }
        };
        cfg.validate().context("validate config")?;
        Ok(cfg)
    }

    pub fn validate(&mut self) -> Result<()> {
        if self.session.issuer.is_empty() {
            bail!("session issuer cannot be empty");
        }
        if self.session.expiry < 0 {
            bail!("session expiry cannot be negative");
        }

        if let Some(oidc) = &self.oidc {
            if oidc.issuer.is_empty() {
                bail!("oidc issuer cannot be empty");
            }
            if oidc.client_id.is_empty() {
                bail!("oidc client_id cannot be empty");
            }
            if oidc.request_timeout == 0 {
                bail!("oidc request_timeout cannot be 0");
            }
        }

        Ok(())
    }

    pub fn default_anonymous_enabled() -> bool {
        false
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            issuer: Self::default_issuer(),
            secret: String::new(),
            expiry: Self::default_expiry(),
        }
    }
}

impl SessionConfig {
    pub fn default_issuer() -> String {
        String::from(crate::server::authn::session::SESSION_ISSUER)
    }

    pub fn default_expiry() -> i64 {
        60 * 60 * 24
    }
}

impl Default for OidcConfig {
    fn default() -> Self {
        Self {
            issuer: String::new(),
            client_id: String::new(),
            cache_expiry: Self::default_cache_expiry(),
            request_timeout: Self::default_request_timeout(),
        }
    }
}

impl OidcConfig {
    pub fn default_cache_expiry() -> u64 {
        5 * 60
    }

    pub fn default_request_timeout() -> u64 {
        10
    }
}
