//! Authorization server configuration.
//!
//! Configuration is deserialized from TOML with serde. Every section has a
//! `Default` impl so a partial file (or none at all) still produces a
//! runnable configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! issuer = "https://id.example.com"
//! audience = "https://api.example.com"
//!
//! [oauth]
//! authorization_code_lifetime = "60s"
//! access_token_lifetime = "1h"
//! refresh_token_lifetime = "30d"
//! refresh_token_rotation = true
//!
//! [signing]
//! algorithm = "RS256"
//! rotation_interval = "30d"
//! retirement_grace = "2h"
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::keys::SigningAlgorithm;

/// Root authorization server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL (used in the token `iss` claim and verified on decode).
    /// This should be the public base URL of the authorization server.
    pub issuer: String,

    /// Audience value stamped into access tokens and expected by the guard.
    pub audience: String,

    /// Scopes this server knows about. Requesting a scope outside this set
    /// is an `invalid_scope` error rather than a silent drop.
    pub known_scopes: Vec<String>,

    /// OAuth 2.0 grant handling configuration.
    pub oauth: OAuthConfig,

    /// Token signing configuration.
    pub signing: SigningConfig,

    /// Bounded timeout applied to store calls. A timeout surfaces as a
    /// transient failure, distinct from an invalid-credential failure.
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:8080".to_string(),
            audience: "http://localhost:8080/api".to_string(),
            known_scopes: vec![
                "openid".to_string(),
                "profile".to_string(),
                "offline_access".to_string(),
                "read".to_string(),
                "write".to_string(),
            ],
            oauth: OAuthConfig::default(),
            signing: SigningConfig::default(),
            store_timeout: Duration::from_secs(5),
        }
    }
}

impl AuthConfig {
    /// Returns `true` if the scope name is known to this server.
    #[must_use]
    pub fn is_known_scope(&self, scope: &str) -> bool {
        self.known_scopes.iter().any(|s| s == scope)
    }
}

/// OAuth 2.0 grant handling configuration.
///
/// Controls credential lifetimes and refresh token rotation behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Authorization code lifetime. Codes are single-use and should be
    /// short-lived.
    #[serde(with = "humantime_serde")]
    pub authorization_code_lifetime: Duration,

    /// Access token lifetime. Shorter lifetimes are more secure but require
    /// more frequent refresh.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,

    /// ID token lifetime.
    #[serde(with = "humantime_serde")]
    pub id_token_lifetime: Duration,

    /// Refresh token lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_lifetime: Duration,

    /// Rotate refresh tokens on use. When enabled, each refresh revokes the
    /// presented token and issues a child linked to it, so a detected replay
    /// can revoke the whole chain.
    pub refresh_token_rotation: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: Duration::from_secs(60),
            access_token_lifetime: Duration::from_secs(3600),
            id_token_lifetime: Duration::from_secs(3600),
            refresh_token_lifetime: Duration::from_secs(30 * 24 * 3600),
            refresh_token_rotation: true,
        }
    }
}

/// Token signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm for newly generated keys.
    pub algorithm: SigningAlgorithm,

    /// How long a key stays active before rotation.
    #[serde(with = "humantime_serde")]
    pub rotation_interval: Duration,

    /// How long a retired key is kept for verification after rotation.
    /// Must cover at least the longest access token lifetime, or rotation
    /// would invalidate outstanding tokens.
    #[serde(with = "humantime_serde")]
    pub retirement_grace: Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::RS256,
            rotation_interval: Duration::from_secs(30 * 24 * 3600),
            retirement_grace: Duration::from_secs(2 * 3600),
        }
    }
}
