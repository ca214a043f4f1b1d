//! Access and ID token claims.
//!
//! Access tokens and ID tokens are derived data: they are signed, handed to
//! the caller, and never persisted. Validity is reconstructed by verifying
//! signature and expiry, never looked up by identifier.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Access token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// Issuer (authorization server URL).
    pub iss: String,

    /// Subject (user or client id).
    pub sub: String,

    /// Audience (resource server identifiers).
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Not-before time (Unix timestamp).
    pub nbf: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// JWT id (unique identifier).
    pub jti: String,

    /// Space-separated granted scopes.
    pub scope: String,

    /// OAuth client id the token was issued to.
    pub client_id: String,
}

impl AccessTokenClaims {
    /// Creates a new builder for access token claims.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> AccessTokenClaimsBuilder {
        AccessTokenClaimsBuilder::new(issuer, subject, client_id)
    }

    /// Iterates the granted scopes.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.scope.split_whitespace()
    }

    /// Returns `true` if every required scope is granted.
    #[must_use]
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|req| self.scopes().any(|granted| granted == *req))
    }
}

/// Builder for [`AccessTokenClaims`].
pub struct AccessTokenClaimsBuilder {
    iss: String,
    sub: String,
    aud: Vec<String>,
    exp: i64,
    nbf: i64,
    iat: i64,
    jti: String,
    scope: String,
    client_id: String,
}

impl AccessTokenClaimsBuilder {
    fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Vec::new(),
            exp: now + 3600,
            nbf: now,
            iat: now,
            jti: uuid::Uuid::new_v4().to_string(),
            scope: String::new(),
            client_id: client_id.into(),
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn audience(mut self, aud: Vec<String>) -> Self {
        self.aud = aud;
        self
    }

    /// Sets the expiration time in seconds from issuance.
    #[must_use]
    pub fn expires_in_seconds(mut self, seconds: i64) -> Self {
        self.exp = self.iat + seconds;
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Builds the access token claims.
    #[must_use]
    pub fn build(self) -> AccessTokenClaims {
        AccessTokenClaims {
            iss: self.iss,
            sub: self.sub,
            aud: self.aud,
            exp: self.exp,
            nbf: self.nbf,
            iat: self.iat,
            jti: self.jti,
            scope: self.scope,
            client_id: self.client_id,
        }
    }
}

/// ID token claims for OpenID Connect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdTokenClaims {
    /// Issuer (authorization server URL).
    pub iss: String,

    /// Subject (user id).
    pub sub: String,

    /// Audience (client id).
    pub aud: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Nonce from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}
