//! Authorization code domain type.
//!
//! An authorization code is a short-lived, single-use credential issued by
//! the authorization endpoint and exchanged for tokens at the token endpoint.
//! The code value itself is opaque 256-bit random data; all state needed to
//! validate the exchange (client, subject, scopes, redirect URI, PKCE
//! challenge) travels with the record.
//!
//! # Security
//!
//! - Codes are cryptographically random (256 bits)
//! - Codes transition unused -> consumed exactly once; the store enforces
//!   this with a compare-and-set on `consumed_at`
//! - A second consumption attempt is treated as replay and revokes every
//!   token already issued from the code

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An in-flight authorization code grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationCode {
    /// Unique identifier for this grant record.
    pub id: Uuid,

    /// The opaque code value (one-time use).
    /// 256-bit random value, base64url-encoded.
    pub code: String,

    /// Client identifier the code was issued to.
    pub client_id: String,

    /// Subject (resource owner) that authorized the request.
    pub subject: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Redirect URI used in the authorization request.
    /// The token request must present the same value.
    pub redirect_uri: String,

    /// PKCE code challenge from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// OpenID Connect nonce for ID token binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Timestamp when the code was issued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// Timestamp when the code expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// Timestamp when the code was exchanged. None until consumed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub consumed_at: Option<OffsetDateTime>,
}

impl AuthorizationCode {
    /// Generates a new cryptographically secure code value.
    ///
    /// The code is 32 bytes of random data encoded as base64url without
    /// padding (43 characters), exceeding the 128-bit minimum entropy the
    /// protocol recommends.
    #[must_use]
    pub fn generate_code() -> String {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Returns `true` if the code has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if the code has already been exchanged.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }

    /// Returns `true` if the code can still be exchanged.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_consumed()
    }
}
