//! Refresh token domain type.
//!
//! Refresh tokens allow clients to obtain new access tokens without user
//! re-authentication. They are long-lived, stored as SHA-256 hashes (never
//! plaintext), and form rotation chains: each rotation revokes the presented
//! token and issues a child linked to it via `parent_id`. Revoking any token
//! in a chain revokes all of its descendants.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A persisted refresh token record.
///
/// # Storage Security
///
/// The token value itself is never stored. Only a SHA-256 hash is persisted.
/// When validating a presented token:
///
/// 1. Hash the incoming value
/// 2. Look up by hash
/// 3. Check expiration and revocation before use
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Unique identifier for this refresh token record.
    pub id: Uuid,

    /// SHA-256 hash of the actual token value.
    pub token_hash: String,

    /// Client this token was issued to.
    pub client_id: String,

    /// Subject (resource owner) that authorized this token.
    pub subject: String,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Parent token in the rotation chain. None for the first token issued
    /// from an authorization code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,

    /// The authorization code grant this chain originated from. Replay of
    /// that code revokes every token carrying its id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_id: Option<Uuid>,

    /// When this token was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    /// When this token expires.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// When this token was revoked (None = not revoked).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub revoked_at: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        OffsetDateTime::now_utc() > self.expires_at
    }

    /// Returns `true` if this token has been revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    /// Returns `true` if this token is valid (not expired and not revoked).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.is_expired() && !self.is_revoked()
    }

    /// Hash a token value using SHA-256.
    ///
    /// Used both when storing new tokens and when looking up presented
    /// tokens for validation.
    #[must_use]
    pub fn hash_token(token: &str) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a cryptographically secure random token value.
    ///
    /// Returns a 256-bit random value encoded as base64url (43 characters).
    #[must_use]
    pub fn generate_token() -> String {
        use base64::Engine;
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;

        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn make_token(
        expires_at: OffsetDateTime,
        revoked_at: Option<OffsetDateTime>,
    ) -> RefreshToken {
        RefreshToken {
            id: Uuid::new_v4(),
            token_hash: RefreshToken::hash_token("test-token"),
            client_id: "web-app".to_string(),
            subject: "user-1".to_string(),
            scope: "read offline_access".to_string(),
            parent_id: None,
            code_id: Some(Uuid::new_v4()),
            created_at: OffsetDateTime::now_utc(),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn test_hash_token() {
        let hash = RefreshToken::hash_token("some-token");

        // SHA-256 produces 64 hex characters.
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, RefreshToken::hash_token("some-token"));
        assert_ne!(hash, RefreshToken::hash_token("other-token"));
    }

    #[test]
    fn test_generate_token() {
        let token = RefreshToken::generate_token();
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_validity() {
        let now = OffsetDateTime::now_utc();

        let token = make_token(now + Duration::hours(1), None);
        assert!(token.is_valid());

        let expired = make_token(now - Duration::minutes(1), None);
        assert!(expired.is_expired());
        assert!(!expired.is_valid());

        let revoked = make_token(now + Duration::hours(1), Some(now));
        assert!(revoked.is_revoked());
        assert!(!revoked.is_valid());
    }

    #[test]
    fn test_serde_roundtrip() {
        let token = make_token(OffsetDateTime::now_utc() + Duration::hours(1), None);
        let json = serde_json::to_string(&token).unwrap();
        let parsed: RefreshToken = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id, token.id);
        assert_eq!(parsed.token_hash, token.token_hash);
        assert_eq!(parsed.code_id, token.code_id);
        assert!(parsed.parent_id.is_none());
    }
}
