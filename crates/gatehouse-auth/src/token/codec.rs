//! Token signing and verification.
//!
//! The codec signs claims with the key ring's active key (stamping the `kid`
//! into the JWT header) and verifies presented tokens by resolving the
//! header's `kid` back through the ring. Verification checks signature,
//! `exp`, `nbf`, `iss`, and `aud`; every failure collapses into the single
//! generic [`AuthError::InvalidToken`] so callers cannot distinguish which
//! check failed.

use std::sync::Arc;

use jsonwebtoken::{Header, Validation, decode, decode_header, encode};
use serde::Serialize;

use crate::AuthResult;
use crate::error::AuthError;
use crate::keys::KeyRing;
use crate::token::claims::AccessTokenClaims;

/// Encodes, decodes, and verifies signed tokens against the key ring.
///
/// Thread-safe (`Send + Sync`); share it behind an `Arc`.
pub struct TokenCodec {
    key_ring: Arc<KeyRing>,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    /// Creates a new token codec.
    ///
    /// # Arguments
    /// * `key_ring` - Signing key material
    /// * `issuer` - Expected `iss` claim value
    /// * `audience` - Expected `aud` claim value
    #[must_use]
    pub fn new(key_ring: Arc<KeyRing>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            key_ring,
            issuer: issuer.into(),
            audience: audience.into(),
        }
    }

    /// Signs claims into a JWT string using the active key.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> AuthResult<String> {
        let key = self.key_ring.active_key();
        let mut header = Header::new(key.algorithm.to_jwt_algorithm());
        header.kid = Some(key.kid.clone());

        encode(&header, claims, key.encoding_key())
            .map_err(|e| AuthError::internal(format!("Failed to encode token: {e}")))
    }

    /// Verifies a presented access token.
    ///
    /// Checks signature validity against the key ring, `exp` not passed,
    /// `nbf` not in the future, and `iss`/`aud` against expected values.
    ///
    /// # Errors
    /// Any single check failure yields the generic `InvalidToken` error.
    /// A token referencing an unknown or purged key id fails the same way;
    /// that is an invalid-signature condition, never a retry.
    pub fn verify(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        let kid = header.kid.as_deref().ok_or(AuthError::InvalidToken)?;

        let key = self.key_ring.key_for(kid).map_err(|_| AuthError::InvalidToken)?;

        let mut validation = Validation::new(key.algorithm.to_jwt_algorithm());
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation.validate_nbf = true;

        decode::<AccessTokenClaims>(token, key.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Returns the issuer value stamped into tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the audience value stamped into tokens.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Returns the key ring backing this codec.
    #[must_use]
    pub fn key_ring(&self) -> &Arc<KeyRing> {
        &self.key_ring
    }
}
