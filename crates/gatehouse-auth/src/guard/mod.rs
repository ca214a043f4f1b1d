//! Bearer token guard for protected resources.
//!
//! This module provides an axum extractor that validates
//! `Authorization: Bearer` tokens and exposes the verified claims to
//! handlers. The guard is stateless: it depends only on the token codec
//! (and through it the key ring), never on a store.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use gatehouse_auth::guard::{BearerAuth, GuardState};
//!
//! async fn protected(BearerAuth(ctx): BearerAuth) -> String {
//!     ctx.require_scopes(&["read"])?;
//!     format!("Hello, {}!", ctx.subject())
//! }
//!
//! let app = Router::new()
//!     .route("/protected", get(protected))
//!     .with_state(guard_state);
//! ```

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::error::AuthError;
use crate::token::claims::AccessTokenClaims;
use crate::token::codec::TokenCodec;

// =============================================================================
// Guard State
// =============================================================================

/// State required for bearer token validation.
///
/// Include this in your application state and expose it to the
/// [`BearerAuth`] extractor via `FromRef`.
#[derive(Clone)]
pub struct GuardState {
    /// Token codec for signature verification.
    pub codec: Arc<TokenCodec>,
}

impl GuardState {
    /// Creates a new guard state.
    #[must_use]
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

// =============================================================================
// Token Context
// =============================================================================

/// Verified token claims exposed to request handlers.
#[derive(Debug, Clone)]
pub struct TokenContext {
    claims: AccessTokenClaims,
}

impl TokenContext {
    /// Creates a context from verified claims.
    #[must_use]
    pub fn new(claims: AccessTokenClaims) -> Self {
        Self { claims }
    }

    /// The authenticated subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// The client the token was issued to.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.claims.client_id
    }

    /// The granted scopes (space-separated).
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.claims.scope
    }

    /// The verified claims.
    #[must_use]
    pub fn claims(&self) -> &AccessTokenClaims {
        &self.claims
    }

    /// Requires that every listed scope was granted.
    ///
    /// # Errors
    /// Returns a rejection rendering as `403` with
    /// `error="insufficient_scope"` when a scope is missing.
    pub fn require_scopes(&self, required: &[&str]) -> Result<(), GuardRejection> {
        if self.claims.has_scopes(required) {
            Ok(())
        } else {
            Err(GuardRejection(AuthError::insufficient_scope(
                required.join(" "),
            )))
        }
    }
}

// =============================================================================
// Bearer Auth Extractor
// =============================================================================

/// Axum extractor that validates Bearer tokens.
///
/// 1. Extracts the `Authorization: Bearer <token>` header
/// 2. Verifies signature, expiry, not-before, issuer, and audience via the
///    codec
/// 3. Exposes the verified claims as a [`TokenContext`]
///
/// Failure responds with `401` and a `WWW-Authenticate: Bearer` challenge.
pub struct BearerAuth(pub TokenContext);

impl<S> FromRequestParts<S> for BearerAuth
where
    GuardState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let guard = GuardState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                GuardRejection(AuthError::unauthorized("Missing Authorization header"))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            GuardRejection(AuthError::unauthorized("Authorization header is not Bearer"))
        })?;

        let claims = guard.codec.verify(token).map_err(GuardRejection)?;
        Ok(Self(TokenContext::new(claims)))
    }
}

// =============================================================================
// Rejection
// =============================================================================

/// Rejection produced by the guard; renders the RFC 6750 challenge.
#[derive(Debug)]
pub struct GuardRejection(pub AuthError);

impl IntoResponse for GuardRejection {
    fn into_response(self) -> Response {
        let (status, challenge) = match &self.0 {
            AuthError::Unauthorized { .. } => {
                (StatusCode::UNAUTHORIZED, r#"Bearer realm="gatehouse""#.to_string())
            }
            AuthError::InsufficientScope { required } => (
                StatusCode::FORBIDDEN,
                format!(
                    r#"Bearer realm="gatehouse", error="insufficient_scope", scope="{required}""#
                ),
            ),
            _ => (
                StatusCode::UNAUTHORIZED,
                r#"Bearer realm="gatehouse", error="invalid_token""#.to_string(),
            ),
        };

        let body = Json(json!({
            "error": self.0.oauth_error_code(),
        }));

        let mut response = (status, body).into_response();
        if let Ok(value) = challenge.parse() {
            response
                .headers_mut()
                .insert(axum::http::header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KeyRing, SigningAlgorithm};

    fn make_codec() -> Arc<TokenCodec> {
        let ring = Arc::new(KeyRing::generate(SigningAlgorithm::RS256).unwrap());
        Arc::new(TokenCodec::new(
            ring,
            "https://id.example.com",
            "https://api.example.com",
        ))
    }

    fn make_context(scope: &str) -> TokenContext {
        let claims = AccessTokenClaims::builder("https://id.example.com", "user-1", "web-app")
            .audience(vec!["https://api.example.com".to_string()])
            .scope(scope)
            .build();
        TokenContext::new(claims)
    }

    #[test]
    fn test_context_accessors() {
        let ctx = make_context("read write");
        assert_eq!(ctx.subject(), "user-1");
        assert_eq!(ctx.client_id(), "web-app");
        assert_eq!(ctx.scope(), "read write");
    }

    #[test]
    fn test_require_scopes_subset() {
        let ctx = make_context("read write");
        assert!(ctx.require_scopes(&["read"]).is_ok());
        assert!(ctx.require_scopes(&["read", "write"]).is_ok());
    }

    #[test]
    fn test_require_scopes_missing() {
        let ctx = make_context("read");
        let rejection = ctx.require_scopes(&["read", "write"]).unwrap_err();
        assert!(matches!(rejection.0, AuthError::InsufficientScope { .. }));
    }

    #[test]
    fn test_rejection_challenge_headers() {
        let response =
            GuardRejection(AuthError::unauthorized("missing header")).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(axum::http::header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.starts_with("Bearer"));

        let response = GuardRejection(AuthError::InvalidToken).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let challenge = response
            .headers()
            .get(axum::http::header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(challenge.contains("invalid_token"));

        let response =
            GuardRejection(AuthError::insufficient_scope("write")).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthorized_not_a_panic() {
        let codec = make_codec();
        let claims = AccessTokenClaims::builder(codec.issuer(), "user-1", "web-app")
            .audience(vec![codec.audience().to_string()])
            .scope("read")
            .expires_in_seconds(-60)
            .build();
        let token = codec.sign(&claims).unwrap();

        let err = codec.verify(&token).unwrap_err();
        let response = GuardRejection(err).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
