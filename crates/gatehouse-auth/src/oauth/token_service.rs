//! Grant exchange at the token endpoint.
//!
//! Handles the `authorization_code` and `refresh_token` grants. All grant
//! handling is request-scoped; the only shared state is what lives behind
//! the store traits, and the single-use transitions (code consumption,
//! refresh rotation) are atomic compare-and-set operations in the store.
//!
//! # Replay policy
//!
//! A second consumption of an authorization code, or presentation of an
//! already-rotated refresh token, is treated as credential theft: every
//! token issued from the same origin is revoked and a security event is
//! logged. On the wire the caller sees a plain `invalid_grant`.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::client_auth::{ClientCredentials, authenticate_client};
use crate::oauth::pkce::{PkceChallenge, PkceVerifier};
use crate::oauth::token::{TokenRequest, TokenResponse};
use crate::storage::{ClientStore, GrantStore, with_timeout};
use crate::token::claims::{AccessTokenClaims, IdTokenClaims};
use crate::token::codec::TokenCodec;
use crate::types::{AuthorizationCode, Client, GrantType, RefreshToken};

/// Exchanges authorization codes and refresh tokens for access tokens.
pub struct TokenService {
    codec: Arc<TokenCodec>,
    clients: Arc<dyn ClientStore>,
    grants: Arc<dyn GrantStore>,
    config: AuthConfig,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        codec: Arc<TokenCodec>,
        clients: Arc<dyn ClientStore>,
        grants: Arc<dyn GrantStore>,
        config: AuthConfig,
    ) -> Self {
        Self {
            codec,
            clients,
            grants,
            config,
        }
    }

    /// Handles a token request.
    ///
    /// Authenticates the client (HTTP Basic Auth or body parameters) and
    /// dispatches on `grant_type`.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` - client authentication failed
    /// - `UnsupportedGrantType` - unknown `grant_type`
    /// - grant-specific errors from [`exchange_code`](Self::exchange_code)
    ///   and [`refresh`](Self::refresh)
    pub async fn exchange(
        &self,
        request: &TokenRequest,
        authorization_header: Option<&str>,
    ) -> AuthResult<TokenResponse> {
        let credentials = ClientCredentials::extract(authorization_header, request)?;
        let authenticated = authenticate_client(&credentials, self.clients.as_ref()).await?;

        match GrantType::parse(&request.grant_type) {
            Some(GrantType::AuthorizationCode) => {
                self.exchange_code(request, &authenticated.client).await
            }
            Some(GrantType::RefreshToken) => self.refresh(request, &authenticated.client).await,
            None => Err(AuthError::unsupported_grant_type(&request.grant_type)),
        }
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// Consumes the code atomically, checks that the presenting client and
    /// redirect URI match the original authorization request, verifies the
    /// PKCE verifier, then issues an access token (plus a refresh token when
    /// the client may use the refresh grant, plus an ID token when `openid`
    /// was granted).
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` - missing `code` parameter
    /// - `InvalidGrant` - unknown/expired code, wrong client, wrong redirect
    ///   URI, or failed PKCE verification
    /// - `ReplayDetected` - the code was already consumed; the chain issued
    ///   from it has been revoked
    pub async fn exchange_code(
        &self,
        request: &TokenRequest,
        client: &Client,
    ) -> AuthResult<TokenResponse> {
        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_client(
                "Client may not use the authorization code grant",
            ));
        }

        let code_value = request
            .code
            .as_deref()
            .ok_or_else(|| AuthError::invalid_request("Missing required parameter: code"))?;

        let code = self.consume_code(code_value, client).await?;

        // The token request must present the redirect URI the code was
        // bound to.
        if request.redirect_uri.as_deref() != Some(code.redirect_uri.as_str()) {
            return Err(AuthError::invalid_grant(
                "redirect_uri does not match the authorization request",
            ));
        }

        self.verify_pkce(&code, request)?;

        self.issue_tokens(client, &code).await
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// With rotation enabled (the default) the presented token is atomically
    /// revoked and a child token linked to it is issued; the returned scopes
    /// preserve or narrow the original grant, never widen it.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` - unknown, expired, or foreign refresh token
    /// - `InvalidScope` - the requested scope exceeds the original grant
    /// - `ReplayDetected` - the token was already rotated; its chain has
    ///   been revoked
    pub async fn refresh(&self, request: &TokenRequest, client: &Client) -> AuthResult<TokenResponse> {
        if !client.is_grant_type_allowed(GrantType::RefreshToken) {
            return Err(AuthError::invalid_client(
                "Client may not use the refresh token grant",
            ));
        }

        let token_value = request
            .refresh_token
            .as_deref()
            .ok_or_else(|| AuthError::invalid_grant("Missing refresh_token parameter"))?;
        let token_hash = RefreshToken::hash_token(token_value);

        let (old, rotated) = if self.config.oauth.refresh_token_rotation {
            (self.rotate_token(&token_hash).await?, true)
        } else {
            let token = with_timeout(
                self.config.store_timeout,
                "find_refresh_token_by_hash",
                self.grants.find_refresh_token_by_hash(&token_hash),
            )
            .await?
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

            if !token.is_valid() {
                return Err(AuthError::invalid_grant("Refresh token expired or revoked"));
            }
            (token, false)
        };

        if old.client_id != client.client_id {
            // A foreign client presenting a valid token is indistinguishable
            // from theft; kill the chain.
            self.revoke_chain_for(&old, "refresh token presented by wrong client")
                .await;
            return Err(AuthError::invalid_grant(
                "Refresh token was issued to another client",
            ));
        }

        if old.is_expired() {
            return Err(AuthError::invalid_grant("Refresh token expired"));
        }

        let scope = narrow_scope(request.scope.as_deref(), &old.scope)?;

        let access_lifetime = self.access_lifetime(client);
        let access_token = self.sign_access_token(client, &old.subject, &scope, access_lifetime)?;

        let mut response = TokenResponse::new(
            access_token,
            access_lifetime.whole_seconds() as u64,
            scope.clone(),
        );

        if rotated {
            let child = RefreshToken {
                id: Uuid::new_v4(),
                token_hash: String::new(), // filled below with the new value's hash
                client_id: client.client_id.clone(),
                subject: old.subject.clone(),
                scope,
                parent_id: Some(old.id),
                code_id: old.code_id,
                created_at: OffsetDateTime::now_utc(),
                // The chain keeps the original expiration; rotation must not
                // extend the grant's life.
                expires_at: old.expires_at,
                revoked_at: None,
            };
            let value = self.store_refresh_token(child).await?;
            response = response.with_refresh_token(value);
        }

        Ok(response)
    }

    /// Consumes a code, escalating a replay to chain revocation.
    async fn consume_code(&self, code_value: &str, client: &Client) -> AuthResult<AuthorizationCode> {
        match with_timeout(
            self.config.store_timeout,
            "consume_code",
            self.grants.consume_code(code_value),
        )
        .await
        {
            Ok(code) => {
                if code.client_id != client.client_id {
                    return Err(AuthError::invalid_grant(
                        "Authorization code was issued to another client",
                    ));
                }
                Ok(code)
            }
            Err(AuthError::ReplayDetected { kind }) => {
                // The code was already redeemed once: revoke everything that
                // exchange produced.
                if let Ok(Some(code)) = self.grants.find_code(code_value).await {
                    let revoked = self.grants.revoke_by_code(code.id).await.unwrap_or(0);
                    tracing::warn!(
                        target: "gatehouse::security",
                        client_id = %client.client_id,
                        code_client_id = %code.client_id,
                        revoked,
                        "authorization code replay detected; chain revoked"
                    );
                }
                Err(AuthError::ReplayDetected { kind })
            }
            Err(err) => Err(err),
        }
    }

    /// Atomically revokes the presented token, escalating replay.
    async fn rotate_token(&self, token_hash: &str) -> AuthResult<RefreshToken> {
        match with_timeout(
            self.config.store_timeout,
            "revoke_refresh_token",
            self.grants.revoke_refresh_token(token_hash),
        )
        .await
        {
            Ok(token) => Ok(token),
            Err(AuthError::ReplayDetected { kind }) => {
                if let Ok(Some(token)) = self.grants.find_refresh_token_by_hash(token_hash).await {
                    self.revoke_chain_for(&token, "refresh token replay detected")
                        .await;
                }
                Err(AuthError::ReplayDetected { kind })
            }
            Err(err) => Err(err),
        }
    }

    async fn revoke_chain_for(&self, token: &RefreshToken, reason: &'static str) {
        let revoked = self.grants.revoke_chain(token.id).await.unwrap_or(0);
        tracing::warn!(
            target: "gatehouse::security",
            client_id = %token.client_id,
            revoked,
            reason,
            "refresh token chain revoked"
        );
    }

    /// Issues the access token (and refresh/ID tokens) for a consumed code.
    async fn issue_tokens(&self, client: &Client, code: &AuthorizationCode) -> AuthResult<TokenResponse> {
        let access_lifetime = self.access_lifetime(client);
        let access_token =
            self.sign_access_token(client, &code.subject, &code.scope, access_lifetime)?;

        let mut response = TokenResponse::new(
            access_token,
            access_lifetime.whole_seconds() as u64,
            code.scope.clone(),
        );

        if client.is_grant_type_allowed(GrantType::RefreshToken) {
            let refresh_lifetime = client
                .refresh_token_lifetime
                .map(Duration::seconds)
                .unwrap_or_else(|| {
                    Duration::try_from(self.config.oauth.refresh_token_lifetime)
                        .unwrap_or(Duration::days(30))
                });

            let now = OffsetDateTime::now_utc();
            let token = RefreshToken {
                id: Uuid::new_v4(),
                token_hash: String::new(),
                client_id: client.client_id.clone(),
                subject: code.subject.clone(),
                scope: code.scope.clone(),
                parent_id: None,
                code_id: Some(code.id),
                created_at: now,
                expires_at: now + refresh_lifetime,
                revoked_at: None,
            };
            let value = self.store_refresh_token(token).await?;
            response = response.with_refresh_token(value);
        }

        if code.scope.split_whitespace().any(|s| s == "openid") {
            response = response.with_id_token(self.sign_id_token(client, code)?);
        }

        Ok(response)
    }

    /// Generates a fresh token value, hashes it into the record, stores the
    /// record, and returns the plaintext value for the response.
    async fn store_refresh_token(&self, mut token: RefreshToken) -> AuthResult<String> {
        let value = RefreshToken::generate_token();
        token.token_hash = RefreshToken::hash_token(&value);

        with_timeout(
            self.config.store_timeout,
            "put_refresh_token",
            self.grants.put_refresh_token(&token),
        )
        .await?;

        Ok(value)
    }

    fn verify_pkce(&self, code: &AuthorizationCode, request: &TokenRequest) -> AuthResult<()> {
        let Some(ref challenge) = code.code_challenge else {
            return Ok(());
        };

        let verifier_value = request
            .code_verifier
            .as_deref()
            .ok_or_else(|| AuthError::invalid_grant("Missing required parameter: code_verifier"))?;

        let verifier = PkceVerifier::new(verifier_value.to_string())
            .map_err(|_| AuthError::invalid_grant("PKCE verification failed"))?;
        let challenge = PkceChallenge::new(challenge.clone())
            .map_err(|_| AuthError::invalid_grant("PKCE verification failed"))?;

        challenge
            .verify(&verifier)
            .map_err(|_| AuthError::invalid_grant("PKCE verification failed"))
    }

    fn access_lifetime(&self, client: &Client) -> Duration {
        client
            .access_token_lifetime
            .map(Duration::seconds)
            .unwrap_or_else(|| {
                Duration::try_from(self.config.oauth.access_token_lifetime)
                    .unwrap_or(Duration::hours(1))
            })
    }

    fn sign_access_token(
        &self,
        client: &Client,
        subject: &str,
        scope: &str,
        lifetime: Duration,
    ) -> AuthResult<String> {
        let claims = AccessTokenClaims::builder(self.codec.issuer(), subject, &client.client_id)
            .audience(vec![self.codec.audience().to_string()])
            .scope(scope)
            .expires_in_seconds(lifetime.whole_seconds())
            .build();

        self.codec.sign(&claims)
    }

    fn sign_id_token(&self, client: &Client, code: &AuthorizationCode) -> AuthResult<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let lifetime = Duration::try_from(self.config.oauth.id_token_lifetime)
            .unwrap_or(Duration::hours(1));

        let claims = IdTokenClaims {
            iss: self.codec.issuer().to_string(),
            sub: code.subject.clone(),
            aud: client.client_id.clone(),
            exp: now + lifetime.whole_seconds(),
            iat: now,
            nonce: code.nonce.clone(),
        };

        self.codec.sign(&claims)
    }
}

/// Computes the scopes for a refreshed access token.
///
/// The new grant preserves the original scopes unless the request narrows
/// them; any requested scope outside the original set is an error.
fn narrow_scope(requested: Option<&str>, original: &str) -> AuthResult<String> {
    let Some(requested) = requested else {
        return Ok(original.to_string());
    };

    let original_scopes: Vec<&str> = original.split_whitespace().collect();
    let requested_scopes: Vec<&str> = requested.split_whitespace().collect();

    if requested_scopes.is_empty() {
        return Ok(original.to_string());
    }

    for scope in &requested_scopes {
        if !original_scopes.contains(scope) {
            return Err(AuthError::invalid_scope(format!(
                "Scope {scope} exceeds the original grant"
            )));
        }
    }

    Ok(requested_scopes.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full grant-flow coverage (consume races, rotation chains, replay
    // escalation) lives in the gatehouse-storage-memory integration tests,
    // which exercise this service against the real backend.

    #[test]
    fn test_narrow_scope_defaults_to_original() {
        assert_eq!(narrow_scope(None, "read write").unwrap(), "read write");
        assert_eq!(narrow_scope(Some(""), "read write").unwrap(), "read write");
    }

    #[test]
    fn test_narrow_scope_subset_allowed() {
        assert_eq!(narrow_scope(Some("read"), "read write").unwrap(), "read");
    }

    #[test]
    fn test_narrow_scope_never_widens() {
        let err = narrow_scope(Some("read admin"), "read write").unwrap_err();
        assert!(matches!(err, AuthError::InvalidScope { .. }));

        let err = narrow_scope(Some("write"), "read").unwrap_err();
        assert!(matches!(err, AuthError::InvalidScope { .. }));
    }
}
