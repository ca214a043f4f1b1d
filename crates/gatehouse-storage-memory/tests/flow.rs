//! End-to-end grant flow tests against the in-memory backend.
//!
//! These exercise the authorization and token services through the real
//! store implementations: code issuance and exchange, PKCE, scope
//! narrowing, replay escalation, rotation chains, and the concurrent
//! consumption race.

use std::sync::Arc;

use gatehouse_auth::config::AuthConfig;
use gatehouse_auth::error::AuthError;
use gatehouse_auth::keys::{KeyRing, SigningAlgorithm};
use gatehouse_auth::oauth::authorize::AuthorizationRequest;
use gatehouse_auth::oauth::pkce::{PkceChallenge, PkceVerifier};
use gatehouse_auth::oauth::service::AuthorizationService;
use gatehouse_auth::oauth::token::TokenRequest;
use gatehouse_auth::oauth::token_service::TokenService;
use gatehouse_auth::storage::{ClientStore, GrantStore};
use gatehouse_auth::token::codec::TokenCodec;
use gatehouse_auth::types::{Client, GrantType};
use gatehouse_storage_memory::{MemoryClientStore, MemoryGrantStore};

struct Harness {
    authorize: AuthorizationService,
    tokens: TokenService,
    codec: Arc<TokenCodec>,
    grants: Arc<MemoryGrantStore>,
    verifier: PkceVerifier,
}

impl Harness {
    async fn new() -> Self {
        let clients: Arc<MemoryClientStore> = Arc::new(MemoryClientStore::new());
        let grants = Arc::new(MemoryGrantStore::new());
        let config = AuthConfig::default();

        clients
            .create(&Client {
                client_id: "c1".to_string(),
                client_secret: None,
                name: "Client One".to_string(),
                grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
                redirect_uris: vec!["https://app/cb".to_string()],
                scopes: vec!["read".to_string(), "openid".to_string()],
                confidential: false,
                active: true,
                access_token_lifetime: None,
                refresh_token_lifetime: None,
                pkce_required: None,
                allowed_origins: vec![],
            })
            .await
            .unwrap();

        let ring = Arc::new(KeyRing::generate(SigningAlgorithm::RS256).unwrap());
        let codec = Arc::new(TokenCodec::new(
            ring,
            config.issuer.clone(),
            config.audience.clone(),
        ));

        let clients_dyn: Arc<dyn ClientStore> = clients;
        let grants_dyn: Arc<dyn GrantStore> = grants.clone();

        Self {
            authorize: AuthorizationService::new(
                clients_dyn.clone(),
                grants_dyn.clone(),
                config.clone(),
            ),
            tokens: TokenService::new(codec.clone(), clients_dyn, grants_dyn, config),
            codec,
            grants,
            verifier: PkceVerifier::generate(),
        }
    }

    fn authorize_request(&self, scope: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: "code".to_string(),
            client_id: "c1".to_string(),
            redirect_uri: "https://app/cb".to_string(),
            scope: scope.to_string(),
            state: "af0ifjsldkj".to_string(),
            code_challenge: Some(
                PkceChallenge::from_verifier(&self.verifier)
                    .as_str()
                    .to_string(),
            ),
            code_challenge_method: Some("S256".to_string()),
            nonce: None,
        }
    }

    fn token_request(&self, code: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: Some(code.to_string()),
            redirect_uri: Some("https://app/cb".to_string()),
            code_verifier: Some(self.verifier.as_str().to_string()),
            client_id: Some("c1".to_string()),
            client_secret: None,
            refresh_token: None,
            scope: None,
        }
    }

    fn refresh_request(&self, refresh_token: &str) -> TokenRequest {
        TokenRequest {
            grant_type: "refresh_token".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id: Some("c1".to_string()),
            client_secret: None,
            refresh_token: Some(refresh_token.to_string()),
            scope: None,
        }
    }
}

#[tokio::test]
async fn full_flow_narrows_scope_to_client_allowance() {
    let h = Harness::new().await;

    // "write" is known to the server but not allowed for c1.
    let code = h
        .authorize
        .authorize(&h.authorize_request("read write"), "user-1")
        .await
        .unwrap();
    assert_eq!(code.scope, "read");

    let response = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    assert_eq!(response.scope, "read");

    // The access token's scope claim is exactly "read".
    let claims = h.codec.verify(&response.access_token).unwrap();
    assert_eq!(claims.scope, "read");
    assert_eq!(claims.sub, "user-1");
}

#[tokio::test]
async fn openid_scope_yields_id_token() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("openid read"), "user-1")
        .await
        .unwrap();

    let response = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    assert!(response.id_token.is_some());
    assert!(response.refresh_token.is_some());
}

#[tokio::test]
async fn consumed_code_cannot_be_exchanged_again() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();

    let first = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    let refresh_token = first.refresh_token.clone().unwrap();

    // Second exchange of the same code: replay.
    let err = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReplayDetected { .. }));
    assert_eq!(err.oauth_error_code(), "invalid_grant");

    // The replay revoked the refresh token issued from the first exchange.
    let err = h
        .tokens
        .exchange(&h.refresh_request(&refresh_token), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReplayDetected { .. }));
}

#[tokio::test]
async fn wrong_pkce_verifier_is_rejected() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();

    let mut request = h.token_request(&code.code);
    request.code_verifier = Some(PkceVerifier::generate().as_str().to_string());

    let err = h.tokens.exchange(&request, None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn wrong_redirect_uri_is_rejected() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();

    let mut request = h.token_request(&code.code);
    request.redirect_uri = Some("https://app/cb/other".to_string());

    let err = h.tokens.exchange(&request, None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidGrant { .. }));
}

#[tokio::test]
async fn refresh_rotation_revokes_prior_token() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();
    let first = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    let rt1 = first.refresh_token.unwrap();

    // Rotate twice: rt1 -> rt2 -> rt3.
    let second = h
        .tokens
        .exchange(&h.refresh_request(&rt1), None)
        .await
        .unwrap();
    let rt2 = second.refresh_token.unwrap();

    let third = h
        .tokens
        .exchange(&h.refresh_request(&rt2), None)
        .await
        .unwrap();
    let rt3 = third.refresh_token.unwrap();

    // Presenting the already-rotated rt1 is replay; it kills the whole
    // chain, so rt3 dies with it.
    let err = h
        .tokens
        .exchange(&h.refresh_request(&rt1), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReplayDetected { .. }));

    let err = h
        .tokens
        .exchange(&h.refresh_request(&rt3), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReplayDetected { .. }));
}

#[tokio::test]
async fn refresh_narrows_but_never_widens_scope() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read openid"), "user-1")
        .await
        .unwrap();
    let first = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    let rt = first.refresh_token.unwrap();

    let mut narrow = h.refresh_request(&rt);
    narrow.scope = Some("read".to_string());
    let response = h.tokens.exchange(&narrow, None).await.unwrap();
    assert_eq!(response.scope, "read");

    // The rotated token carries the narrowed scope; widening back fails.
    let rt2 = response.refresh_token.unwrap();
    let mut widen = h.refresh_request(&rt2);
    widen.scope = Some("read openid".to_string());
    let err = h.tokens.exchange(&widen, None).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidScope { .. }));
}

#[tokio::test]
async fn concurrent_exchange_issues_exactly_one_token_set() {
    let h = Arc::new(Harness::new().await);
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let h = h.clone();
            let request = h.token_request(&code.code);
            tokio::spawn(async move { h.tokens.exchange(&request, None).await })
        })
        .collect();

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap().is_ok() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}

#[tokio::test]
async fn deregistration_cascades_to_grants() {
    let h = Harness::new().await;
    let code = h
        .authorize
        .authorize(&h.authorize_request("read"), "user-1")
        .await
        .unwrap();
    let response = h
        .tokens
        .exchange(&h.token_request(&code.code), None)
        .await
        .unwrap();
    let rt = response.refresh_token.unwrap();

    assert_eq!(h.grants.revoke_by_client("c1").await.unwrap(), 1);

    let err = h
        .tokens
        .exchange(&h.refresh_request(&rt), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::ReplayDetected { .. }));
}
