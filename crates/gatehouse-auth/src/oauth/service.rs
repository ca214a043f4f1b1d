//! The authorization endpoint state machine.
//!
//! Each request walks a fixed validation pipeline: client, then redirect
//! URI, then response type, then PKCE, then scopes. Any failure
//! short-circuits with a machine-readable error and no side effect; the
//! authorization code is only issued after every validation has passed.
//!
//! Failures before the redirect URI is validated must be rendered to the
//! user rather than redirected; redirecting to an unvalidated URI is an
//! open redirect.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::authorize::AuthorizationRequest;
use crate::oauth::pkce::{PkceChallenge, PkceChallengeMethod};
use crate::storage::{ClientStore, GrantStore, with_timeout};
use crate::types::{AuthorizationCode, Client, GrantType};

/// Orchestrates the authorization-code grant.
///
/// The service validates authorization requests against the client registry
/// and issues single-use authorization codes into the grant store. The
/// resource owner is authenticated upstream (login and consent are outside
/// this crate); their subject identifier is passed in.
pub struct AuthorizationService {
    clients: Arc<dyn ClientStore>,
    grants: Arc<dyn GrantStore>,
    config: AuthConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service.
    #[must_use]
    pub fn new(clients: Arc<dyn ClientStore>, grants: Arc<dyn GrantStore>, config: AuthConfig) -> Self {
        Self {
            clients,
            grants,
            config,
        }
    }

    /// Handles an authorization request for an authenticated subject.
    ///
    /// Walks the validation pipeline and, only once every check has passed,
    /// issues and stores an authorization code. Abandoning the request at
    /// any validation step leaves no state behind.
    ///
    /// # Errors
    ///
    /// - `InvalidClient` - unknown or inactive client, or the client may not
    ///   use the authorization code grant
    /// - `InvalidRedirectUri` - the redirect URI is not registered (the
    ///   caller must render this, never redirect)
    /// - `UnsupportedResponseType` - `response_type` is not `code`
    /// - `InvalidRequest` - missing state or a malformed/missing PKCE
    ///   challenge
    /// - `InvalidScope` - a requested scope is unknown to this server, or
    ///   nothing requested is allowed for the client
    /// - `Transient` - the store timed out or failed
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        subject: &str,
    ) -> AuthResult<AuthorizationCode> {
        let client = self.validate_client(&request.client_id).await?;

        // Redirect URI comes right after the client: everything later may be
        // reported via redirect, this failure may not.
        if !client.is_redirect_uri_allowed(&request.redirect_uri) {
            return Err(AuthError::invalid_redirect_uri(format!(
                "Redirect URI not registered for client {}",
                client.client_id
            )));
        }

        if request.response_type != "code" {
            return Err(AuthError::unsupported_response_type(&request.response_type));
        }

        if request.state.is_empty() {
            return Err(AuthError::invalid_request("Missing required parameter: state"));
        }

        let code_challenge = self.validate_pkce(&client, request)?;
        let scope = self.grant_scopes(&client, &request.scope)?;

        // All validations passed; issuing the code is the first side effect.
        let now = OffsetDateTime::now_utc();
        let lifetime = Duration::try_from(self.config.oauth.authorization_code_lifetime)
            .map_err(|e| AuthError::internal(format!("Invalid code lifetime: {e}")))?;

        let code = AuthorizationCode {
            id: Uuid::new_v4(),
            code: AuthorizationCode::generate_code(),
            client_id: client.client_id.clone(),
            subject: subject.to_string(),
            scope,
            redirect_uri: request.redirect_uri.clone(),
            code_challenge,
            nonce: request.nonce.clone(),
            created_at: now,
            expires_at: now + lifetime,
            consumed_at: None,
        };

        with_timeout(
            self.config.store_timeout,
            "put_code",
            self.grants.put_code(&code),
        )
        .await?;

        tracing::debug!(
            client_id = %client.client_id,
            scope = %code.scope,
            "authorization code issued"
        );

        Ok(code)
    }

    async fn validate_client(&self, client_id: &str) -> AuthResult<Client> {
        let client = with_timeout(
            self.config.store_timeout,
            "find_by_client_id",
            self.clients.find_by_client_id(client_id),
        )
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

        if !client.active {
            return Err(AuthError::invalid_client("Client is not active"));
        }

        if !client.is_grant_type_allowed(GrantType::AuthorizationCode) {
            return Err(AuthError::invalid_client(
                "Client may not use the authorization code grant",
            ));
        }

        Ok(client)
    }

    fn validate_pkce(
        &self,
        client: &Client,
        request: &AuthorizationRequest,
    ) -> AuthResult<Option<String>> {
        match (&request.code_challenge, &request.code_challenge_method) {
            (Some(challenge), method) => {
                let method = method.as_deref().unwrap_or("S256");
                PkceChallengeMethod::parse(method)
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;

                let challenge = PkceChallenge::new(challenge.clone())
                    .map_err(|e| AuthError::invalid_request(e.to_string()))?;
                Ok(Some(challenge.as_str().to_string()))
            }
            (None, _) if client.requires_pkce() => Err(AuthError::invalid_request(
                "Missing required parameter: code_challenge",
            )),
            (None, _) => Ok(None),
        }
    }

    /// Computes the granted scopes for a request.
    ///
    /// Scopes unknown to the server are an error; scopes known to the server
    /// but outside the client's allowed set are dropped, so the grant is the
    /// intersection of requested and allowed.
    fn grant_scopes(&self, client: &Client, requested: &str) -> AuthResult<String> {
        let requested: Vec<&str> = requested.split_whitespace().collect();
        if requested.is_empty() {
            return Err(AuthError::invalid_scope("No scope requested"));
        }

        for scope in &requested {
            if !self.config.is_known_scope(scope) {
                return Err(AuthError::invalid_scope(format!("Unknown scope: {scope}")));
            }
        }

        let granted: Vec<&str> = requested
            .into_iter()
            .filter(|scope| client.is_scope_allowed(scope))
            .collect();

        if granted.is_empty() {
            return Err(AuthError::invalid_scope(
                "None of the requested scopes are allowed for this client",
            ));
        }

        Ok(granted.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::client::ClientStore;
    use crate::storage::grant::GrantStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use crate::types::RefreshToken;

    // Minimal in-crate fakes; the full backend lives in gatehouse-storage-memory.
    struct FakeClients {
        clients: HashMap<String, Client>,
    }

    #[async_trait]
    impl ClientStore for FakeClients {
        async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
            Ok(self.clients.get(client_id).cloned())
        }
        async fn create(&self, client: &Client) -> AuthResult<Client> {
            Ok(client.clone())
        }
        async fn update(&self, _client_id: &str, client: &Client) -> AuthResult<Client> {
            Ok(client.clone())
        }
        async fn delete(&self, _client_id: &str) -> AuthResult<()> {
            Ok(())
        }
        async fn list(&self, _limit: i64, _offset: i64) -> AuthResult<Vec<Client>> {
            Ok(self.clients.values().cloned().collect())
        }
        async fn verify_secret(&self, _client_id: &str, _secret: &str) -> AuthResult<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct FakeGrants {
        codes: Mutex<Vec<AuthorizationCode>>,
    }

    #[async_trait]
    impl GrantStore for FakeGrants {
        async fn put_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
            self.codes.lock().unwrap().push(code.clone());
            Ok(())
        }
        async fn find_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
            Ok(self
                .codes
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.code == code)
                .cloned())
        }
        async fn consume_code(&self, _code: &str) -> AuthResult<AuthorizationCode> {
            Err(AuthError::invalid_grant("not implemented"))
        }
        async fn purge_codes_by_client(&self, _client_id: &str) -> AuthResult<u64> {
            Ok(0)
        }
        async fn put_refresh_token(&self, _token: &RefreshToken) -> AuthResult<()> {
            Ok(())
        }
        async fn find_refresh_token_by_hash(
            &self,
            _token_hash: &str,
        ) -> AuthResult<Option<RefreshToken>> {
            Ok(None)
        }
        async fn revoke_refresh_token(&self, _token_hash: &str) -> AuthResult<RefreshToken> {
            Err(AuthError::invalid_grant("not implemented"))
        }
        async fn revoke_chain(&self, _token_id: Uuid) -> AuthResult<u64> {
            Ok(0)
        }
        async fn revoke_by_code(&self, _code_id: Uuid) -> AuthResult<u64> {
            Ok(0)
        }
        async fn revoke_by_client(&self, _client_id: &str) -> AuthResult<u64> {
            Ok(0)
        }
        async fn cleanup_expired(&self) -> AuthResult<u64> {
            Ok(0)
        }
    }

    fn make_client() -> Client {
        Client {
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
        }
    }

    fn make_service(client: Client) -> (AuthorizationService, Arc<FakeGrants>) {
        let mut clients = HashMap::new();
        clients.insert(client.client_id.clone(), client);
        let grants = Arc::new(FakeGrants::default());
        let service = AuthorizationService::new(
            Arc::new(FakeClients { clients }),
            grants.clone(),
            AuthConfig::default(),
        );
        (service, grants)
    }

    fn make_request() -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: "code".to_string(),
            client_id: "c1".to_string(),
            redirect_uri: "https://app/cb".to_string(),
            scope: "read".to_string(),
            state: "af0ifjsldkj".to_string(),
            code_challenge: Some("E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM".to_string()),
            code_challenge_method: Some("S256".to_string()),
            nonce: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_issues_code() {
        let (service, grants) = make_service(make_client());
        let code = service.authorize(&make_request(), "user-1").await.unwrap();

        assert_eq!(code.client_id, "c1");
        assert_eq!(code.subject, "user-1");
        assert_eq!(code.scope, "read");
        assert!(code.is_valid());
        assert_eq!(grants.codes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let (service, grants) = make_service(make_client());
        let mut request = make_request();
        request.client_id = "nobody".to_string();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));
        // No side effect on failure.
        assert!(grants.codes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_client() {
        let mut client = make_client();
        client.active = false;
        let (service, _) = make_service(client);

        let err = service.authorize(&make_request(), "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidClient { .. }));
    }

    #[tokio::test]
    async fn test_unregistered_redirect_uri() {
        let (service, grants) = make_service(make_client());
        let mut request = make_request();
        request.redirect_uri = "https://app/cb/extra".to_string();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRedirectUri { .. }));
        assert!(grants.codes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_response_type() {
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.response_type = "token".to_string();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedResponseType { .. }));
    }

    #[tokio::test]
    async fn test_missing_state() {
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.state = String::new();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_public_client_requires_pkce() {
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.code_challenge = None;
        request.code_challenge_method = None;

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_plain_pkce_method_rejected() {
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.code_challenge_method = Some("plain".to_string());

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidRequest { .. }));
    }

    #[tokio::test]
    async fn test_disallowed_scope_dropped_by_intersection() {
        // Client allows "read"; "write" is known to the server but not to
        // the client, so the grant narrows to "read".
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.scope = "read write".to_string();

        let code = service.authorize(&request, "user-1").await.unwrap();
        assert_eq!(code.scope, "read");
    }

    #[tokio::test]
    async fn test_unknown_scope_is_an_error() {
        let (service, _) = make_service(make_client());
        let mut request = make_request();
        request.scope = "read no-such-scope".to_string();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidScope { .. }));
    }

    #[tokio::test]
    async fn test_nothing_allowed_is_an_error() {
        let mut client = make_client();
        client.scopes = vec!["openid".to_string()];
        let (service, _) = make_service(client);
        let mut request = make_request();
        request.scope = "read".to_string();

        let err = service.authorize(&request, "user-1").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidScope { .. }));
    }
}
