//! Token endpoint request and response types.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code for tokens
//! - `refresh_token` - Refresh an access token

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token request parameters.
///
/// Received as a form-encoded body. Different fields are required depending
/// on the `grant_type`:
///
/// - `authorization_code`: code, redirect_uri, code_verifier (PKCE clients)
/// - `refresh_token`: refresh_token, (optional) scope
///
/// # Client Authentication
///
/// Clients authenticate using one of:
/// - HTTP Basic Auth header (not in this struct)
/// - `client_id` + `client_secret` in the body
/// - `client_id` only (public clients)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRequest {
    /// OAuth 2.0 grant type.
    /// One of: "authorization_code", "refresh_token".
    pub grant_type: String,

    /// Authorization code (for the authorization_code grant).
    #[serde(default)]
    pub code: Option<String>,

    /// Redirect URI (must match the authorization request).
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// PKCE code verifier (for the authorization_code grant).
    #[serde(default)]
    pub code_verifier: Option<String>,

    /// Client id (for public clients or client_secret_post).
    #[serde(default)]
    pub client_id: Option<String>,

    /// Client secret (for client_secret_post authentication).
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Refresh token (for the refresh_token grant).
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Requested scope (for the refresh_token grant; must be a subset of
    /// the original grant).
    #[serde(default)]
    pub scope: Option<String>,
}

/// Successful token response.
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "Bearer",
///   "expires_in": 3600,
///   "scope": "read",
///   "refresh_token": "q1w2e3..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token (JWT).
    pub access_token: String,

    /// Token type, always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    /// Granted scopes (space-separated).
    pub scope: String,

    /// Refresh token (when the client may use the refresh grant).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// ID token (when the `openid` scope was granted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl TokenResponse {
    /// Creates a new token response with required fields.
    #[must_use]
    pub fn new(access_token: String, expires_in: u64, scope: String) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            scope,
            refresh_token: None,
            id_token: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, token: String) -> Self {
        self.refresh_token = Some(token);
        self
    }

    /// Sets the ID token.
    #[must_use]
    pub fn with_id_token(mut self, token: String) -> Self {
        self.id_token = Some(token);
        self
    }
}

/// Token error response.
///
/// # Example Response
///
/// ```json
/// {
///   "error": "invalid_grant",
///   "error_description": "Authorization code expired"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TokenError {
    /// OAuth 2.0 error code.
    pub error: TokenErrorCode,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Creates a new token error.
    #[must_use]
    pub fn new(error: TokenErrorCode) -> Self {
        Self {
            error,
            error_description: None,
        }
    }

    /// Creates a new token error with description.
    #[must_use]
    pub fn with_description(error: TokenErrorCode, description: impl Into<String>) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
        }
    }
}

/// OAuth 2.0 token error codes (RFC 6749 Section 5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenErrorCode {
    /// Missing or malformed request parameter.
    InvalidRequest,

    /// Client authentication failed.
    InvalidClient,

    /// The grant or refresh token is invalid, expired, revoked, or was
    /// issued to another client.
    InvalidGrant,

    /// The client is not authorized to use this grant type.
    UnauthorizedClient,

    /// The grant type is not supported by this server.
    UnsupportedGrantType,

    /// The requested scope exceeds what the resource owner granted.
    InvalidScope,

    /// A temporary server-side failure; the caller may retry with backoff.
    ServerError,
}

impl TokenErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidClient => 401,
            Self::ServerError => 503,
            Self::InvalidRequest
            | Self::InvalidGrant
            | Self::UnauthorizedClient
            | Self::UnsupportedGrantType
            | Self::InvalidScope => 400,
        }
    }
}

impl fmt::Display for TokenErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_request_authorization_code() {
        let json = r#"{
            "grant_type": "authorization_code",
            "code": "SplxlOBeZQQYbYS6WxSbIA",
            "redirect_uri": "https://app/cb",
            "code_verifier": "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            "client_id": "web-app"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "authorization_code");
        assert_eq!(request.code, Some("SplxlOBeZQQYbYS6WxSbIA".to_string()));
        assert_eq!(request.redirect_uri, Some("https://app/cb".to_string()));
        assert!(request.client_secret.is_none());
        assert!(request.refresh_token.is_none());
    }

    #[test]
    fn test_token_request_refresh_grant() {
        let json = r#"{
            "grant_type": "refresh_token",
            "refresh_token": "tGzv3JOkF0XG5Qx2TlKWIA",
            "client_id": "web-app",
            "scope": "read"
        }"#;

        let request: TokenRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.grant_type, "refresh_token");
        assert_eq!(request.refresh_token, Some("tGzv3JOkF0XG5Qx2TlKWIA".to_string()));
        assert_eq!(request.scope, Some("read".to_string()));
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse::new("eyJhbGciOi...".to_string(), 3600, "read".to_string());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains(r#""token_type":"Bearer""#));
        assert!(json.contains(r#""expires_in":3600"#));
        assert!(!json.contains(r#""refresh_token":"#));
        assert!(!json.contains(r#""id_token":"#));

        let full = TokenResponse::new("a".to_string(), 60, "read".to_string())
            .with_refresh_token("rt".to_string())
            .with_id_token("idt".to_string());
        let json = serde_json::to_string(&full).unwrap();
        assert!(json.contains(r#""refresh_token":"rt""#));
        assert!(json.contains(r#""id_token":"idt""#));
    }

    #[test]
    fn test_token_error_serialization() {
        let error = TokenError::with_description(TokenErrorCode::InvalidGrant, "code expired");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains(r#""error":"invalid_grant""#));
        assert!(json.contains(r#""error_description":"code expired""#));

        let bare = TokenError::new(TokenErrorCode::InvalidClient);
        let json = serde_json::to_string(&bare).unwrap();
        assert!(!json.contains("error_description"));
    }

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(TokenErrorCode::InvalidClient.http_status(), 401);
        assert_eq!(TokenErrorCode::InvalidGrant.http_status(), 400);
        assert_eq!(TokenErrorCode::ServerError.http_status(), 503);
    }
}
