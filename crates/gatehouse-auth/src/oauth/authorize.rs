//! Authorization endpoint request and response types.
//!
//! The authorization endpoint is the first step in the authorization code
//! flow:
//!
//! 1. Client redirects the user here with request parameters
//! 2. The request is validated against the client registration
//! 3. Server redirects back to the client with an authorization code
//! 4. Client exchanges the code for tokens at the token endpoint
//!
//! # Security Requirements
//!
//! - `state` is required on every request; cookie SameSite policies alone do
//!   not protect a cross-site-embeddable endpoint against CSRF
//! - PKCE uses the S256 method only
//! - Validation failures on the redirect URI itself are rendered to the
//!   user, never redirected; redirecting would hand the error (and the
//!   user) to an unvetted location

use serde::{Deserialize, Serialize};
use std::fmt;

/// Authorization request parameters.
///
/// Received as query string parameters on the authorization endpoint.
///
/// # Example
///
/// ```ignore
/// GET /authorize?
///   response_type=code
///   &client_id=web-app
///   &redirect_uri=https://app/cb
///   &scope=read
///   &state=af0ifjsldkj
///   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
///   &code_challenge_method=S256
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationRequest {
    /// Must be "code" for the authorization code flow.
    pub response_type: String,

    /// Client identifier issued during registration.
    pub client_id: String,

    /// Redirect URI where the response will be sent.
    /// Must exactly match one of the registered redirect URIs.
    pub redirect_uri: String,

    /// Requested scopes (space-separated).
    pub scope: String,

    /// CSRF protection state parameter. Required.
    pub state: String,

    /// PKCE code challenge (base64url-encoded SHA-256 of the verifier).
    #[serde(default)]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method. Must be "S256" when present.
    #[serde(default)]
    pub code_challenge_method: Option<String>,

    /// OpenID Connect nonce (optional).
    /// Bound into the ID token for replay protection.
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Successful authorization response.
///
/// Returned as query parameters on the redirect back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationResponse {
    /// Authorization code to be exchanged for tokens.
    /// Single-use and short-lived.
    pub code: String,

    /// Echoed state parameter for CSRF validation.
    pub state: String,
}

impl AuthorizationResponse {
    /// Creates a new authorization response.
    #[must_use]
    pub fn new(code: String, state: String) -> Self {
        Self { code, state }
    }

    /// Builds the redirect URL with response parameters.
    ///
    /// # Errors
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        url.query_pairs_mut()
            .append_pair("code", &self.code)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }
}

/// Authorization error response.
///
/// Communicated via redirect to the client's redirect URI when that URI is
/// itself valid; otherwise rendered directly to the user.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizeError {
    /// OAuth 2.0 error code.
    pub error: AuthorizeErrorCode,

    /// Human-readable error description (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// Echoed state parameter.
    pub state: String,
}

impl AuthorizeError {
    /// Creates a new authorization error.
    #[must_use]
    pub fn new(error: AuthorizeErrorCode, state: String) -> Self {
        Self {
            error,
            error_description: None,
            state,
        }
    }

    /// Creates a new authorization error with description.
    #[must_use]
    pub fn with_description(
        error: AuthorizeErrorCode,
        description: impl Into<String>,
        state: String,
    ) -> Self {
        Self {
            error,
            error_description: Some(description.into()),
            state,
        }
    }

    /// Builds the redirect URL with error parameters.
    ///
    /// # Errors
    /// Returns an error if the redirect URI cannot be parsed.
    pub fn to_redirect_url(&self, redirect_uri: &str) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(redirect_uri)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("error", self.error.as_str());
            if let Some(ref desc) = self.error_description {
                pairs.append_pair("error_description", desc);
            }
            pairs.append_pair("state", &self.state);
        }
        Ok(url.to_string())
    }
}

/// OAuth 2.0 authorization error codes (RFC 6749 Section 4.1.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeErrorCode {
    /// The request is missing a required parameter or is malformed.
    InvalidRequest,

    /// The client is not authorized to request a code this way.
    UnauthorizedClient,

    /// The resource owner or authorization server denied the request.
    AccessDenied,

    /// The server does not support this response type.
    UnsupportedResponseType,

    /// The requested scope is invalid, unknown, or malformed.
    InvalidScope,

    /// The server encountered an unexpected condition.
    ServerError,

    /// The server is temporarily unable to handle the request.
    TemporarilyUnavailable,
}

impl AuthorizeErrorCode {
    /// Returns the string representation of the error code.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
        }
    }
}

impl fmt::Display for AuthorizeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
