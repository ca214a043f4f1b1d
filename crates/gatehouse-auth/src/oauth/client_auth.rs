//! Client authentication at the token endpoint.
//!
//! Multiple authentication methods are supported per RFC 6749:
//!
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in the request body
//! - `none` - Public clients (client_id only)
//!
//! When multiple methods are present they are tried in that order.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::token::TokenRequest;
use crate::storage::ClientStore;
use crate::types::Client;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: Client,

    /// The authentication method used.
    pub auth_method: TokenEndpointAuthMethod,
}

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEndpointAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl TokenEndpointAuthMethod {
    /// Returns the string representation of the auth method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for TokenEndpointAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client credentials extracted from a token request.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    /// The client id presented.
    pub client_id: String,

    /// The client secret, when one was presented.
    pub client_secret: Option<String>,

    /// How the credentials arrived.
    pub method: TokenEndpointAuthMethod,
}

impl ClientCredentials {
    /// Extracts client credentials from the Authorization header and body.
    ///
    /// # Errors
    /// Returns `InvalidClient` if no client identification is present at all.
    pub fn extract(
        basic_auth_header: Option<&str>,
        request: &TokenRequest,
    ) -> AuthResult<Self> {
        // HTTP Basic Auth takes priority for confidential clients.
        if let Some(header) = basic_auth_header {
            if let Some((client_id, client_secret)) = parse_basic_auth(header) {
                return Ok(Self {
                    client_id,
                    client_secret: Some(client_secret),
                    method: TokenEndpointAuthMethod::ClientSecretBasic,
                });
            }
            return Err(AuthError::invalid_client("Malformed Basic Auth header"));
        }

        let client_id = request
            .client_id
            .clone()
            .ok_or_else(|| AuthError::invalid_client("Missing client identification"))?;

        match request.client_secret.clone() {
            Some(secret) => Ok(Self {
                client_id,
                client_secret: Some(secret),
                method: TokenEndpointAuthMethod::ClientSecretPost,
            }),
            None => Ok(Self {
                client_id,
                client_secret: None,
                method: TokenEndpointAuthMethod::None,
            }),
        }
    }
}

/// Authenticates a client against the registry.
///
/// Confidential clients must present their secret (basic or post);
/// public clients authenticate by client id alone and rely on PKCE.
///
/// # Errors
///
/// Returns `InvalidClient` if the client is unknown, inactive, presents a
/// wrong secret, or a confidential client omits its secret.
pub async fn authenticate_client(
    credentials: &ClientCredentials,
    clients: &dyn ClientStore,
) -> AuthResult<AuthenticatedClient> {
    let client = clients
        .find_by_client_id(&credentials.client_id)
        .await?
        .ok_or_else(|| AuthError::invalid_client("Unknown client"))?;

    if !client.active {
        return Err(AuthError::invalid_client("Client is not active"));
    }

    if client.confidential {
        let secret = credentials
            .client_secret
            .as_deref()
            .ok_or_else(|| AuthError::invalid_client("Confidential client must authenticate"))?;

        if !clients.verify_secret(&client.client_id, secret).await? {
            return Err(AuthError::invalid_client("Client authentication failed"));
        }
    } else if credentials.client_secret.is_some() {
        // A secret presented for a public client is a misconfigured caller.
        return Err(AuthError::invalid_client(
            "Public clients do not authenticate with a secret",
        ));
    }

    Ok(AuthenticatedClient {
        client,
        auth_method: credentials.method,
    })
}

/// Parses an HTTP Basic Auth header value into (client_id, client_secret).
///
/// Returns `None` if the header is not valid Basic Auth.
#[must_use]
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let (client_id, client_secret) = decoded.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }
    Some((client_id.to_string(), client_secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(client_id: Option<&str>, client_secret: Option<&str>) -> TokenRequest {
        TokenRequest {
            grant_type: "authorization_code".to_string(),
            code: None,
            redirect_uri: None,
            code_verifier: None,
            client_id: client_id.map(String::from),
            client_secret: client_secret.map(String::from),
            refresh_token: None,
            scope: None,
        }
    }

    #[test]
    fn test_parse_basic_auth() {
        // "web-app:s3cret"
        let header = format!("Basic {}", STANDARD.encode("web-app:s3cret"));
        let (id, secret) = parse_basic_auth(&header).unwrap();
        assert_eq!(id, "web-app");
        assert_eq!(secret, "s3cret");
    }

    #[test]
    fn test_parse_basic_auth_rejects_garbage() {
        assert!(parse_basic_auth("Bearer abc").is_none());
        assert!(parse_basic_auth("Basic !!!not-base64!!!").is_none());

        // No colon separator.
        let header = format!("Basic {}", STANDARD.encode("no-separator"));
        assert!(parse_basic_auth(&header).is_none());

        // Empty client id.
        let header = format!("Basic {}", STANDARD.encode(":secret"));
        assert!(parse_basic_auth(&header).is_none());
    }

    #[test]
    fn test_extract_prefers_basic_auth() {
        let header = format!("Basic {}", STANDARD.encode("basic-client:basic-secret"));
        let request = request_with(Some("body-client"), Some("body-secret"));

        let creds = ClientCredentials::extract(Some(&header), &request).unwrap();
        assert_eq!(creds.client_id, "basic-client");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretBasic);
    }

    #[test]
    fn test_extract_from_body() {
        let request = request_with(Some("web-app"), Some("s3cret"));
        let creds = ClientCredentials::extract(None, &request).unwrap();
        assert_eq!(creds.client_id, "web-app");
        assert_eq!(creds.method, TokenEndpointAuthMethod::ClientSecretPost);
    }

    #[test]
    fn test_extract_public_client() {
        let request = request_with(Some("web-app"), None);
        let creds = ClientCredentials::extract(None, &request).unwrap();
        assert_eq!(creds.method, TokenEndpointAuthMethod::None);
        assert!(creds.client_secret.is_none());
    }

    #[test]
    fn test_extract_requires_identification() {
        let request = request_with(None, None);
        assert!(matches!(
            ClientCredentials::extract(None, &request),
            Err(AuthError::InvalidClient { .. })
        ));
    }

    #[test]
    fn test_malformed_basic_header_is_rejected() {
        let request = request_with(Some("web-app"), None);
        assert!(matches!(
            ClientCredentials::extract(Some("Basic ???"), &request),
            Err(AuthError::InvalidClient { .. })
        ));
    }
}
