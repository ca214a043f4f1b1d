//! OAuth 2.0 endpoint services.
//!
//! - [`authorize`] - Authorization endpoint request/response types
//! - [`token`] - Token endpoint request/response types
//! - [`pkce`] - Proof Key for Code Exchange (RFC 7636, S256 only)
//! - [`client_auth`] - Client authentication (basic auth / body parameters)
//! - [`service`] - The authorization endpoint state machine
//! - [`token_service`] - Grant exchange at the token endpoint

pub mod authorize;
pub mod client_auth;
pub mod pkce;
pub mod service;
pub mod token;
pub mod token_service;

pub use authorize::{AuthorizationRequest, AuthorizationResponse, AuthorizeError};
pub use client_auth::ClientCredentials;
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};
pub use service::AuthorizationService;
pub use token::{TokenRequest, TokenResponse};
pub use token_service::TokenService;
