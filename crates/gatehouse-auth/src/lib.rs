//! # gatehouse-auth
//!
//! OAuth 2.0 / OpenID Connect authorization server core for Gatehouse.
//!
//! This crate provides:
//! - Client registry types and storage traits
//! - Authorization code and refresh token grant handling
//! - Signing key ring with rotation and retirement
//! - JWT access/ID token encoding and validation
//! - Bearer token guard for protected resources
//! - Axum HTTP handlers for the OAuth endpoints
//!
//! ## Overview
//!
//! The core is organized around a small set of components with explicit
//! dependency order: the [`keys`] ring is a leaf, the [`token`] codec signs
//! and verifies against it, the [`storage`] traits own grant state, and the
//! [`oauth`] services orchestrate the authorization-code and refresh-token
//! flows on top. The [`guard`] module validates bearer tokens on the
//! resource-server side and has no store dependency.
//!
//! ## Modules
//!
//! - [`config`] - Authorization server configuration
//! - [`error`] - Error taxonomy shared across the crate
//! - [`types`] - Client, authorization code, and refresh token domain types
//! - [`keys`] - Signing key pairs, JWKS export, and the rotating key ring
//! - [`token`] - Token claims and the signing/verification codec
//! - [`storage`] - Storage traits for clients and grant state
//! - [`oauth`] - Authorization and token endpoint services, PKCE, client auth
//! - [`guard`] - Bearer token extractor for protected resources
//! - [`http`] - Axum HTTP handlers for the OAuth endpoints

pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod keys;
pub mod oauth;
pub mod storage;
pub mod token;
pub mod types;

pub use config::AuthConfig;
pub use error::{AuthError, ErrorCategory};
pub use guard::{BearerAuth, GuardState, TokenContext};
pub use keys::{Jwk, Jwks, KeyError, KeyRing, SigningAlgorithm, SigningKeyPair};
pub use oauth::{
    AuthorizationRequest, AuthorizationResponse, AuthorizationService, ClientCredentials,
    TokenRequest, TokenResponse, TokenService,
};
pub use storage::{ClientStore, GrantStore};
pub use token::{AccessTokenClaims, IdTokenClaims, TokenCodec};
pub use types::{AuthorizationCode, Client, ClientValidationError, GrantType, RefreshToken};

/// Type alias for authorization results.
pub type AuthResult<T> = Result<T, AuthError>;
