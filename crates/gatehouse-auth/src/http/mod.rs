//! Axum HTTP handlers for the OAuth endpoints.
//!
//! - [`authorize`] - `GET /authorize`
//! - [`token`] - `POST /token`
//! - [`jwks`] - `GET /.well-known/jwks.json`

pub mod authorize;
pub mod jwks;
pub mod token;

pub use authorize::{AuthenticatedSubject, AuthorizeState, authorize_handler};
pub use jwks::{JwksState, jwks_handler};
pub use token::{TokenState, token_handler};
