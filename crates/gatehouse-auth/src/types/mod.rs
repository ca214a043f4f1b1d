//! Domain types for the authorization server.

pub mod client;
pub mod code;
pub mod refresh_token;

pub use client::{Client, ClientValidationError, GrantType};
pub use code::AuthorizationCode;
pub use refresh_token::RefreshToken;
