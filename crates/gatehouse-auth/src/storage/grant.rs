//! Grant state storage trait.
//!
//! This trait owns the in-flight authorization codes and issued refresh
//! tokens, including their consumption and revocation state. Code
//! consumption and refresh token rotation are the two places true races
//! occur (duplicate client requests racing to redeem the same credential),
//! so both must be atomic compare-and-set operations, never read-then-write.
//!
//! # Security Considerations
//!
//! - Never log code or token values
//! - Refresh tokens are stored as SHA-256 hashes only
//! - Replayed codes revoke every token issued from them

use async_trait::async_trait;
use uuid::Uuid;

use crate::AuthResult;
use crate::types::{AuthorizationCode, RefreshToken};

/// Storage for in-flight authorization codes and refresh token chains.
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Stores a newly issued authorization code.
    ///
    /// # Errors
    ///
    /// Returns an error if the code cannot be stored (e.g., duplicate code
    /// value, storage unavailable).
    async fn put_code(&self, code: &AuthorizationCode) -> AuthResult<()>;

    /// Finds an authorization code record by its code value.
    ///
    /// Returns records regardless of consumed/expired status; callers check
    /// `is_valid()` before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>>;

    /// Consumes an authorization code (marks it used).
    ///
    /// Must be an atomic compare-and-set on the consumed state: under
    /// concurrent duplicate submissions exactly one caller wins and receives
    /// the record; every other caller fails.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the code is unknown or expired
    /// - `ReplayDetected` if the code was already consumed; the caller must
    ///   revoke the chain issued from this code
    /// - `Transient` if the storage operation fails
    async fn consume_code(&self, code: &str) -> AuthResult<AuthorizationCode>;

    /// Deletes pending codes for a client. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn purge_codes_by_client(&self, client_id: &str) -> AuthResult<u64>;

    /// Stores a new refresh token record (hashed value only).
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be stored.
    async fn put_refresh_token(&self, token: &RefreshToken) -> AuthResult<()>;

    /// Finds a refresh token by its SHA-256 hash.
    ///
    /// Returns tokens regardless of expiration/revocation status; callers
    /// check `is_valid()` before use.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_refresh_token_by_hash(&self, token_hash: &str) -> AuthResult<Option<RefreshToken>>;

    /// Atomically revokes a refresh token by hash.
    ///
    /// Compare-and-set on the revoked state: returns the record only to the
    /// caller that performed the revocation, so concurrent rotation attempts
    /// on the same token have exactly one winner.
    ///
    /// # Errors
    ///
    /// - `InvalidGrant` if the token is unknown
    /// - `ReplayDetected` if it was already revoked
    /// - `Transient` if the storage operation fails
    async fn revoke_refresh_token(&self, token_hash: &str) -> AuthResult<RefreshToken>;

    /// Revokes a token and every descendant in its rotation chain.
    ///
    /// Returns the number of tokens revoked. Used on detected replay and on
    /// explicit revocation requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_chain(&self, token_id: Uuid) -> AuthResult<u64>;

    /// Revokes every refresh token issued from the given authorization code.
    ///
    /// Returns the number of tokens revoked. Used when a code replay is
    /// detected.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_by_code(&self, code_id: Uuid) -> AuthResult<u64>;

    /// Revokes all refresh tokens for a client.
    ///
    /// Used when a client is compromised or deregistered. Returns the number
    /// of tokens revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails.
    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64>;

    /// Garbage-collects expired codes and expired/revoked tokens.
    ///
    /// Should be called periodically to bound storage growth. Returns the
    /// number of records removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> AuthResult<u64>;
}
