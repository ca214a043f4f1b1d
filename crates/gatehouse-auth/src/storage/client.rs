//! Client registry storage trait.
//!
//! Defines the interface for OAuth client persistence. Clients are created
//! by administrative registration and destroyed by explicit deregistration;
//! between those points they change only through explicit update.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::Client;

/// Storage operations for registered OAuth 2.0 clients.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Finds a client by its OAuth client id.
    ///
    /// Returns `None` if the client doesn't exist or is not active.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>>;

    /// Creates a new client.
    ///
    /// The client is validated before creation.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client validation fails
    /// - A client with the same client id already exists
    /// - The storage operation fails
    async fn create(&self, client: &Client) -> AuthResult<Client>;

    /// Updates an existing client.
    ///
    /// The client is validated before update.
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist, validation fails, or
    /// the storage operation fails.
    async fn update(&self, client_id: &str, client: &Client) -> AuthResult<Client>;

    /// Deletes a client registration.
    ///
    /// Deregistration cascades: callers must also revoke the client's
    /// outstanding grants (see [`deregister_client`](crate::storage::deregister_client)).
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist or the operation fails.
    async fn delete(&self, client_id: &str) -> AuthResult<()>;

    /// Lists active clients.
    ///
    /// # Arguments
    ///
    /// * `limit` - Maximum number of clients to return
    /// * `offset` - Number of clients to skip for pagination
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn list(&self, limit: i64, offset: i64) -> AuthResult<Vec<Client>>;

    /// Verifies a client secret against the stored argon2 hash.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the secret matches
    /// - `Ok(false)` if the secret doesn't match or the client has no secret
    ///
    /// # Errors
    ///
    /// Returns an error if the client doesn't exist or the operation fails.
    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool>;
}
