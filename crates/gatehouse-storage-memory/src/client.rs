//! In-memory client registry.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;

use gatehouse_auth::error::AuthError;
use gatehouse_auth::storage::ClientStore;
use gatehouse_auth::types::Client;
use gatehouse_auth::AuthResult;

/// In-memory [`ClientStore`] implementation.
#[derive(Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<String, Client>>,
}

impl MemoryClientStore {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes a plaintext client secret for storage.
    ///
    /// # Errors
    /// Returns an error if hashing fails.
    pub fn hash_secret(secret: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        Argon2::default()
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::internal(format!("Failed to hash client secret: {e}")))
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<Client>> {
        let clients = self.clients.read().expect("client store lock poisoned");
        Ok(clients.get(client_id).filter(|c| c.active).cloned())
    }

    async fn create(&self, client: &Client) -> AuthResult<Client> {
        client
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        let mut clients = self.clients.write().expect("client store lock poisoned");
        if clients.contains_key(&client.client_id) {
            return Err(AuthError::invalid_request(format!(
                "Client {} already exists",
                client.client_id
            )));
        }

        clients.insert(client.client_id.clone(), client.clone());
        Ok(client.clone())
    }

    async fn update(&self, client_id: &str, client: &Client) -> AuthResult<Client> {
        client
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        let mut clients = self.clients.write().expect("client store lock poisoned");
        if !clients.contains_key(client_id) {
            return Err(AuthError::invalid_client(format!("Unknown client {client_id}")));
        }

        clients.insert(client_id.to_string(), client.clone());
        Ok(client.clone())
    }

    async fn delete(&self, client_id: &str) -> AuthResult<()> {
        let mut clients = self.clients.write().expect("client store lock poisoned");
        clients
            .remove(client_id)
            .map(|_| ())
            .ok_or_else(|| AuthError::invalid_client(format!("Unknown client {client_id}")))
    }

    async fn list(&self, limit: i64, offset: i64) -> AuthResult<Vec<Client>> {
        let clients = self.clients.read().expect("client store lock poisoned");
        let mut all: Vec<Client> = clients.values().filter(|c| c.active).cloned().collect();
        all.sort_by(|a, b| a.client_id.cmp(&b.client_id));

        Ok(all
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn verify_secret(&self, client_id: &str, secret: &str) -> AuthResult<bool> {
        let stored = {
            let clients = self.clients.read().expect("client store lock poisoned");
            let client = clients
                .get(client_id)
                .ok_or_else(|| AuthError::invalid_client(format!("Unknown client {client_id}")))?;
            client.client_secret.clone()
        };

        let Some(stored) = stored else {
            return Ok(false);
        };

        let parsed = PasswordHash::new(&stored)
            .map_err(|e| AuthError::internal(format!("Stored secret hash is invalid: {e}")))?;

        Ok(Argon2::default()
            .verify_password(secret.as_bytes(), &parsed)
            .is_ok())
    }
}
