//! Client seeding from configuration.
//!
//! Seed clients are declared in the TOML config and created at startup if
//! absent. Secrets arrive in plaintext in the config file and are hashed
//! before they reach the registry; the plaintext is never stored.

use serde::Deserialize;

use gatehouse_auth::AuthResult;
use gatehouse_auth::storage::ClientStore;
use gatehouse_auth::types::{Client, GrantType};
use gatehouse_storage_memory::MemoryClientStore;

/// A client declaration in the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedClient {
    /// OAuth client id.
    pub client_id: String,

    /// Human-readable display name.
    pub name: String,

    /// Plaintext secret; presence makes the client confidential.
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Allowed scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Allowed grant types. Defaults to the code + refresh flows.
    #[serde(default = "default_grant_types")]
    pub grant_types: Vec<GrantType>,

    /// Origins allowed for CORS requests from this client.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_grant_types() -> Vec<GrantType> {
    vec![GrantType::AuthorizationCode, GrantType::RefreshToken]
}

impl SeedClient {
    /// Converts the declaration into a registry record, hashing the secret.
    ///
    /// # Errors
    /// Returns an error if secret hashing fails.
    pub fn into_client(self) -> AuthResult<Client> {
        let confidential = self.client_secret.is_some();
        let client_secret = self
            .client_secret
            .as_deref()
            .map(MemoryClientStore::hash_secret)
            .transpose()?;

        Ok(Client {
            client_id: self.client_id,
            client_secret,
            name: self.name,
            grant_types: self.grant_types,
            redirect_uris: self.redirect_uris,
            scopes: self.scopes,
            confidential,
            active: true,
            access_token_lifetime: None,
            refresh_token_lifetime: None,
            pkce_required: None,
            allowed_origins: self.allowed_origins,
        })
    }
}

/// Creates the configured seed clients if they are not already registered.
///
/// # Errors
/// Returns an error if a client record is invalid or the store fails.
pub async fn seed_clients(store: &dyn ClientStore, seeds: Vec<SeedClient>) -> AuthResult<usize> {
    let mut created = 0;
    for seed in seeds {
        let client_id = seed.client_id.clone();
        if store.find_by_client_id(&client_id).await?.is_some() {
            tracing::debug!(client_id, "seed client already registered");
            continue;
        }

        store.create(&seed.into_client()?).await?;
        tracing::info!(client_id, "seed client registered");
        created += 1;
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_seed(client_id: &str) -> SeedClient {
        SeedClient {
            client_id: client_id.to_string(),
            name: "Seeded".to_string(),
            client_secret: None,
            redirect_uris: vec!["https://app/cb".to_string()],
            scopes: vec!["read".to_string()],
            grant_types: default_grant_types(),
            allowed_origins: vec![],
        }
    }

    #[tokio::test]
    async fn test_seed_creates_missing_clients() {
        let store = MemoryClientStore::new();
        let created = seed_clients(&store, vec![make_seed("a"), make_seed("b")])
            .await
            .unwrap();
        assert_eq!(created, 2);
        assert!(store.find_by_client_id("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryClientStore::new();
        seed_clients(&store, vec![make_seed("a")]).await.unwrap();
        let created = seed_clients(&store, vec![make_seed("a")]).await.unwrap();
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn test_secret_is_hashed() {
        let seed = SeedClient {
            client_secret: Some("plain-secret".to_string()),
            ..make_seed("confidential")
        };
        let client = seed.into_client().unwrap();

        assert!(client.confidential);
        let stored = client.client_secret.unwrap();
        assert_ne!(stored, "plain-secret");
        assert!(stored.starts_with("$argon2"));
    }
}
