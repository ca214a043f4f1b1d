//! In-memory grant state store.
//!
//! Codes are keyed by their opaque value, refresh tokens by their SHA-256
//! hash. The consume and revoke transitions hold the write lock across the
//! whole check-and-mark step, so concurrent duplicate submissions have
//! exactly one winner.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use gatehouse_auth::AuthResult;
use gatehouse_auth::error::AuthError;
use gatehouse_auth::storage::GrantStore;
use gatehouse_auth::types::{AuthorizationCode, RefreshToken};

/// In-memory [`GrantStore`] implementation.
#[derive(Default)]
pub struct MemoryGrantStore {
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl MemoryGrantStore {
    /// Creates an empty grant store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn put_code(&self, code: &AuthorizationCode) -> AuthResult<()> {
        let mut codes = self.codes.write().expect("grant store lock poisoned");
        if codes.contains_key(&code.code) {
            return Err(AuthError::internal("Duplicate authorization code value"));
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn find_code(&self, code: &str) -> AuthResult<Option<AuthorizationCode>> {
        let codes = self.codes.read().expect("grant store lock poisoned");
        Ok(codes.get(code).cloned())
    }

    async fn consume_code(&self, code: &str) -> AuthResult<AuthorizationCode> {
        // The whole check-and-mark runs under the write lock: exactly one
        // concurrent caller wins.
        let mut codes = self.codes.write().expect("grant store lock poisoned");

        let record = codes
            .get_mut(code)
            .ok_or_else(|| AuthError::invalid_grant("Unknown authorization code"))?;

        if record.consumed_at.is_some() {
            return Err(AuthError::ReplayDetected {
                kind: "authorization_code",
            });
        }

        if record.is_expired() {
            return Err(AuthError::invalid_grant("Authorization code expired"));
        }

        record.consumed_at = Some(OffsetDateTime::now_utc());
        Ok(record.clone())
    }

    async fn purge_codes_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let mut codes = self.codes.write().expect("grant store lock poisoned");
        let before = codes.len();
        codes.retain(|_, c| c.client_id != client_id);
        Ok((before - codes.len()) as u64)
    }

    async fn put_refresh_token(&self, token: &RefreshToken) -> AuthResult<()> {
        let mut tokens = self.tokens.write().expect("grant store lock poisoned");
        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::internal("Duplicate refresh token hash"));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token_by_hash(
        &self,
        token_hash: &str,
    ) -> AuthResult<Option<RefreshToken>> {
        let tokens = self.tokens.read().expect("grant store lock poisoned");
        Ok(tokens.get(token_hash).cloned())
    }

    async fn revoke_refresh_token(&self, token_hash: &str) -> AuthResult<RefreshToken> {
        let mut tokens = self.tokens.write().expect("grant store lock poisoned");

        let record = tokens
            .get_mut(token_hash)
            .ok_or_else(|| AuthError::invalid_grant("Unknown refresh token"))?;

        if record.revoked_at.is_some() {
            return Err(AuthError::ReplayDetected {
                kind: "refresh_token",
            });
        }

        record.revoked_at = Some(OffsetDateTime::now_utc());
        Ok(record.clone())
    }

    async fn revoke_chain(&self, token_id: Uuid) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().expect("grant store lock poisoned");

        // Walk the parent links transitively: the seed plus every token that
        // descends from it.
        let mut chain: HashSet<Uuid> = HashSet::from([token_id]);
        loop {
            let next: Vec<Uuid> = tokens
                .values()
                .filter(|t| {
                    t.parent_id.is_some_and(|p| chain.contains(&p)) && !chain.contains(&t.id)
                })
                .map(|t| t.id)
                .collect();
            if next.is_empty() {
                break;
            }
            chain.extend(next);
        }

        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if chain.contains(&token.id) && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_by_code(&self, code_id: Uuid) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().expect("grant store lock poisoned");
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if token.code_id == Some(code_id) && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn revoke_by_client(&self, client_id: &str) -> AuthResult<u64> {
        let mut tokens = self.tokens.write().expect("grant store lock poisoned");
        let now = OffsetDateTime::now_utc();
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if token.client_id == client_id && token.revoked_at.is_none() {
                token.revoked_at = Some(now);
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn cleanup_expired(&self) -> AuthResult<u64> {
        let mut removed = 0u64;

        {
            let mut codes = self.codes.write().expect("grant store lock poisoned");
            let before = codes.len();
            codes.retain(|_, c| !c.is_expired());
            removed += (before - codes.len()) as u64;
        }

        {
            let mut tokens = self.tokens.write().expect("grant store lock poisoned");
            let before = tokens.len();
            tokens.retain(|_, t| !t.is_expired() && !t.is_revoked());
            removed += (before - tokens.len()) as u64;
        }

        Ok(removed)
    }
}
