//! Storage traits for authorization server data.
//!
//! This module defines storage interfaces for:
//!
//! - OAuth client registrations
//! - Authorization code grants
//! - Refresh tokens and rotation chains
//!
//! # Implementations
//!
//! An in-memory backend lives in the `gatehouse-storage-memory` crate.
//! Durable backends plug in behind the same traits; the core only requires
//! strong read-after-write per record and an atomic compare-and-set on the
//! consumed/revoked fields.

pub mod client;
pub mod grant;

use std::future::Future;
use std::time::Duration;

pub use client::ClientStore;
pub use grant::GrantStore;

use crate::AuthResult;
use crate::error::AuthError;

/// Runs a store call under a bounded timeout.
///
/// A timeout is reported as a transient failure, distinct from an
/// invalid-credential failure, so callers know the request is safe to retry.
pub async fn with_timeout<T>(
    limit: Duration,
    operation: &'static str,
    fut: impl Future<Output = AuthResult<T>>,
) -> AuthResult<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "store call timed out");
            Err(AuthError::transient(format!("{operation} timed out")))
        }
    }
}

/// Deregisters a client and revokes everything it holds.
///
/// Client destruction cascades: pending authorization codes are purged and
/// all refresh tokens are revoked, so nothing issued to the client survives
/// its registration.
///
/// # Errors
/// Returns an error if any of the store operations fail.
pub async fn deregister_client(
    clients: &dyn ClientStore,
    grants: &dyn GrantStore,
    client_id: &str,
) -> AuthResult<()> {
    let codes = grants.purge_codes_by_client(client_id).await?;
    let tokens = grants.revoke_by_client(client_id).await?;
    clients.delete(client_id).await?;

    tracing::info!(client_id, codes, tokens, "client deregistered, grants revoked");
    Ok(())
}
