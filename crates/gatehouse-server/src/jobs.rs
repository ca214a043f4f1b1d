//! Background maintenance jobs.
//!
//! Two periodic tasks keep the stores and key material healthy:
//!
//! - **Key rotation**: rotates the signing key on the configured interval
//!   and purges retired keys once their retention grace has elapsed, so no
//!   outstanding token can still reference a purged key.
//! - **Grant cleanup**: garbage-collects expired authorization codes and
//!   dead refresh tokens.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use gatehouse_auth::config::SigningConfig;
use gatehouse_auth::keys::KeyRing;
use gatehouse_auth::storage::GrantStore;

/// Spawns the periodic signing-key rotation task.
pub fn spawn_key_rotation(key_ring: Arc<KeyRing>, config: SigningConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(config.rotation_interval);
        // The first tick fires immediately; the ring already has a fresh key.
        interval.tick().await;

        loop {
            interval.tick().await;
            match key_ring.rotate() {
                Ok(key) => {
                    tracing::info!(kid = %key.kid, "rotated signing key");
                }
                Err(e) => {
                    tracing::error!(error = %e, "signing key rotation failed");
                }
            }
            key_ring.purge_expired(config.retirement_grace);
        }
    })
}

/// Spawns the periodic grant garbage-collection task.
pub fn spawn_grant_cleanup(grants: Arc<dyn GrantStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match grants.cleanup_expired().await {
                Ok(removed) if removed > 0 => {
                    tracing::debug!(removed, "expired grants cleaned up");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "grant cleanup failed");
                }
            }
        }
    })
}
