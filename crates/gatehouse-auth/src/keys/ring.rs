//! The rotating key ring.
//!
//! Exactly one key is active (used for new signing) at any time. Rotation
//! generates a fresh active key and retires the previous one; retired keys
//! remain available for verification until no outstanding token can still
//! reference them, at which point a purge pass drops them.
//!
//! Rotation is a rare, coordinated operation: the ring state sits behind a
//! `RwLock`, so readers always observe either the pre- or post-rotation
//! state, never a partially-updated record.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use time::OffsetDateTime;

use crate::keys::jwks::Jwks;
use crate::keys::pair::{KeyError, SigningAlgorithm, SigningKeyPair};

/// A retired key retained for verification only.
struct RetiredKey {
    pair: Arc<SigningKeyPair>,
    retired_at: OffsetDateTime,
}

struct RingState {
    active: Arc<SigningKeyPair>,
    retired: Vec<RetiredKey>,
}

/// Owns signing key material and rotation.
pub struct KeyRing {
    state: RwLock<RingState>,
    algorithm: SigningAlgorithm,
}

impl KeyRing {
    /// Creates a new key ring with a freshly generated active key.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, KeyError> {
        let active = Arc::new(SigningKeyPair::generate(algorithm)?);
        Ok(Self {
            state: RwLock::new(RingState {
                active,
                retired: Vec::new(),
            }),
            algorithm,
        })
    }

    /// Creates a key ring around an existing key pair.
    #[must_use]
    pub fn with_key(pair: SigningKeyPair) -> Self {
        let algorithm = pair.algorithm;
        Self {
            state: RwLock::new(RingState {
                active: Arc::new(pair),
                retired: Vec::new(),
            }),
            algorithm,
        }
    }

    /// Returns the key currently used for new signing.
    #[must_use]
    pub fn active_key(&self) -> Arc<SigningKeyPair> {
        self.state.read().expect("key ring lock poisoned").active.clone()
    }

    /// Looks up a key (active or retired) by its id.
    ///
    /// # Errors
    /// Returns `KeyError::NotFound` when the id is unknown or the key has
    /// been purged. Callers must map this to an invalid-signature error and
    /// never retry.
    pub fn key_for(&self, kid: &str) -> Result<Arc<SigningKeyPair>, KeyError> {
        let state = self.state.read().expect("key ring lock poisoned");
        if state.active.kid == kid {
            return Ok(state.active.clone());
        }
        state
            .retired
            .iter()
            .find(|k| k.pair.kid == kid)
            .map(|k| k.pair.clone())
            .ok_or_else(|| KeyError::not_found(kid))
    }

    /// Generates a new active key and retires the previous one.
    ///
    /// Tokens signed by the previous key keep verifying through
    /// [`key_for`](Self::key_for) until a purge pass removes it.
    ///
    /// # Errors
    /// Returns an error if key generation fails; the ring is left unchanged.
    pub fn rotate(&self) -> Result<Arc<SigningKeyPair>, KeyError> {
        // Generate outside the write lock; only the swap needs exclusivity.
        let fresh = Arc::new(SigningKeyPair::generate(self.algorithm)?);

        let mut state = self.state.write().expect("key ring lock poisoned");
        let previous = std::mem::replace(&mut state.active, fresh.clone());
        state.retired.push(RetiredKey {
            pair: previous,
            retired_at: OffsetDateTime::now_utc(),
        });

        tracing::info!(kid = %fresh.kid, "signing key rotated");
        Ok(fresh)
    }

    /// Drops retired keys whose retention grace has elapsed.
    ///
    /// The grace period must cover the longest lifetime of tokens the key
    /// may have signed; after that no outstanding token can reference it.
    /// Returns the number of keys purged.
    pub fn purge_expired(&self, grace: Duration) -> usize {
        let cutoff = OffsetDateTime::now_utc() - grace;
        let mut state = self.state.write().expect("key ring lock poisoned");
        let before = state.retired.len();
        state.retired.retain(|k| k.retired_at > cutoff);
        let purged = before - state.retired.len();
        if purged > 0 {
            tracing::info!(purged, "retired signing keys purged");
        }
        purged
    }

    /// Number of retired keys currently retained.
    #[must_use]
    pub fn retired_len(&self) -> usize {
        self.state.read().expect("key ring lock poisoned").retired.len()
    }

    /// Exports the public halves of every retained key.
    ///
    /// Retired keys stay published so resource servers keep verifying
    /// tokens signed before rotation.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        let state = self.state.read().expect("key ring lock poisoned");
        let mut jwks = Jwks::new();
        jwks.add_key(state.active.to_jwk());
        for retired in &state.retired {
            jwks.add_key(retired.pair.to_jwk());
        }
        jwks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_key_lookup() {
        let ring = KeyRing::generate(SigningAlgorithm::RS256).unwrap();
        let active = ring.active_key();
        let found = ring.key_for(&active.kid).unwrap();
        assert_eq!(found.kid, active.kid);
    }

    #[test]
    fn test_unknown_kid_is_not_found() {
        let ring = KeyRing::generate(SigningAlgorithm::RS256).unwrap();
        assert!(matches!(
            ring.key_for("no-such-kid"),
            Err(KeyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rotate_retires_previous_key() {
        let ring = KeyRing::generate(SigningAlgorithm::RS256).unwrap();
        let old = ring.active_key();

        let fresh = ring.rotate().unwrap();
        assert_ne!(old.kid, fresh.kid);
        assert_eq!(ring.active_key().kid, fresh.kid);

        // Retired key still resolves for verification.
        assert!(ring.key_for(&old.kid).is_ok());
        assert_eq!(ring.retired_len(), 1);
    }

    #[test]
    fn test_purge_drops_retired_keys() {
        let ring = KeyRing::generate(SigningAlgorithm::RS256).unwrap();
        let old = ring.active_key();
        ring.rotate().unwrap();

        // Nothing purged while inside the grace window.
        assert_eq!(ring.purge_expired(Duration::from_secs(3600)), 0);
        assert!(ring.key_for(&old.kid).is_ok());

        // Zero grace drops every retired key.
        assert_eq!(ring.purge_expired(Duration::ZERO), 1);
        assert!(matches!(
            ring.key_for(&old.kid),
            Err(KeyError::NotFound { .. })
        ));
    }

    #[test]
    fn test_jwks_includes_retired_keys() {
        let ring = KeyRing::generate(SigningAlgorithm::RS256).unwrap();
        assert_eq!(ring.jwks().keys.len(), 1);

        ring.rotate().unwrap();
        let jwks = ring.jwks();
        assert_eq!(jwks.keys.len(), 2);

        // Active key listed first.
        assert_eq!(jwks.keys[0].kid, ring.active_key().kid);
    }
}
