//! JWKS endpoint handler.
//!
//! `GET /.well-known/jwks.json` publishes the public halves of every
//! retained signing key (active and retired) so resource servers can verify
//! tokens without sharing private material.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::keys::{Jwks, KeyRing};

/// State for the JWKS endpoint.
#[derive(Clone)]
pub struct JwksState {
    /// The signing key ring.
    pub key_ring: Arc<KeyRing>,
}

/// `GET /.well-known/jwks.json`: returns the public key set.
pub async fn jwks_handler(State(state): State<JwksState>) -> Json<Jwks> {
    Json(state.key_ring.jwks())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::SigningAlgorithm;

    #[tokio::test]
    async fn test_jwks_handler_returns_all_keys() {
        let ring = Arc::new(KeyRing::generate(SigningAlgorithm::RS256).unwrap());
        ring.rotate().unwrap();

        let state = JwksState {
            key_ring: ring.clone(),
        };
        let Json(jwks) = jwks_handler(State(state)).await;

        assert_eq!(jwks.keys.len(), 2);
        assert_eq!(jwks.keys[0].kid, ring.active_key().kid);
    }
}
