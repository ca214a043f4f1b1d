//! Signing key material and the rotating key ring.
//!
//! A [`SigningKeyPair`] holds one asymmetric key pair (RSA or P-384) together
//! with its JWK export. The [`KeyRing`] owns the currently-active pair plus
//! retired pairs kept for verification, and coordinates rotation so readers
//! always observe either the pre- or post-rotation state.

pub mod jwks;
pub mod pair;
pub mod ring;

pub use jwks::{Jwk, Jwks};
pub use pair::{KeyError, SigningAlgorithm, SigningKeyPair};
pub use ring::KeyRing;
