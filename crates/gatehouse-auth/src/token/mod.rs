//! Token claims and the signing/verification codec.

pub mod claims;
pub mod codec;

pub use claims::{AccessTokenClaims, AccessTokenClaimsBuilder, IdTokenClaims};
pub use codec::TokenCodec;
