//! PKCE (Proof Key for Code Exchange) implementation.
//!
//! Implements RFC 7636 with the S256 method only; "plain" offers no
//! protection against an attacker who can observe the authorization request
//! and is rejected.
//!
//! # Example
//!
//! ```
//! use gatehouse_auth::oauth::{PkceChallenge, PkceVerifier};
//!
//! // Client generates a verifier and derives the challenge
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! // Server stores the challenge, later verifies the presented verifier
//! assert!(challenge.verify(&verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

/// Errors that can occur during PKCE operations.
#[derive(Debug, thiserror::Error)]
pub enum PkceError {
    /// Verifier length is outside the valid range (43-128 characters).
    #[error("Invalid verifier length: must be 43-128 characters, got {0}")]
    InvalidVerifierLength(usize),

    /// Verifier contains invalid characters.
    #[error("Invalid verifier characters: must be unreserved URI characters")]
    InvalidVerifierCharacters,

    /// Challenge format is invalid.
    #[error("Invalid challenge format: must be valid base64url")]
    InvalidChallengeFormat,

    /// Unsupported challenge method (only S256 is supported).
    #[error("Unsupported challenge method: {0}. Only S256 is supported.")]
    UnsupportedMethod(String),

    /// Verification failed (verifier doesn't match challenge).
    #[error("PKCE verification failed: verifier does not match challenge")]
    VerificationFailed,
}

/// PKCE challenge methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkceChallengeMethod {
    /// SHA-256 hash of the verifier (the only supported method).
    S256,
}

impl PkceChallengeMethod {
    /// Parses a `code_challenge_method` parameter value.
    ///
    /// # Errors
    /// Returns an error for any method other than `S256`, including `plain`.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        match method {
            "S256" => Ok(Self::S256),
            other => Err(PkceError::UnsupportedMethod(other.to_string())),
        }
    }

    /// Returns the method name as used in request parameters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A PKCE code verifier held by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Wraps and validates a verifier string.
    ///
    /// # Errors
    /// Returns an error if the length is outside 43-128 characters or if the
    /// string contains characters outside the unreserved set.
    pub fn new(verifier: String) -> Result<Self, PkceError> {
        if verifier.len() < 43 || verifier.len() > 128 {
            return Err(PkceError::InvalidVerifierLength(verifier.len()));
        }
        if !verifier
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~'))
        {
            return Err(PkceError::InvalidVerifierCharacters);
        }
        Ok(Self(verifier))
    }

    /// Generates a fresh random verifier (43 characters, 256 bits entropy).
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Returns the verifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PkceVerifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A PKCE code challenge sent in the authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Derives the S256 challenge from a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let digest = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(digest))
    }

    /// Wraps and validates a challenge string received in a request.
    ///
    /// # Errors
    /// Returns an error if the string is not 43 characters of base64url.
    pub fn new(challenge: String) -> Result<Self, PkceError> {
        // SHA-256 output is 32 bytes = 43 base64url characters.
        if challenge.len() != 43 {
            return Err(PkceError::InvalidChallengeFormat);
        }
        if URL_SAFE_NO_PAD.decode(&challenge).is_err() {
            return Err(PkceError::InvalidChallengeFormat);
        }
        Ok(Self(challenge))
    }

    /// Verifies a presented verifier against this challenge.
    ///
    /// # Errors
    /// Returns `VerificationFailed` if the verifier does not hash to this
    /// challenge.
    pub fn verify(&self, verifier: &PkceVerifier) -> Result<(), PkceError> {
        let expected = Self::from_verifier(verifier);
        if expected.0 == self.0 {
            Ok(())
        } else {
            Err(PkceError::VerificationFailed)
        }
    }

    /// Returns the challenge string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify() {
        let verifier = PkceVerifier::generate();
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert!(challenge.verify(&verifier).is_ok());
    }

    #[test]
    fn test_wrong_verifier_fails() {
        let verifier = PkceVerifier::generate();
        let challenge = PkceChallenge::from_verifier(&verifier);

        let other = PkceVerifier::generate();
        assert!(matches!(
            challenge.verify(&other),
            Err(PkceError::VerificationFailed)
        ));
    }

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        let verifier =
            PkceVerifier::new("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string()).unwrap();
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert_eq!(challenge.as_str(), "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_verifier_length_bounds() {
        assert!(matches!(
            PkceVerifier::new("too-short".to_string()),
            Err(PkceError::InvalidVerifierLength(9))
        ));

        let too_long = "a".repeat(129);
        assert!(matches!(
            PkceVerifier::new(too_long),
            Err(PkceError::InvalidVerifierLength(129))
        ));

        let max = "a".repeat(128);
        assert!(PkceVerifier::new(max).is_ok());
    }

    #[test]
    fn test_verifier_character_set() {
        let bad = format!("{}!", "a".repeat(42));
        assert!(matches!(
            PkceVerifier::new(bad),
            Err(PkceError::InvalidVerifierCharacters)
        ));

        let good = format!("{}-._~", "a".repeat(39));
        assert!(PkceVerifier::new(good).is_ok());
    }

    #[test]
    fn test_challenge_format() {
        assert!(PkceChallenge::new("short".to_string()).is_err());

        let invalid_chars = "!".repeat(43);
        assert!(PkceChallenge::new(invalid_chars).is_err());

        let verifier = PkceVerifier::generate();
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert!(PkceChallenge::new(challenge.as_str().to_string()).is_ok());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(
            PkceChallengeMethod::parse("S256").unwrap(),
            PkceChallengeMethod::S256
        );
        // "plain" is explicitly forbidden.
        assert!(matches!(
            PkceChallengeMethod::parse("plain"),
            Err(PkceError::UnsupportedMethod(_))
        ));
    }
}
