//! Signed, expiring bearer credentials.
//!
//! Credentials are HS256-signed JWTs whose subject is the username. The
//! signing secret lives only in process memory; when none is configured a
//! random one is drawn at startup, so every credential issued by a previous
//! process becomes invalid on restart.

use std::fmt;

use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of a randomly generated signing secret, in bytes.
const RANDOM_SECRET_LEN: usize = 32;

/// Claims embedded in every credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username the credential was issued to.
    pub sub: String,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Reasons a credential cannot be issued or accepted.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// The token could not be signed.
    #[error("failed to sign credential: {0}")]
    Signing(String),

    /// Bad signature, malformed token or missing claims.
    #[error("invalid credential")]
    Invalid,

    /// The token is past its expiry.
    #[error("credential expired")]
    Expired,
}

/// Issues and validates bearer credentials.
#[derive(Clone)]
pub struct CredentialService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    default_ttl: Duration,
}

impl fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialService")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    /// Creates a service signing with `secret`.
    #[must_use]
    pub fn new(secret: &[u8], default_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            default_ttl,
        }
    }

    /// Creates a service with a fresh random secret.
    #[must_use]
    pub fn with_random_secret(default_ttl: Duration) -> Self {
        let mut secret = [0u8; RANDOM_SECRET_LEN];
        OsRng.fill_bytes(&mut secret);
        Self::new(&secret, default_ttl)
    }

    /// Lifetime applied by [`CredentialService::issue_default`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Issues a credential for `subject` that expires `ttl` from now.
    ///
    /// A zero or negative `ttl` yields a credential that is already expired.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Signing`] if encoding fails.
    pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CredentialError::Signing(e.to_string()))
    }

    /// Issues a credential with the default lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Signing`] if encoding fails.
    pub fn issue_default(&self, subject: &str) -> Result<String, CredentialError> {
        self.issue(subject, self.default_ttl)
    }

    /// Validates `token` as of `now` and returns its subject.
    ///
    /// A credential is valid only while `now < exp`; there is no leeway.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Invalid`] for a bad signature, a malformed
    /// token or a missing subject, and [`CredentialError::Expired`] once the
    /// expiry has passed.
    pub fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the caller's clock below.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| CredentialError::Invalid)?;

        if data.claims.exp <= now.timestamp() {
            return Err(CredentialError::Expired);
        }
        if data.claims.sub.is_empty() {
            return Err(CredentialError::Invalid);
        }
        Ok(data.claims.sub)
    }
}
