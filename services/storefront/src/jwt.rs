//! Session token issuance and verification
//!
//! Admin sessions are HS256-signed JWTs carrying a role claim, an issue time
//! and an expiry. Expiry is checked against the injected [`common::Clock`] rather
//! than the library's wall-clock check so that it can be exercised in tests.
//! There is no revocation list: a token stays valid until it expires.

use chrono::{DateTime, Duration, Utc};
use common::clock::SharedClock;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::SigningSecret;

/// Role carried by admin session tokens
pub const ADMIN_ROLE: &str = "admin";

/// Session token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (the role tag of the session holder)
    pub sub: String,
    /// Granted role
    pub role: String,
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiration, seconds since the epoch
    pub exp: i64,
}

impl SessionClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Errors raised while minting or decoding a token
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Malformed or tampered session token: {0}")]
    Decoding(#[source] jsonwebtoken::errors::Error),
}

/// Result of checking a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionVerdict {
    /// Signature, expiry and role all check out
    Valid(SessionClaims),
    /// No token was presented
    Missing,
    /// Signature or encoding is wrong
    Invalid,
    /// Signature is fine but the token is past its expiry
    Expired,
    /// Signature is fine but the role is not admin
    WrongRole,
}

impl SessionVerdict {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionVerdict::Valid(_))
    }

    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            SessionVerdict::Valid(claims) => Some(claims),
            _ => None,
        }
    }
}

/// Token issuer and verifier
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    clock: SharedClock,
}

impl SessionTokens {
    /// Initialize the token service with a signing secret and token lifetime
    pub fn new(secret: &SigningSecret, ttl: Duration, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify`.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
            clock,
        }
    }

    /// Mint an admin token valid from now until now + ttl
    pub fn issue(&self) -> Result<(String, SessionClaims), SessionError> {
        let now = self.clock.now().timestamp();
        let claims = SessionClaims {
            sub: ADMIN_ROLE.to_string(),
            role: ADMIN_ROLE.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.num_seconds()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(SessionError::Signing)?;
        Ok((token, claims))
    }

    /// Check the signature and decode the claims, ignoring expiry
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(SessionError::Decoding)?;
        Ok(token_data.claims)
    }

    /// Full verification: signature, expiry, then role
    pub fn verify(&self, token: &str) -> SessionVerdict {
        let claims = match self.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!("Rejected session token: {}", e);
                return SessionVerdict::Invalid;
            }
        };

        if self.clock.now().timestamp() >= claims.exp {
            return SessionVerdict::Expired;
        }

        if claims.role != ADMIN_ROLE {
            return SessionVerdict::WrongRole;
        }

        SessionVerdict::Valid(claims)
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
