//! Signed bearer tokens
//!
//! HS256 JWTs carrying the principal id in `sub`. The signature is checked by
//! `jsonwebtoken`; expiry is checked here against an explicit clock so tests
//! can move time.

use crate::error::AuthError;
use crate::identity::PrincipalId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Issues and verifies opaque bearer tokens for principals.
pub trait IdentityTokens: Send + Sync {
    fn issue(&self, id: PrincipalId) -> Result<String, AuthError>;

    /// The principal a valid, unexpired token was issued to.
    fn verify(&self, token: &str) -> Option<PrincipalId>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: u64,
    exp: u64,
}

pub struct HmacBearer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl HmacBearer {
    pub fn new(signing_key: &[u8], ttl: Duration) -> Result<Self, AuthError> {
        if signing_key.is_empty() {
            return Err(AuthError::Signing("signing key is empty".into()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.required_spec_claims =
            HashSet::from(["exp".to_string(), "sub".to_string()]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            validation,
            ttl,
        })
    }

    pub(crate) fn issue_at(&self, id: PrincipalId, now: SystemTime) -> Result<String, AuthError> {
        let claims = Claims {
            sub: id.to_string(),
            iat: unix_seconds(now),
            exp: unix_seconds(now + self.ttl),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    pub(crate) fn verify_at(&self, token: &str, now: SystemTime) -> Option<PrincipalId> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .ok()?
            .claims;

        if unix_seconds(now) >= claims.exp {
            return None;
        }
        claims.sub.parse().ok().map(PrincipalId)
    }
}

impl IdentityTokens for HmacBearer {
    fn issue(&self, id: PrincipalId) -> Result<String, AuthError> {
        self.issue_at(id, SystemTime::now())
    }

    fn verify(&self, token: &str) -> Option<PrincipalId> {
        self.verify_at(token, SystemTime::now())
    }
}

fn unix_seconds(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
