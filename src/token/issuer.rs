//! Token issuance and redemption on top of the expiring cache

use crate::cache::CacheStore;
use crate::error::TokenError;
use crate::token::generator::{generate_otp, generate_share_token};
use log::debug;
use std::time::{Duration, SystemTime};
use subtle::ConstantTimeEq;

/// How a token may be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumption {
    /// Deleted by the consumer after one successful validation.
    OneShot,
    /// Readable any number of times until it expires.
    MultiRead,
}

/// A token and what it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub bound_value: String,
    pub expires_at: SystemTime,
    pub consumption: Consumption,
}

/// Mints tokens and stores them in a cache it does not own.
#[derive(Clone)]
pub struct TokenIssuer<C> {
    cache: C,
}

impl<C: CacheStore> TokenIssuer<C> {
    pub fn new(cache: C) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Issues a 6-digit code for `subject`, replacing any earlier code.
    ///
    /// The code is short and guessable on purpose: it is bound to a known
    /// subject, short-lived and rate limited upstream.
    pub async fn issue_one_shot(
        &self,
        namespace: &str,
        subject: &str,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let code = generate_otp();
        self.cache
            .put(namespace, subject, code.clone(), ttl)
            .await?;
        debug!("Issued one-shot code in {} for {}", namespace, subject);

        Ok(IssuedToken {
            token: code.clone(),
            bound_value: code,
            expires_at: SystemTime::now() + ttl,
            consumption: Consumption::OneShot,
        })
    }

    /// Checks `submitted` against the code stored for `subject` and deletes it
    /// on success. Missing, expired and wrong codes are indistinguishable.
    ///
    /// Only the caller whose delete actually removed the entry succeeds, so
    /// racing consumers of the same code get exactly one winner.
    pub async fn consume_one_shot(
        &self,
        namespace: &str,
        subject: &str,
        submitted: &str,
    ) -> Result<(), TokenError> {
        let stored = self.cache.get(namespace, subject).await?;
        match stored {
            Some(code) if bool::from(code.as_bytes().ct_eq(submitted.as_bytes())) => {
                if self.cache.remove(namespace, subject).await? {
                    Ok(())
                } else {
                    Err(TokenError::NotFoundOrExpired)
                }
            }
            _ => Err(TokenError::NotFoundOrExpired),
        }
    }

    /// Drops whatever code is outstanding for `subject`.
    pub async fn revoke(&self, namespace: &str, subject: &str) -> Result<(), TokenError> {
        if self.cache.remove(namespace, subject).await? {
            debug!("Revoked one-shot code in {} for {}", namespace, subject);
        }
        Ok(())
    }

    /// Binds `value` to a fresh unguessable token.
    pub async fn issue_multi_read(
        &self,
        namespace: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let token = generate_share_token();
        self.cache
            .put(namespace, &token, value.to_string(), ttl)
            .await?;

        Ok(IssuedToken {
            token,
            bound_value: value.to_string(),
            expires_at: SystemTime::now() + ttl,
            consumption: Consumption::MultiRead,
        })
    }

    /// Looks a token up. Absent and expired are the same answer.
    pub async fn redeem(&self, namespace: &str, token: &str) -> Result<String, TokenError> {
        self.cache
            .get(namespace, token)
            .await?
            .ok_or(TokenError::NotFoundOrExpired)
    }
}
