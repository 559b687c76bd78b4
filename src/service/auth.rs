//! Phone + OTP login
//!
//! `login` sends a one-time code, `validate` trades it for a bearer token,
//! `authenticate` maps a bearer token back to its principal.

use crate::cache::CacheStore;
use crate::error::{AuthError, ShareServerError, TokenError};
use crate::identity::{IdentityTokens, PrincipalDirectory, PrincipalId};
use crate::middleware::RateLimiter;
use crate::notify::Notifier;
use crate::token::{OTP_NAMESPACE, TokenIssuer};
use log::{debug, info, warn};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{1,14}$").expect("Invalid phone regex"));

/// E.164-style phone number check.
pub fn validate_phone(phone: &str) -> Result<(), AuthError> {
    if PHONE_PATTERN.is_match(phone) {
        Ok(())
    } else {
        Err(AuthError::InvalidPhone(phone.to_string()))
    }
}

pub struct AuthService<C> {
    issuer: TokenIssuer<C>,
    directory: Arc<dyn PrincipalDirectory>,
    tokens: Arc<dyn IdentityTokens>,
    notifier: Arc<dyn Notifier>,
    limiter: RateLimiter,
    failed_attempts: RateLimiter,
    otp_ttl: Duration,
}

impl<C: CacheStore> AuthService<C> {
    pub fn new(
        issuer: TokenIssuer<C>,
        directory: Arc<dyn PrincipalDirectory>,
        tokens: Arc<dyn IdentityTokens>,
        notifier: Arc<dyn Notifier>,
        limiter: RateLimiter,
        failed_attempts: RateLimiter,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            issuer,
            directory,
            tokens,
            notifier,
            limiter,
            failed_attempts,
            otp_ttl,
        }
    }

    /// Sends a fresh login code to `phone`, replacing any outstanding one.
    pub async fn login(&self, phone: &str) -> Result<(), ShareServerError> {
        validate_phone(phone)?;

        if !self.limiter.is_allowed(phone) {
            warn!("Login rate limit hit for {}", phone);
            return Err(AuthError::RateLimited(phone.to_string()).into());
        }

        let issued = self
            .issuer
            .issue_one_shot(OTP_NAMESPACE, phone, self.otp_ttl)
            .await?;
        self.notifier
            .send(phone, &format!("This is the otp {}", issued.token));

        info!("Login code sent to {}", phone);
        Ok(())
    }

    /// Consumes the login code and returns a bearer token for the phone's
    /// principal, registering it on first login.
    ///
    /// Wrong codes count against the phone. Once the window is used up the
    /// outstanding code is revoked and every attempt is refused until the
    /// window slides.
    pub async fn validate(&self, phone: &str, code: &str) -> Result<String, ShareServerError> {
        validate_phone(phone)?;

        if self.failed_attempts.is_exhausted(phone) {
            self.issuer.revoke(OTP_NAMESPACE, phone).await?;
            warn!("Code verification locked for {}", phone);
            return Err(AuthError::RateLimited(phone.to_string()).into());
        }

        match self.issuer.consume_one_shot(OTP_NAMESPACE, phone, code).await {
            Ok(()) => self.failed_attempts.reset(phone),
            Err(TokenError::NotFoundOrExpired) => {
                self.failed_attempts.record(phone);
                if self.failed_attempts.is_exhausted(phone) {
                    self.issuer.revoke(OTP_NAMESPACE, phone).await?;
                    warn!("Too many wrong codes for {}, code revoked", phone);
                }
                return Err(AuthError::InvalidOtp.into());
            }
            Err(TokenError::Cache(e)) => return Err(e.into()),
        }

        let principal = self.directory.find_or_register(phone);
        let bearer = self.tokens.issue(principal.id)?;
        info!("Principal {} logged in", principal.id);
        debug!("Bearer for {}: {}", principal.id, bearer);
        Ok(bearer)
    }

    pub fn authenticate(&self, bearer: &str) -> Result<PrincipalId, AuthError> {
        self.tokens.verify(bearer).ok_or(AuthError::InvalidBearer)
    }

    /// Drops rate limiter state for phones that have gone quiet.
    pub fn prune_rate_limits(&self) {
        self.limiter.prune();
        self.failed_attempts.prune();
    }
}
