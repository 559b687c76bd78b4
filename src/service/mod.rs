//! Orchestrators
//!
//! Wire the cache, token issuer, identity, object store and notifier into
//! the operations the front end exposes.

pub mod auth;
pub mod files;
pub mod share;

pub use auth::{AuthService, validate_phone};
pub use files::FileService;
pub use share::{ShareLifetime, ShareLink, ShareRequest, ShareService};

use crate::cache::{Cache, CacheStore, Sweeper};
use crate::config::ServerConfig;
use crate::error::ShareServerError;
use crate::identity::{HmacBearer, IdentityTokens, InMemoryDirectory, PrincipalDirectory};
use crate::middleware::RateLimiter;
use crate::notify::{LogNotifier, Notifier};
use crate::storage::{LocalStorage, ObjectStore};
use crate::token::TokenIssuer;
use log::info;
use std::sync::Arc;

pub struct Services<C = Cache, S = LocalStorage> {
    pub auth: AuthService<C>,
    pub shares: ShareService<C, S>,
    pub files: FileService<S>,
}

impl<C: CacheStore + Clone, S: ObjectStore> Services<C, S> {
    pub fn new(
        cache: C,
        store: Arc<S>,
        directory: Arc<dyn PrincipalDirectory>,
        tokens: Arc<dyn IdentityTokens>,
        notifier: Arc<dyn Notifier>,
        config: &ServerConfig,
    ) -> Self {
        let auth = AuthService::new(
            TokenIssuer::new(cache.clone()),
            directory,
            tokens,
            Arc::clone(&notifier),
            RateLimiter::new(config.auth.otp_max_requests, config.auth.otp_window()),
            RateLimiter::new(config.auth.otp_max_attempts, config.auth.otp_window()),
            config.tokens.otp_ttl(),
        );

        let shares = ShareService::new(
            TokenIssuer::new(cache),
            Arc::clone(&store),
            notifier,
            &config.server.base_url,
            ShareLifetime {
                default_days: config.tokens.share_ttl_days,
                max_days: config.tokens.max_share_ttl_days,
            },
        );

        let files = FileService::new(store, config.server.max_file_size_bytes());

        Self {
            auth,
            shares,
            files,
        }
    }
}

/// Builds the production wiring from configuration. The returned sweeper,
/// if any, must be stopped on shutdown.
pub async fn build_services(
    config: &ServerConfig,
) -> Result<(Services, Option<Sweeper>), ShareServerError> {
    let store = LocalStorage::new(
        config.server.storage_root_path(),
        config.server.max_file_size_bytes(),
    )?;
    store.ensure_base().await?;
    info!("Storage root: {}", store.base().display());

    let tokens = HmacBearer::new(
        config.auth.signing_key.as_bytes(),
        config.auth.access_token_ttl(),
    )?;

    let (cache, sweeper) = Cache::from_config(&config.cache);

    let services = Services::new(
        cache,
        Arc::new(store),
        Arc::new(InMemoryDirectory::new()),
        Arc::new(tokens),
        Arc::new(LogNotifier),
        config,
    );
    Ok((services, sweeper))
}
