//! Share links
//!
//! A share link binds an unguessable token to a confined path for a number
//! of days. Anyone holding the token can download the file until it expires.

use crate::cache::CacheStore;
use crate::error::{PathError, PathRejection, ShareServerError};
use crate::identity::PrincipalId;
use crate::notify::Notifier;
use crate::path::{self, ConfinedPath, confine};
use crate::service::auth::validate_phone;
use crate::storage::{FileDownload, ObjectStore};
use crate::token::{SHARE_NAMESPACE, TokenIssuer};
use log::info;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareRequest {
    pub path: String,
    pub recipient_phone: Option<String>,
    pub expiration_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub token: String,
    pub expiration_days: u32,
    pub expires_at: SystemTime,
}

/// Lifetime bounds for share links, in days.
#[derive(Debug, Clone, Copy)]
pub struct ShareLifetime {
    pub default_days: u32,
    pub max_days: u32,
}

impl ShareLifetime {
    /// Missing means the default; anything else is clamped to `1..=max_days`.
    pub fn days_for(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_days)
            .clamp(1, self.max_days.max(1))
    }
}

pub struct ShareService<C, S> {
    issuer: TokenIssuer<C>,
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
    base_url: String,
    lifetime: ShareLifetime,
}

impl<C: CacheStore, S: ObjectStore> ShareService<C, S> {
    pub fn new(
        issuer: TokenIssuer<C>,
        store: Arc<S>,
        notifier: Arc<dyn Notifier>,
        base_url: &str,
        lifetime: ShareLifetime,
    ) -> Self {
        Self {
            issuer,
            store,
            notifier,
            base_url: base_url.trim_end_matches('/').to_string(),
            lifetime,
        }
    }

    pub async fn create_share(
        &self,
        principal: PrincipalId,
        request: ShareRequest,
    ) -> Result<ShareLink, ShareServerError> {
        if request.path.trim().is_empty() {
            return Err(PathError::invalid(&request.path, PathRejection::Empty).into());
        }
        path::validate(&request.path)?;
        let confined = confine(&principal.storage_root(), &request.path)?;

        let recipient = request
            .recipient_phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty());
        if let Some(phone) = recipient {
            validate_phone(phone)?;
        }

        let days = self.lifetime.days_for(request.expiration_days);
        let ttl = Duration::from_secs(u64::from(days) * SECONDS_PER_DAY);

        let issued = self
            .issuer
            .issue_multi_read(SHARE_NAMESPACE, confined.as_str(), ttl)
            .await?;
        let url = format!("{}/share/{}", self.base_url, issued.token);
        info!(
            "Principal {} shared {} for {} days",
            principal, confined, days
        );

        if let Some(phone) = recipient {
            let message = format!(
                "You have received a shared file! Download it using this link: {}\nThis link will expire in {} days.",
                url, days
            );
            self.notifier.send(phone, &message);
        }

        Ok(ShareLink {
            url,
            token: issued.token,
            expiration_days: days,
            expires_at: issued.expires_at,
        })
    }

    /// Fetches the file behind a share token. Needs no authentication.
    pub async fn download(&self, token: &str) -> Result<FileDownload, ShareServerError> {
        let stored = self.issuer.redeem(SHARE_NAMESPACE, token).await?;
        let confined = reconfine(&stored)?;
        let download = self.store.read(&confined).await?;
        Ok(download)
    }
}

/// Rebuilds a [`ConfinedPath`] from its stored form, re-running containment.
/// The first component is the principal root.
fn reconfine(stored: &str) -> Result<ConfinedPath, PathError> {
    let (root, rest) = stored.split_once('/').unwrap_or((stored, ""));
    confine(root, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheStore;
    use crate::error::{AuthError, StorageError};
    use crate::notify::LogNotifier;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;

    const LIFETIME: ShareLifetime = ShareLifetime {
        default_days: 7,
        max_days: 30,
    };

    fn service() -> (
        TempDir,
        Arc<InMemoryCacheStore>,
        ShareService<Arc<InMemoryCacheStore>, LocalStorage>,
    ) {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(InMemoryCacheStore::new());
        let store = Arc::new(LocalStorage::new(dir.path(), 1024).unwrap());
        let service = ShareService::new(
            TokenIssuer::new(Arc::clone(&cache)),
            store,
            Arc::new(LogNotifier),
            "http://localhost:8080/api/v1/",
            LIFETIME,
        );
        (dir, cache, service)
    }

    #[test]
    fn days_default_and_clamp() {
        assert_eq!(LIFETIME.days_for(None), 7);
        assert_eq!(LIFETIME.days_for(Some(0)), 1);
        assert_eq!(LIFETIME.days_for(Some(3)), 3);
        assert_eq!(LIFETIME.days_for(Some(365)), 30);
    }

    #[test]
    fn stored_paths_reconfine_under_their_root() {
        let confined = reconfine("42/docs/report.pdf").unwrap();
        assert_eq!(confined.root(), std::path::Path::new("42"));
        assert_eq!(confined.as_str(), "42/docs/report.pdf");
        assert!(reconfine("42/../43/x").is_err());
    }

    #[tokio::test]
    async fn share_binds_token_to_confined_path() {
        let (_dir, cache, service) = service();
        let link = service
            .create_share(
                PrincipalId(42),
                ShareRequest {
                    path: "docs/report.pdf".into(),
                    ..ShareRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(link.token.len(), 43);
        assert_eq!(
            link.url,
            format!("http://localhost:8080/api/v1/share/{}", link.token)
        );
        assert_eq!(link.expiration_days, 7);
        assert_eq!(
            cache.get(SHARE_NAMESPACE, &link.token).await.unwrap().as_deref(),
            Some("42/docs/report.pdf")
        );
    }

    #[tokio::test]
    async fn traversal_and_blank_paths_are_refused() {
        let (_dir, cache, service) = service();
        for path in ["", "  ", "../43/secret.txt", "/etc/passwd", "C:\\x", "a/%2e%2e/b"] {
            let result = service
                .create_share(
                    PrincipalId(42),
                    ShareRequest {
                        path: path.into(),
                        ..ShareRequest::default()
                    },
                )
                .await;
            assert!(
                matches!(result, Err(ShareServerError::Path(_))),
                "{:?} -> {:?}",
                path,
                result
            );
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn bad_recipient_phone_is_refused_before_issuing() {
        let (_dir, cache, service) = service();
        let result = service
            .create_share(
                PrincipalId(42),
                ShareRequest {
                    path: "a.txt".into(),
                    recipient_phone: Some("nope".into()),
                    expiration_days: Some(1),
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(ShareServerError::Auth(AuthError::InvalidPhone(_)))
        ));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn download_reads_the_shared_file() {
        let (dir, _cache, service) = service();
        std::fs::create_dir_all(dir.path().join("42/docs")).unwrap();
        std::fs::write(dir.path().join("42/docs/report.pdf"), b"%PDF-1.7").unwrap();

        let link = service
            .create_share(
                PrincipalId(42),
                ShareRequest {
                    path: "docs/report.pdf".into(),
                    recipient_phone: Some("+15550100".into()),
                    expiration_days: Some(2),
                },
            )
            .await
            .unwrap();

        let download = service.download(&link.token).await.unwrap();
        assert_eq!(download.name, "report.pdf");
        assert_eq!(download.bytes, b"%PDF-1.7");
    }

    #[tokio::test]
    async fn unknown_token_and_missing_file_are_distinct() {
        let (_dir, _cache, service) = service();
        assert!(matches!(
            service.download("unknown").await,
            Err(ShareServerError::TokenNotFoundOrExpired)
        ));

        let link = service
            .create_share(
                PrincipalId(42),
                ShareRequest {
                    path: "gone.txt".into(),
                    ..ShareRequest::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            service.download(&link.token).await,
            Err(ShareServerError::Storage(StorageError::FileNotFound(_)))
        ));
    }
}
