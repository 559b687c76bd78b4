//! Error handlers
//!
//! Maps errors onto protocol reply codes and logs them at the right level.

use crate::error::types::{AuthError, ShareServerError, StorageError};
use log::{error, warn};

/// Log a share server error. Caller mistakes are warnings, server faults errors.
pub fn handle_error(err: &ShareServerError) {
    if err.is_client_error() {
        warn!("Request rejected: {}", err);
    } else {
        error!("Share Server Error: {}", err);
    }
}

/// Convert error to protocol reply code
pub fn error_to_reply_code(err: &ShareServerError) -> u16 {
    match err {
        ShareServerError::Path(_) => 501,
        ShareServerError::Cache(_) => 421,
        ShareServerError::TokenNotFoundOrExpired => 550,
        ShareServerError::Storage(e) => match e {
            StorageError::FileNotFound(_) | StorageError::NotAFile(_) => 550,
            StorageError::OutsideRoot(_) => 501,
            StorageError::InvalidFileName(_) => 553,
            StorageError::FileTooLarge { .. } => 552,
            StorageError::UploadInProgress(_) => 450,
            StorageError::IoError(_) => 451,
        },
        ShareServerError::Auth(e) => match e {
            AuthError::InvalidPhone(_) => 501,
            AuthError::RateLimited(_) => 421,
            AuthError::Signing(_) => 451,
            AuthError::InvalidOtp | AuthError::InvalidBearer | AuthError::NotLoggedIn => 530,
        },
        ShareServerError::IoError(_) => 451,
        ShareServerError::ProtocolError(_) => 500,
    }
}

/// Render an error as a single reply line.
pub fn error_reply(err: &ShareServerError) -> String {
    handle_error(err);
    let text = match err {
        // Server-side details stay in the log.
        ShareServerError::Cache(_) => "Service temporarily unavailable".to_string(),
        ShareServerError::IoError(_)
        | ShareServerError::Storage(StorageError::IoError(_))
        | ShareServerError::Auth(AuthError::Signing(_)) => "Local error in processing".to_string(),
        other => other.to_string(),
    };
    format!("{} {}\r\n", error_to_reply_code(err), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::types::{CacheError, PathError, PathRejection};
    use std::time::Duration;

    #[test]
    fn cache_failures_are_not_reported_as_missing_tokens() {
        let unavailable = ShareServerError::Cache(CacheError::Timeout(Duration::from_secs(1)));
        assert_eq!(error_to_reply_code(&unavailable), 421);
        assert_eq!(
            error_to_reply_code(&ShareServerError::TokenNotFoundOrExpired),
            550
        );
    }

    #[test]
    fn reply_hides_server_side_details() {
        let err = ShareServerError::Cache(CacheError::Protocol("ERR secret".into()));
        let reply = error_reply(&err);
        assert_eq!(reply, "421 Service temporarily unavailable\r\n");
    }

    #[test]
    fn signing_failures_are_server_errors() {
        let err = ShareServerError::Auth(AuthError::Signing("bad key".into()));
        assert!(!err.is_client_error());
        assert_eq!(error_reply(&err), "451 Local error in processing\r\n");
    }

    #[test]
    fn path_errors_map_to_argument_errors() {
        let err = ShareServerError::Path(PathError::invalid("../x", PathRejection::ForbiddenSequence));
        assert!(error_reply(&err).starts_with("501 "));
    }
}
