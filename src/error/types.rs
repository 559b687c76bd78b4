//! Error types
//!
//! Defines domain-specific error types for each module of the share server.

use std::fmt;
use std::io;
use std::time::Duration;

/// Why a user-supplied path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// Path was blank where a concrete target is required.
    Empty,
    /// Starts with a separator or contains a drive/stream colon.
    Absolute,
    /// Contains a backslash.
    Backslash,
    /// Contains `..` or a forbidden character.
    ForbiddenSequence,
    /// Normalizes to the root itself or above it.
    EscapesRoot,
    /// Could not be resolved as a path at all.
    Unresolvable,
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            PathRejection::Empty => "path is empty",
            PathRejection::Absolute => "path must be relative",
            PathRejection::Backslash => "backslash separators are not allowed",
            PathRejection::ForbiddenSequence => "path contains a forbidden sequence",
            PathRejection::EscapesRoot => "path escapes its root",
            PathRejection::Unresolvable => "path cannot be resolved",
        };
        f.write_str(reason)
    }
}

/// Path guard and confiner errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    InvalidPath { path: String, reason: PathRejection },
    OutsideRoot { root: String, path: String },
}

impl PathError {
    pub(crate) fn invalid(path: &str, reason: PathRejection) -> Self {
        PathError::InvalidPath {
            path: path.to_string(),
            reason,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::InvalidPath { path, reason } => {
                write!(f, "Invalid path {:?}: {}", path, reason)
            }
            PathError::OutsideRoot { root, path } => {
                write!(f, "Path {:?} resolves outside root {:?}", path, root)
            }
        }
    }
}

impl std::error::Error for PathError {}

/// Cache backend errors. A miss is never an error.
#[derive(Debug)]
pub enum CacheError {
    Unavailable(io::Error),
    Timeout(Duration),
    Protocol(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Unavailable(e) => write!(f, "Cache unavailable: {}", e),
            CacheError::Timeout(d) => write!(f, "Cache did not answer within {:?}", d),
            CacheError::Protocol(msg) => write!(f, "Cache protocol error: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Unavailable(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(error: io::Error) -> Self {
        CacheError::Unavailable(error)
    }
}

/// Token issuance and redemption errors
#[derive(Debug)]
pub enum TokenError {
    /// Never existed, already consumed, expired or mismatched. One kind on purpose.
    NotFoundOrExpired,
    Cache(CacheError),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::NotFoundOrExpired => write!(f, "Token not found or expired"),
            TokenError::Cache(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<CacheError> for TokenError {
    fn from(error: CacheError) -> Self {
        TokenError::Cache(error)
    }
}

/// Storage module errors
#[derive(Debug)]
pub enum StorageError {
    FileNotFound(String),
    NotAFile(String),
    InvalidFileName(String),
    FileTooLarge { size: u64, max: u64 },
    UploadInProgress(String),
    OutsideRoot(String),
    IoError(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::FileNotFound(p) => write!(f, "File not found: {}", p),
            StorageError::NotAFile(p) => write!(f, "Path is not a file: {}", p),
            StorageError::InvalidFileName(n) => write!(f, "Invalid file name: {:?}", n),
            StorageError::FileTooLarge { size, max } => {
                write!(f, "File size {} exceeds maximum of {} bytes", size, max)
            }
            StorageError::UploadInProgress(p) => {
                write!(f, "File is currently being uploaded: {}", p)
            }
            StorageError::OutsideRoot(p) => write!(f, "Path escapes storage root: {}", p),
            StorageError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::IoError(error)
    }
}

/// Authentication module errors
#[derive(Debug)]
pub enum AuthError {
    InvalidPhone(String),
    InvalidOtp,
    InvalidBearer,
    RateLimited(String),
    NotLoggedIn,
    Signing(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidPhone(p) => write!(f, "Invalid phone number: {}", p),
            AuthError::InvalidOtp => write!(f, "Invalid or expired OTP"),
            AuthError::InvalidBearer => write!(f, "Invalid or expired access token"),
            AuthError::RateLimited(p) => write!(f, "Too many login attempts for {}", p),
            AuthError::NotLoggedIn => write!(f, "Not logged in"),
            AuthError::Signing(msg) => write!(f, "Access token signing failed: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// General share server error that encompasses all error types
#[derive(Debug)]
pub enum ShareServerError {
    Path(PathError),
    Cache(CacheError),
    TokenNotFoundOrExpired,
    Storage(StorageError),
    Auth(AuthError),
    IoError(io::Error),
    ProtocolError(String),
}

impl ShareServerError {
    /// True for failures of the caller's input, as opposed to the server.
    pub fn is_client_error(&self) -> bool {
        match self {
            ShareServerError::Path(_)
            | ShareServerError::TokenNotFoundOrExpired
            | ShareServerError::ProtocolError(_) => true,
            ShareServerError::Auth(e) => !matches!(e, AuthError::Signing(_)),
            ShareServerError::Storage(e) => !matches!(e, StorageError::IoError(_)),
            ShareServerError::Cache(_) | ShareServerError::IoError(_) => false,
        }
    }
}

impl fmt::Display for ShareServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareServerError::Path(e) => write!(f, "Path error: {}", e),
            ShareServerError::Cache(e) => write!(f, "Cache error: {}", e),
            ShareServerError::TokenNotFoundOrExpired => {
                write!(f, "Token not found or expired")
            }
            ShareServerError::Storage(e) => write!(f, "Storage error: {}", e),
            ShareServerError::Auth(e) => write!(f, "Authentication error: {}", e),
            ShareServerError::IoError(e) => write!(f, "I/O error: {}", e),
            ShareServerError::ProtocolError(e) => write!(f, "Protocol error: {}", e),
        }
    }
}

impl std::error::Error for ShareServerError {}

impl From<PathError> for ShareServerError {
    fn from(error: PathError) -> Self {
        ShareServerError::Path(error)
    }
}

impl From<CacheError> for ShareServerError {
    fn from(error: CacheError) -> Self {
        ShareServerError::Cache(error)
    }
}

impl From<TokenError> for ShareServerError {
    fn from(error: TokenError) -> Self {
        match error {
            TokenError::NotFoundOrExpired => ShareServerError::TokenNotFoundOrExpired,
            TokenError::Cache(e) => ShareServerError::Cache(e),
        }
    }
}

impl From<StorageError> for ShareServerError {
    fn from(error: StorageError) -> Self {
        ShareServerError::Storage(error)
    }
}

impl From<AuthError> for ShareServerError {
    fn from(error: AuthError) -> Self {
        ShareServerError::Auth(error)
    }
}

impl From<io::Error> for ShareServerError {
    fn from(error: io::Error) -> Self {
        ShareServerError::IoError(error)
    }
}
