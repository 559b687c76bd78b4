//! Untrusted path validation
//!
//! Two independent layers: cheap syntactic rules on the raw string, then a
//! semantic check on the path normalized against a synthetic root. Both must
//! accept.

use crate::error::{PathError, PathRejection};
use crate::path::normalize::normalize;
use std::path::Path;

/// Characters that never appear in an acceptable path. `%` covers every
/// percent-encoded traversal attempt.
const FORBIDDEN_CHARS: [char; 8] = ['<', '>', '^', '%', '$', '#', '\t', '\n'];

const SYNTHETIC_ROOT: &str = "/";

/// Returns true for empty or whitespace-only input.
pub fn is_blank(path: &str) -> bool {
    path.trim().is_empty()
}

/// Validates a client-supplied relative path.
///
/// Blank input is accepted and means "the root". Everything else must be a
/// forward-slash relative path that stays strictly below its root.
pub fn validate(path: &str) -> Result<(), PathError> {
    if is_blank(path) {
        return Ok(());
    }

    // 1. Absolute paths, UNC paths and drive letters
    if path.starts_with('/') || path.starts_with('\\') || path.contains(':') {
        return Err(PathError::invalid(path, PathRejection::Absolute));
    }
    if path.contains('\\') {
        return Err(PathError::invalid(path, PathRejection::Backslash));
    }

    // 2. Literal traversal and control characters
    if path.contains("..") || path.contains(FORBIDDEN_CHARS) {
        return Err(PathError::invalid(path, PathRejection::ForbiddenSequence));
    }

    // 3. Normalize below a synthetic root and look again
    let normalized = normalize(&Path::new(SYNTHETIC_ROOT).join(path))
        .map_err(|reason| PathError::invalid(path, reason))?;
    let rendered = normalized
        .to_str()
        .ok_or_else(|| PathError::invalid(path, PathRejection::Unresolvable))?;

    if rendered == SYNTHETIC_ROOT || rendered.contains("..") || rendered.contains(['<', '>']) {
        return Err(PathError::invalid(path, PathRejection::EscapesRoot));
    }

    Ok(())
}
