//! Path confinement
//!
//! Composes a principal's storage root with a relative path and guarantees
//! the result stays inside that root.

use crate::error::{PathError, PathRejection};
use crate::path::normalize::{has_parent_component, is_within, normalize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A path proven to be the root itself or a descendant of it.
///
/// Only produced by [`confine`]; both halves are normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath {
    root: PathBuf,
    resolved: PathBuf,
    rendered: String,
}

impl ConfinedPath {
    fn new(root: PathBuf, resolved: PathBuf) -> Result<Self, PathError> {
        let rendered = resolved
            .to_str()
            .ok_or_else(|| {
                PathError::invalid(&resolved.to_string_lossy(), PathRejection::Unresolvable)
            })?
            .to_string();
        Ok(Self {
            root,
            resolved,
            rendered,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    /// The part below the root; empty when this is the root itself.
    pub fn relative(&self) -> &Path {
        self.resolved
            .strip_prefix(&self.root)
            .unwrap_or_else(|_| Path::new(""))
    }

    pub fn is_root(&self) -> bool {
        self.resolved == self.root
    }

    /// The resolved path as stored in caches and handed to the object store.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// Re-checks containment.
    pub fn verify(&self) -> Result<(), PathError> {
        ensure_within(&self.root, &self.resolved)
    }
}

impl fmt::Display for ConfinedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// Fails unless `candidate` is `root` or below it. Both must be normalized.
pub fn ensure_within(root: &Path, candidate: &Path) -> Result<(), PathError> {
    if is_within(root, candidate) {
        Ok(())
    } else {
        Err(PathError::OutsideRoot {
            root: root.to_string_lossy().into_owned(),
            path: candidate.to_string_lossy().into_owned(),
        })
    }
}

/// Resolves `relative` below `principal_root`.
///
/// Blank `relative` yields the root. A single leading `/` is tolerated and
/// stripped, repeatedly, so absolute-looking input still lands under the root.
pub fn confine(principal_root: &str, relative: &str) -> Result<ConfinedPath, PathError> {
    let root = normalize(Path::new(principal_root))
        .map_err(|reason| PathError::invalid(principal_root, reason))?;

    if root.as_os_str().is_empty() || has_parent_component(&root) {
        return Err(PathError::invalid(principal_root, PathRejection::EscapesRoot));
    }

    resolve_within(root, relative)
}

fn resolve_within(root: PathBuf, relative: &str) -> Result<ConfinedPath, PathError> {
    if relative.trim().is_empty() {
        return ConfinedPath::new(root.clone(), root);
    }

    if let Some(stripped) = relative.strip_prefix('/') {
        return resolve_within(root, stripped);
    }

    let resolved =
        normalize(&root.join(relative)).map_err(|reason| PathError::invalid(relative, reason))?;
    ensure_within(&root, &resolved)?;

    ConfinedPath::new(root, resolved)
}
