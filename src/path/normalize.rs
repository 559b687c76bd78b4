//! Lexical path normalization
//!
//! Resolves `.` and `..` components without touching the filesystem.
//! Symlinks are deliberately not followed.

use crate::error::PathRejection;
use std::path::{Component, Path, PathBuf};

/// Normalizes a path component by component.
///
/// `..` pops the previous normal component. At an absolute root it is dropped
/// (`/..` is `/`); at the start of a relative path it is kept, so callers can
/// detect that the path climbed above its starting point.
pub fn normalize(path: &Path) -> Result<PathBuf, PathRejection> {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) => return Err(PathRejection::Unresolvable),
            Component::RootDir => parts.push(component),
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) => {}
                _ => parts.push(component),
            },
            Component::Normal(name) => {
                if name.to_str().is_none_or(|n| n.contains('\0')) {
                    return Err(PathRejection::Unresolvable);
                }
                parts.push(component);
            }
        }
    }

    Ok(parts.iter().collect())
}

/// Returns true if any component is `..`.
pub fn has_parent_component(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Component-wise containment of two already normalized paths.
///
/// `data/420` is not within `data/42`.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    !has_parent_component(candidate) && candidate.starts_with(root)
}
