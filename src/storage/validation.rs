//! Path validation
//!
//! Second containment check at the I/O boundary, independent of the one the
//! confiner already did.

use crate::error::StorageError;
use crate::path::ConfinedPath;
use crate::path::normalize::{is_within, normalize};
use std::path::{Path, PathBuf};

const TEMP_PREFIX: &str = ".upload-";
const TEMP_SUFFIX: &str = ".tmp";

/// Name of the scratch file an upload is written to before the rename.
pub fn temp_file_name(nonce: u64) -> String {
    format!("{}{:016x}{}", TEMP_PREFIX, nonce, TEMP_SUFFIX)
}

/// Whether `name` has the shape of an upload scratch file.
pub fn is_temp_file_name(name: &str) -> bool {
    name.strip_prefix(TEMP_PREFIX)
        .and_then(|rest| rest.strip_suffix(TEMP_SUFFIX))
        .is_some_and(|nonce| nonce.len() == 16 && nonce.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Validate an upload file name: a single non-empty path component that
/// cannot be mistaken for a scratch file.
pub fn validate_file_name(name: &str) -> Result<(), StorageError> {
    if name.trim().is_empty()
        || is_temp_file_name(name)
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(StorageError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

/// Joins `base` and the confined path, refusing anything not strictly below
/// `base`. `base` must already be normalized.
pub fn resolve_under_base(base: &Path, confined: &ConfinedPath) -> Result<PathBuf, StorageError> {
    let outside = || StorageError::OutsideRoot(confined.as_str().to_string());

    confined.verify().map_err(|_| outside())?;

    let real = normalize(&base.join(confined.resolved())).map_err(|_| outside())?;
    if real == base || !is_within(base, &real) {
        return Err(outside());
    }
    Ok(real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::confine;

    #[test]
    fn file_names_must_be_single_components() {
        assert!(validate_file_name("report.pdf").is_ok());
        assert!(validate_file_name("archive.tar.gz").is_ok());
        for bad in ["", "   ", "..", "a/b", "a\\b", "..hidden", "x\0y"] {
            assert!(
                matches!(validate_file_name(bad), Err(StorageError::InvalidFileName(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn scratch_names_are_recognised_and_reserved() {
        let scratch = temp_file_name(0xdead_beef);
        assert_eq!(scratch, ".upload-00000000deadbeef.tmp");
        assert!(is_temp_file_name(&scratch));
        assert!(matches!(
            validate_file_name(&scratch),
            Err(StorageError::InvalidFileName(_))
        ));

        for ordinary in ["report.pdf.tmp", ".upload-notes.tmp", ".upload-123.tmp"] {
            assert!(!is_temp_file_name(ordinary), "{}", ordinary);
            assert!(validate_file_name(ordinary).is_ok(), "{}", ordinary);
        }
    }

    #[test]
    fn resolves_below_base() {
        let confined = confine("42", "docs/report.pdf").unwrap();
        let real = resolve_under_base(Path::new("/srv/share"), &confined).unwrap();
        assert_eq!(real, PathBuf::from("/srv/share/42/docs/report.pdf"));
    }

    #[test]
    fn absolute_principal_root_is_refused() {
        let confined = confine("/etc", "passwd").unwrap();
        assert!(matches!(
            resolve_under_base(Path::new("/srv/share"), &confined),
            Err(StorageError::OutsideRoot(_))
        ));
    }
}
