//! Directory primitives the factory is built on.
//!
//! - `make_dir_all` creates a directory and its missing ancestors, reporting
//!   the first component it actually created so the caller can own it.
//! - `remove_dir_all` recursively deletes a directory and treats a missing
//!   path as already deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Create `path` and any missing ancestors.
///
/// Returns the outermost directory that did not exist before the call, or
/// `None` when `path` already existed. The leaf is created with
/// `create_dir`, so two callers racing on the same name cannot both observe
/// `Some`.
pub fn make_dir_all(path: &Path) -> io::Result<Option<PathBuf>> {
    let mut first_missing = None;
    for ancestor in path.ancestors() {
        if ancestor.as_os_str().is_empty() || ancestor.exists() {
            break;
        }
        first_missing = Some(ancestor);
    }

    let Some(first_missing) = first_missing else {
        return Ok(None);
    };

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    match fs::create_dir(path) {
        Ok(()) => Ok(Some(first_missing.to_path_buf())),
        // Lost a race for the leaf. Any ancestors we made are left in place.
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(e),
    }
}

/// Recursively delete `path`. Succeeds if it does not exist.
pub fn remove_dir_all(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_dir_all_reports_first_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a").join("b").join("c");

        let made = make_dir_all(&target).unwrap();
        assert_eq!(made, Some(tmp.path().join("a")));
        assert!(target.is_dir());
    }

    #[test]
    fn test_make_dir_all_existing_returns_none() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("x");
        fs::create_dir(&target).unwrap();

        assert_eq!(make_dir_all(&target).unwrap(), None);
        assert_eq!(make_dir_all(tmp.path()).unwrap(), None);
    }

    #[test]
    fn test_make_dir_all_only_leaf_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("leaf");
        assert_eq!(make_dir_all(&target).unwrap(), Some(target.clone()));
    }

    #[test]
    fn test_make_dir_all_under_file_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "x").unwrap();

        assert!(make_dir_all(&file.join("sub")).is_err());
    }

    #[test]
    fn test_remove_dir_all_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("gone");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(dir.join("nested").join("f"), "data").unwrap();

        remove_dir_all(&dir).unwrap();
        assert!(!dir.exists());
        remove_dir_all(&dir).unwrap();
    }
}
