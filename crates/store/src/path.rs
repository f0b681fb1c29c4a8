//! Validation for names that end up on the filesystem.
//!
//! Constituent file names come out of user-supplied archives, so they are
//! treated as hostile until proven otherwise.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Validate a constituent file name for storage under a version directory.
///
/// Relative paths with normal components are allowed (archives legitimately
/// contain subdirectories); absolute paths, parent traversal and empty names
/// are not.
pub fn validate_name(name: &str) -> Result<PathBuf> {
    if name.is_empty() {
        exn::bail!(ErrorKind::InvalidPath(PathBuf::new()));
    }
    let path = Path::new(name);
    for component in path.components() {
        match component {
            Component::Normal(_) => {},
            _ => exn::bail!(ErrorKind::InvalidPath(path.to_path_buf())),
        }
    }
    Ok(path.to_path_buf())
}
