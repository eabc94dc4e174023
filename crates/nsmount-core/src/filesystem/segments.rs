//! Lexical decomposition of absolute paths.
//!
//! Nothing here touches the filesystem: `..` is resolved by dropping the
//! previous segment, the same way `filepath.Clean`-style normalisation works,
//! so a symlink can never influence how a path is split.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use nsmount_common::constants::ROOT_DIR;

use crate::error::{MkdirError, Result};

/// Splits an absolute path into its cleaned, non-empty segments.
///
/// Repeated separators and `.` are dropped and `..` removes the preceding
/// segment (`..` at the root stays at the root). `/` yields no segments.
///
/// # Errors
///
/// Returns [`MkdirError::RelativePath`] if `path` is not absolute.
pub fn absolute_segments(path: &Path) -> Result<Vec<&OsStr>> {
    if !path.is_absolute() {
        return Err(MkdirError::RelativePath {
            path: path.to_path_buf(),
        });
    }
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => segments.push(name),
            Component::ParentDir => {
                let _ = segments.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Ok(segments)
}

/// Returns the absolute path formed by the first `count` segments.
#[must_use]
pub fn reached_path(segments: &[&OsStr], count: usize) -> PathBuf {
    let mut path = PathBuf::from(ROOT_DIR);
    path.extend(segments.iter().take(count));
    path
}
