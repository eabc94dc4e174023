//! Mount-point preparation ahead of bind mounts.
//!
//! Targets are inspected with `lstat(2)` so a symlink planted by the
//! sandboxed program is reported instead of followed. Existing entries are
//! never replaced, unlinked, or re-owned.

use std::path::Path;

use nix::errno::Errno;
use nsmount_common::config::MountPointConfig;
use nsmount_common::types::Ownership;

use crate::error::{MkdirError, Result};
use crate::filesystem::secure_mkdir::secure_mkdir_all;
use crate::filesystem::secure_mkfile::secure_mkfile;
use crate::sys::{FileKind, SysOps};

/// Ensures `path` exists as a directory that can be mounted over.
///
/// A missing path is created with [`secure_mkdir_all`]; an existing
/// directory is accepted untouched.
///
/// # Errors
///
/// - [`MkdirError::RelativePath`] if `path` is not absolute.
/// - [`MkdirError::Inspect`] if `lstat(2)` fails with anything but `ENOENT`.
/// - [`MkdirError::NotADirectory`] if something other than a directory,
///   a symlink included, is already there.
/// - Any error from [`secure_mkdir_all`], notably [`MkdirError::ReadOnlyFs`].
pub fn ensure_mount_point<S: SysOps>(sys: &S, path: &Path, ownership: &Ownership) -> Result<()> {
    match inspect(sys, path)? {
        None => {
            tracing::debug!(path = %path.display(), "mount point missing, creating it");
            secure_mkdir_all(sys, path, ownership)
        }
        Some(FileKind::Directory) => Ok(()),
        Some(kind) => {
            tracing::debug!(path = %path.display(), kind = %kind, "mount point is not a directory");
            Err(MkdirError::NotADirectory {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Ensures `path` exists as a regular file, for bind-mounting single files.
///
/// # Errors
///
/// Same as [`ensure_mount_point`], with [`MkdirError::NotAFile`] in place
/// of [`MkdirError::NotADirectory`] and [`secure_mkfile`] doing the creation.
pub fn ensure_file_mount_point<S: SysOps>(
    sys: &S,
    path: &Path,
    ownership: &Ownership,
) -> Result<()> {
    match inspect(sys, path)? {
        None => {
            tracing::debug!(path = %path.display(), "file mount point missing, creating it");
            secure_mkfile(sys, path, ownership)
        }
        Some(FileKind::RegularFile) => Ok(()),
        Some(kind) => {
            tracing::debug!(path = %path.display(), kind = %kind, "mount point is not a file");
            Err(MkdirError::NotAFile {
                path: path.to_path_buf(),
            })
        }
    }
}

/// Prepares every directory mount point listed in `config`, in order.
///
/// The configuration is validated first, so an unusable owner or a relative
/// path is reported before anything is created. Stops at the first failure;
/// mount points handled before it stay prepared.
///
/// # Errors
///
/// Returns [`MkdirError::Config`] if validation fails, otherwise the first
/// error from [`ensure_mount_point`].
pub fn prepare_mount_points<S: SysOps>(sys: &S, config: &MountPointConfig) -> Result<()> {
    config.validate()?;
    let ownership = config.ownership()?;
    for path in &config.mount_points {
        ensure_mount_point(sys, path, &ownership)?;
    }
    tracing::info!(count = config.mount_points.len(), "mount points prepared");
    Ok(())
}

/// Returns the entry type at `path` without following it, `None` if absent.
fn inspect<S: SysOps>(sys: &S, path: &Path) -> Result<Option<FileKind>> {
    if !path.is_absolute() {
        return Err(MkdirError::RelativePath {
            path: path.to_path_buf(),
        });
    }
    match sys.lstat(path) {
        Ok(kind) => Ok(Some(kind)),
        Err(Errno::ENOENT) => Ok(None),
        Err(source) => Err(MkdirError::Inspect {
            path: path.to_path_buf(),
            source,
        }),
    }
}
