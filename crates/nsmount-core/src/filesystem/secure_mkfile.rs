//! Secure counterparts of `touch` and `ln -s` built on the prefix walker.
//!
//! Both create the parent hierarchy with [`secure_mk_prefix`] and then act
//! on the leaf relative to the returned handle.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nsmount_common::types::Ownership;

use crate::error::{MkdirError, Result};
use crate::filesystem::secure_mkdir::secure_mk_prefix;
use crate::filesystem::segments::{absolute_segments, reached_path};
use crate::sys::{FileKind, SysOps};

/// Flags used to create a new regular file: fail if anything is in the way.
pub const FILE_CREATE_FLAGS: OFlag = OFlag::O_CREAT
    .union(OFlag::O_EXCL)
    .union(OFlag::O_WRONLY)
    .union(OFlag::O_NOFOLLOW)
    .union(OFlag::O_CLOEXEC);

/// Flags used to inspect an existing leaf without following or reading it.
pub const FILE_PROBE_FLAGS: OFlag = OFlag::O_PATH
    .union(OFlag::O_NOFOLLOW)
    .union(OFlag::O_CLOEXEC);

/// Splits `path` and returns the segments together with the leaf index.
///
/// `/` has no leaf and cannot name a file or symlink.
fn leaf_segments(path: &Path) -> Result<(Vec<&OsStr>, usize)> {
    let segments = absolute_segments(path)?;
    match segments.len().checked_sub(1) {
        Some(last) => Ok((segments, last)),
        None => Err(MkdirError::NotAFile {
            path: path.to_path_buf(),
        }),
    }
}

/// Secure variant of `touch`: ensures `path` exists as a regular file.
///
/// Missing parent directories are created like [`secure_mkdir_all`] does.
/// A new file gets `ownership`; an existing regular file is left as is.
///
/// [`secure_mkdir_all`]: crate::filesystem::secure_mkdir::secure_mkdir_all
///
/// # Errors
///
/// - [`MkdirError::RelativePath`] for non-absolute input.
/// - [`MkdirError::ReadOnlyFs`] carrying the deepest reached directory.
/// - [`MkdirError::NotAFile`] if the leaf exists but is not a regular file
///   (including a symlink, which is never followed).
/// - Any other [`MkdirError`] raised along the walk.
pub fn secure_mkfile<S: SysOps>(sys: &S, path: &Path, ownership: &Ownership) -> Result<()> {
    tracing::debug!(path = %path.display(), ownership = %ownership, "secure-mk-file");

    let (segments, last) = leaf_segments(path)?;
    let leaf = segments[last];
    let parent = secure_mk_prefix(sys, &segments, ownership)?;
    let mode = Mode::from_bits_truncate(ownership.mode);

    match sys.openat(&parent, leaf, FILE_CREATE_FLAGS, mode) {
        Ok(fd) => {
            sys.fchown(&fd, ownership.uid, ownership.gid)
                .map_err(|source| MkdirError::Chown {
                    segment: leaf.to_os_string(),
                    uid: ownership.raw_uid(),
                    gid: ownership.raw_gid(),
                    reached: reached_path(&segments, last),
                    source,
                })?;
            tracing::debug!(path = %path.display(), "file created");
            Ok(())
        }
        Err(Errno::EEXIST) => {
            let fd = sys
                .openat(&parent, leaf, FILE_PROBE_FLAGS, Mode::empty())
                .map_err(|source| MkdirError::Open {
                    segment: leaf.to_os_string(),
                    reached: reached_path(&segments, last),
                    source,
                })?;
            let kind = sys.fstat_kind(&fd).map_err(|source| MkdirError::Inspect {
                path: path.to_path_buf(),
                source,
            })?;
            if kind == FileKind::RegularFile {
                Ok(())
            } else {
                tracing::debug!(path = %path.display(), kind = %kind, "existing entry is not a file");
                Err(MkdirError::NotAFile {
                    path: path.to_path_buf(),
                })
            }
        }
        Err(Errno::EROFS) => Err(MkdirError::ReadOnlyFs {
            path: reached_path(&segments, last),
        }),
        Err(source) => Err(MkdirError::CreateFile {
            segment: leaf.to_os_string(),
            reached: reached_path(&segments, last),
            source,
        }),
    }
}

/// Secure variant of `ln -s target path`.
///
/// Missing parent directories are created like [`secure_mkfile`] does. An
/// existing entry at `path` is never replaced. The new link is handed to
/// `ownership` without dereferencing it.
///
/// # Errors
///
/// - [`MkdirError::RelativePath`] for non-absolute input.
/// - [`MkdirError::ReadOnlyFs`] carrying the deepest reached directory.
/// - [`MkdirError::Symlink`] if `symlinkat(2)` fails, including `EEXIST`.
/// - [`MkdirError::Chown`] if the new link cannot be re-owned.
pub fn secure_mksymlink<S: SysOps>(
    sys: &S,
    path: &Path,
    target: &Path,
    ownership: &Ownership,
) -> Result<()> {
    tracing::debug!(
        path = %path.display(),
        target = %target.display(),
        ownership = %ownership,
        "secure-mk-symlink"
    );

    let (segments, last) = leaf_segments(path)?;
    let leaf = segments[last];
    let parent = secure_mk_prefix(sys, &segments, ownership)?;
    let reached = || -> PathBuf { reached_path(&segments, last) };

    match sys.symlinkat(target, &parent, leaf) {
        Ok(()) => {}
        Err(Errno::EROFS) => return Err(MkdirError::ReadOnlyFs { path: reached() }),
        Err(source) => {
            return Err(MkdirError::Symlink {
                segment: leaf.to_os_string(),
                reached: reached(),
                source,
            });
        }
    }

    if !ownership.keeps_owner() {
        sys.lchownat(&parent, leaf, ownership.uid, ownership.gid)
            .map_err(|source| MkdirError::Chown {
                segment: leaf.to_os_string(),
                uid: ownership.raw_uid(),
                gid: ownership.raw_gid(),
                reached: reached(),
                source,
            })?;
    }
    Ok(())
}
