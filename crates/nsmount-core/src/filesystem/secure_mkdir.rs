//! Directory construction that never follows a symbolic link.
//!
//! The three layers build on each other: [`secure_mkdir`] handles a single
//! segment relative to an open parent, [`secure_mk_prefix`] walks every
//! segment but the last from `/`, and [`secure_mkdir_all`] is the secure
//! counterpart of `std::fs::create_dir_all`.

use std::ffi::OsStr;
use std::path::Path;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use nsmount_common::constants::ROOT_DIR;
use nsmount_common::types::Ownership;

use crate::error::{MkdirError, Result};
use crate::filesystem::segments::{absolute_segments, reached_path};
use crate::sys::SysOps;

/// Flags for every directory open: refuse symlinks, require a directory,
/// and do not leak the descriptor across `execve(2)`.
pub const DIR_OPEN_FLAGS: OFlag = OFlag::O_NOFOLLOW
    .union(OFlag::O_CLOEXEC)
    .union(OFlag::O_DIRECTORY);

/// Creates and opens the `index`-th segment of `segments` inside `parent`.
///
/// An already existing segment is reused and its ownership left alone; a
/// newly created one is handed to `ownership.uid`/`ownership.gid`. The
/// segment is re-opened by name with `O_NOFOLLOW`, so a symlink planted
/// between `mkdirat(2)` and `openat(2)` makes the call fail.
///
/// # Errors
///
/// - [`MkdirError::ReadOnlyFs`] carrying the parent path on `EROFS`.
/// - [`MkdirError::Mkdir`], [`MkdirError::Open`] or [`MkdirError::Chown`]
///   for any other failure. A handle opened before a failed chown is
///   closed before returning.
/// - [`MkdirError::SegmentIndex`] if `index` does not address a segment;
///   no system call is made.
pub fn secure_mkdir<S: SysOps>(
    sys: &S,
    parent: &S::Fd,
    segments: &[&OsStr],
    index: usize,
    ownership: &Ownership,
) -> Result<S::Fd> {
    let segment = *segments.get(index).ok_or(MkdirError::SegmentIndex {
        index,
        len: segments.len(),
    })?;
    tracing::debug!(
        parent = ?parent,
        segment = ?segment,
        index,
        ownership = %ownership,
        "secure-mk-dir"
    );

    let mode = Mode::from_bits_truncate(ownership.mode);
    let made = match sys.mkdirat(parent, segment, mode) {
        Ok(()) => true,
        Err(Errno::EEXIST) => {
            tracing::trace!(segment = ?segment, "segment already exists, reusing it");
            false
        }
        Err(Errno::EROFS) => {
            let path = reached_path(segments, index);
            tracing::debug!(path = %path.display(), "read-only filesystem reached");
            return Err(MkdirError::ReadOnlyFs { path });
        }
        Err(source) => {
            return Err(MkdirError::Mkdir {
                segment: segment.to_os_string(),
                reached: reached_path(segments, index),
                source,
            });
        }
    };

    let fd = sys
        .openat(parent, segment, DIR_OPEN_FLAGS, Mode::empty())
        .map_err(|source| MkdirError::Open {
            segment: segment.to_os_string(),
            reached: reached_path(segments, index),
            source,
        })?;

    if made {
        // `fd` is dropped on the error path, the caller never sees it.
        sys.fchown(&fd, ownership.uid, ownership.gid)
            .map_err(|source| MkdirError::Chown {
                segment: segment.to_os_string(),
                uid: ownership.raw_uid(),
                gid: ownership.raw_gid(),
                reached: reached_path(segments, index),
                source,
            })?;
    }

    tracing::debug!(segment = ?segment, fd = ?fd, made, "secure-mk-dir done");
    Ok(fd)
}

/// Creates every segment but the last and returns a handle to the deepest one.
///
/// The walk starts from `/`. Each intermediate handle is closed as soon as
/// the next one is open, so at most two handles exist at any time. With
/// zero or one segments the handle to `/` itself is returned.
///
/// # Errors
///
/// Returns [`MkdirError::OpenRoot`] if `/` cannot be opened, or the first
/// error from [`secure_mkdir`].
pub fn secure_mk_prefix<S: SysOps>(
    sys: &S,
    segments: &[&OsStr],
    ownership: &Ownership,
) -> Result<S::Fd> {
    tracing::debug!(segments = ?segments, ownership = %ownership, "secure-mk-prefix");

    let mut fd = sys
        .open(Path::new(ROOT_DIR), DIR_OPEN_FLAGS)
        .map_err(|source| MkdirError::OpenRoot { source })?;

    let prefix_len = segments.len().saturating_sub(1);
    for index in 0..prefix_len {
        // The previous handle is released once the deeper one is open.
        fd = secure_mkdir(sys, &fd, segments, index, ownership)?;
    }

    tracing::debug!(segments = ?segments, fd = ?fd, "secure-mk-prefix done");
    Ok(fd)
}

/// Secure variant of `create_dir_all`: creates every missing directory of
/// `path` without following any symbolic link.
///
/// Only `EEXIST` is absorbed. Every other error aborts the walk and nothing
/// already created is removed. Newly created directories get `ownership`;
/// pre-existing ones keep their owner and mode. All handles are closed
/// before returning.
///
/// # Errors
///
/// - [`MkdirError::RelativePath`] before any system call if `path` is not
///   absolute.
/// - [`MkdirError::ReadOnlyFs`] with the deepest reached directory.
/// - Any other [`MkdirError`] raised along the walk.
pub fn secure_mkdir_all<S: SysOps>(sys: &S, path: &Path, ownership: &Ownership) -> Result<()> {
    tracing::debug!(path = %path.display(), ownership = %ownership, "secure-mkdir-all");

    let segments = absolute_segments(path)?;
    let parent = secure_mk_prefix(sys, &segments, ownership)?;
    if let Some(last) = segments.len().checked_sub(1) {
        let leaf = secure_mkdir(sys, &parent, &segments, last, ownership)?;
        drop(leaf);
    }
    drop(parent);
    Ok(())
}
