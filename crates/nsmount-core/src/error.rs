//! Errors raised while constructing paths and preparing mount points.
//!
//! [`MkdirError::ReadOnlyFs`] is not a plain failure: it tells the caller
//! where a writable layer must be placed before the operation is retried.

use std::ffi::OsString;
use std::path::PathBuf;

use nix::errno::Errno;
use nsmount_common::error::NsMountError;
use thiserror::Error;

/// Error type for the secure filesystem primitives.
#[derive(Debug, Error)]
pub enum MkdirError {
    /// The requested path is not absolute. Raised before any system call.
    #[error("cannot create directory with relative path: {path:?}")]
    RelativePath {
        /// The offending path.
        path: PathBuf,
    },

    /// The mount-point configuration failed validation. Raised before any
    /// system call.
    #[error("cannot prepare mount points: {source}")]
    Config {
        /// Validation failure.
        #[from]
        source: NsMountError,
    },

    /// A segment index does not address any segment of the path.
    #[error("segment index {index} out of range for {len} segments")]
    SegmentIndex {
        /// Requested index.
        index: usize,
        /// Number of segments available.
        len: usize,
    },

    /// Creation hit a read-only filesystem.
    #[error("cannot operate on read-only filesystem at {}", .path.display())]
    ReadOnlyFs {
        /// Deepest directory reached; a writable layer is needed here.
        path: PathBuf,
    },

    /// The filesystem root could not be opened.
    #[error("cannot open root directory: {source}")]
    OpenRoot {
        /// Underlying errno.
        source: Errno,
    },

    /// `mkdirat(2)` failed with something other than `EEXIST` or `EROFS`.
    #[error("cannot mkdir path segment {segment:?}: {source}")]
    Mkdir {
        /// Segment being created.
        segment: OsString,
        /// Directory the segment was created in.
        reached: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// A segment could not be opened as a directory without following symlinks.
    #[error("cannot open path segment {segment:?} (got up to {reached:?}): {source}")]
    Open {
        /// Segment being opened.
        segment: OsString,
        /// Directory the segment was opened from.
        reached: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// A newly created entry could not be handed to its owner.
    #[error("cannot chown path segment {segment:?} to {uid}.{gid} (got up to {reached:?}): {source}")]
    Chown {
        /// Segment that was created.
        segment: OsString,
        /// Requested uid, `-1` for unchanged.
        uid: i64,
        /// Requested gid, `-1` for unchanged.
        gid: i64,
        /// Directory holding the segment.
        reached: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// A regular file could not be created.
    #[error("cannot create file {segment:?} (got up to {reached:?}): {source}")]
    CreateFile {
        /// Leaf name of the file.
        segment: OsString,
        /// Directory the file was created in.
        reached: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// A symbolic link could not be created.
    #[error("cannot create symlink {segment:?} (got up to {reached:?}): {source}")]
    Symlink {
        /// Leaf name of the link.
        segment: OsString,
        /// Directory the link was created in.
        reached: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// `lstat(2)` on a mount point failed for a reason other than absence.
    #[error("cannot inspect {path:?}: {source}")]
    Inspect {
        /// Inspected path.
        path: PathBuf,
        /// Underlying errno.
        source: Errno,
    },

    /// An existing entry is not a directory.
    #[error("cannot use {path:?} for mounting, not a directory")]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// An existing entry is not a regular file.
    #[error("cannot use {path:?} for mounting, not a regular file")]
    NotAFile {
        /// Offending path.
        path: PathBuf,
    },
}

impl MkdirError {
    /// Returns the prefix that needs a writable layer, if this is a read-only error.
    #[must_use]
    pub fn read_only_path(&self) -> Option<&PathBuf> {
        match self {
            Self::ReadOnlyFs { path } => Some(path),
            _ => None,
        }
    }

    /// Returns `true` for [`MkdirError::ReadOnlyFs`].
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        matches!(self, Self::ReadOnlyFs { .. })
    }

    /// Returns the underlying errno, when a system call failed.
    #[must_use]
    pub const fn errno(&self) -> Option<Errno> {
        match self {
            Self::OpenRoot { source }
            | Self::Mkdir { source, .. }
            | Self::Open { source, .. }
            | Self::Chown { source, .. }
            | Self::CreateFile { source, .. }
            | Self::Symlink { source, .. }
            | Self::Inspect { source, .. } => Some(*source),
            Self::RelativePath { .. }
            | Self::Config { .. }
            | Self::SegmentIndex { .. }
            | Self::ReadOnlyFs { .. }
            | Self::NotADirectory { .. }
            | Self::NotAFile { .. } => None,
        }
    }
}

/// Convenience alias for this crate.
pub type Result<T> = std::result::Result<T, MkdirError>;
