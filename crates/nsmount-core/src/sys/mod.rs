//! System-call seam for the secure filesystem primitives.
//!
//! Every primitive is generic over [`SysOps`] so that the exact sequence of
//! calls, the handles held at any moment, and rare kernel conditions such
//! as `EROFS` can be exercised without privileges. [`HostSys`] is the real
//! implementation backed by `nix`.
//!
//! Handles are released by dropping them.

#[cfg(test)]
pub(crate) mod mock;

use std::ffi::OsStr;
use std::fmt;
use std::os::fd::OwnedFd;
use std::path::Path;

use nix::fcntl::{AtFlags, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::{Gid, Uid};

/// Type of a filesystem entry, as seen without following a trailing symlink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A directory.
    Directory,
    /// A regular file.
    RegularFile,
    /// A symbolic link.
    Symlink,
    /// Anything else: devices, sockets, FIFOs.
    Other,
}

impl FileKind {
    /// Classifies a raw `st_mode` value.
    #[must_use]
    pub const fn from_mode(mode: libc::mode_t) -> Self {
        match mode & libc::S_IFMT {
            libc::S_IFDIR => Self::Directory,
            libc::S_IFREG => Self::RegularFile,
            libc::S_IFLNK => Self::Symlink,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => write!(f, "directory"),
            Self::RegularFile => write!(f, "regular file"),
            Self::Symlink => write!(f, "symlink"),
            Self::Other => write!(f, "special file"),
        }
    }
}

/// The system calls used by the walker.
///
/// All operations except [`SysOps::open`] and [`SysOps::lstat`] are relative
/// to an already-open directory handle and never resolve a path string
/// from the root again.
pub trait SysOps {
    /// An owned, open file descriptor. Dropping it closes it.
    type Fd: fmt::Debug;

    /// `open(2)` on an absolute path.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn open(&self, path: &Path, flags: OFlag) -> nix::Result<Self::Fd>;

    /// `openat(2)` relative to `dir`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn openat(&self, dir: &Self::Fd, name: &OsStr, flags: OFlag, mode: Mode)
    -> nix::Result<Self::Fd>;

    /// `mkdirat(2)` relative to `dir`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn mkdirat(&self, dir: &Self::Fd, name: &OsStr, mode: Mode) -> nix::Result<()>;

    /// `fchown(2)` on an open descriptor; `None` leaves that id unchanged.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn fchown(&self, fd: &Self::Fd, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()>;

    /// `symlinkat(2)`: creates `name` inside `dir` pointing at `target`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn symlinkat(&self, target: &Path, dir: &Self::Fd, name: &OsStr) -> nix::Result<()>;

    /// `fchownat(2)` with `AT_SYMLINK_NOFOLLOW`.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn lchownat(
        &self,
        dir: &Self::Fd,
        name: &OsStr,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> nix::Result<()>;

    /// `fstat(2)` reduced to the entry type.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn fstat_kind(&self, fd: &Self::Fd) -> nix::Result<FileKind>;

    /// `lstat(2)` reduced to the entry type.
    ///
    /// # Errors
    ///
    /// Returns the errno reported by the kernel.
    fn lstat(&self, path: &Path) -> nix::Result<FileKind>;
}

/// [`SysOps`] backed by the running kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostSys;

impl SysOps for HostSys {
    type Fd = OwnedFd;

    fn open(&self, path: &Path, flags: OFlag) -> nix::Result<OwnedFd> {
        nix::fcntl::open(path, flags, Mode::empty())
    }

    fn openat(&self, dir: &OwnedFd, name: &OsStr, flags: OFlag, mode: Mode) -> nix::Result<OwnedFd> {
        nix::fcntl::openat(dir, name, flags, mode)
    }

    fn mkdirat(&self, dir: &OwnedFd, name: &OsStr, mode: Mode) -> nix::Result<()> {
        nix::sys::stat::mkdirat(dir, name, mode)
    }

    fn fchown(&self, fd: &OwnedFd, uid: Option<u32>, gid: Option<u32>) -> nix::Result<()> {
        nix::unistd::fchown(fd, uid.map(Uid::from_raw), gid.map(Gid::from_raw))
    }

    fn symlinkat(&self, target: &Path, dir: &OwnedFd, name: &OsStr) -> nix::Result<()> {
        nix::unistd::symlinkat(target, dir, name)
    }

    fn lchownat(
        &self,
        dir: &OwnedFd,
        name: &OsStr,
        uid: Option<u32>,
        gid: Option<u32>,
    ) -> nix::Result<()> {
        nix::unistd::fchownat(
            dir,
            name,
            uid.map(Uid::from_raw),
            gid.map(Gid::from_raw),
            AtFlags::AT_SYMLINK_NOFOLLOW,
        )
    }

    fn fstat_kind(&self, fd: &OwnedFd) -> nix::Result<FileKind> {
        nix::sys::stat::fstat(fd).map(|st| FileKind::from_mode(st.st_mode))
    }

    fn lstat(&self, path: &Path) -> nix::Result<FileKind> {
        nix::sys::stat::lstat(path).map(|st| FileKind::from_mode(st.st_mode))
    }
}
