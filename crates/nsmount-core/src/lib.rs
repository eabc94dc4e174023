//! # nsmount-core
//!
//! Privilege-safe path construction for a helper that prepares per-process
//! mount namespaces before bind-mounting content into them.
//!
//! The namespace being modified may be partially controlled by the program
//! being sandboxed, so this crate:
//! - **Never follows a symlink**: every segment is opened with
//!   `O_NOFOLLOW | O_DIRECTORY` relative to its already-open parent.
//! - **Owns only what it creates**: ownership is applied to new entries
//!   only; existing ones keep their owner and mode.
//! - **Surfaces read-only filesystems structurally** through
//!   [`MkdirError::ReadOnlyFs`], so the caller can place a writable layer
//!   at the reported path and retry.
//! - **Never rolls back**: partially created prefixes are left in place.
//!
//! System calls go through the [`SysOps`] trait; [`HostSys`] is the real
//! implementation.

pub mod error;
pub mod filesystem;
pub mod sys;

pub use error::{MkdirError, Result};
pub use filesystem::mount_point::{
    ensure_file_mount_point, ensure_mount_point, prepare_mount_points,
};
pub use filesystem::secure_mkdir::{secure_mk_prefix, secure_mkdir, secure_mkdir_all};
pub use filesystem::secure_mkfile::{secure_mkfile, secure_mksymlink};
pub use sys::{FileKind, HostSys, SysOps};
