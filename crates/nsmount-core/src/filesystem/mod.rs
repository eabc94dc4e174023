//! Symlink-refusing filesystem construction for mount namespaces.
//!
//! Paths are resolved exactly once, from `/`, one segment at a time. Every
//! later operation is performed relative to an open directory handle that
//! was obtained with `O_NOFOLLOW | O_DIRECTORY`, so a symlink swapped into
//! the path by a concurrent, less privileged process makes the walk fail
//! instead of escaping.
//!
//! Failures are never rolled back: directories created before the failing
//! segment stay in place.

pub mod mount_point;
pub mod secure_mkdir;
pub mod secure_mkfile;
pub mod segments;
