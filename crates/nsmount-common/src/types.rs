//! Domain primitive types used across the nsmount workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIR_MODE, OWNER_UNCHANGED};

/// Permission mode and owner applied to filesystem entries the walker creates.
///
/// Entries that already exist are never touched: neither their mode nor
/// their owner is reconciled against this triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ownership {
    /// Permission bits passed to `mkdirat(2)` (subject to the umask).
    pub mode: u32,
    /// Owner to assign, or `None` to keep the creating process's uid.
    pub uid: Option<u32>,
    /// Group to assign, or `None` to keep the creating process's gid.
    pub gid: Option<u32>,
}

impl Ownership {
    /// Creates an ownership triple from explicit parts.
    #[must_use]
    pub const fn new(mode: u32, uid: Option<u32>, gid: Option<u32>) -> Self {
        Self { mode, uid, gid }
    }

    /// Creates an ownership triple that applies `mode` but leaves the owner alone.
    #[must_use]
    pub const fn with_mode(mode: u32) -> Self {
        Self::new(mode, None, None)
    }

    /// Creates an ownership triple from raw numeric ids.
    ///
    /// [`OWNER_UNCHANGED`] (`-1`) maps to "do not change". Returns `None`
    /// if either id is neither the sentinel nor a valid `u32` id.
    #[must_use]
    pub fn from_raw(mode: u32, uid: i64, gid: i64) -> Option<Self> {
        Some(Self::new(mode, raw_id(uid)?, raw_id(gid)?))
    }

    /// Returns the uid in its raw form, using `-1` for "unchanged".
    #[must_use]
    pub fn raw_uid(&self) -> i64 {
        self.uid.map_or(OWNER_UNCHANGED, i64::from)
    }

    /// Returns the gid in its raw form, using `-1` for "unchanged".
    #[must_use]
    pub fn raw_gid(&self) -> i64 {
        self.gid.map_or(OWNER_UNCHANGED, i64::from)
    }

    /// Returns `true` when neither the owner nor the group is to be changed.
    #[must_use]
    pub const fn keeps_owner(&self) -> bool {
        self.uid.is_none() && self.gid.is_none()
    }
}

impl Default for Ownership {
    fn default() -> Self {
        Self::with_mode(DEFAULT_DIR_MODE)
    }
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#o} {}.{}", self.mode, self.raw_uid(), self.raw_gid())
    }
}

/// Outer `None` for an invalid id, inner `None` for the sentinel.
fn raw_id(id: i64) -> Option<Option<u32>> {
    if id == OWNER_UNCHANGED {
        return Some(None);
    }
    u32::try_from(id).ok().map(Some)
}
