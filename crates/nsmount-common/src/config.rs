//! Mount-point preparation settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DIR_MODE, MAX_MODE, OWNER_UNCHANGED};
use crate::error::{NsMountError, Result};
use crate::types::Ownership;

/// Describes which mount points to prepare and who owns what gets created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountPointConfig {
    /// Permission mode for created directories.
    pub mode: u32,
    /// Owner uid for created directories, `-1` to leave unchanged.
    pub uid: i64,
    /// Owner gid for created directories, `-1` to leave unchanged.
    pub gid: i64,
    /// Absolute mount-point paths, prepared in order.
    pub mount_points: Vec<PathBuf>,
}

impl Default for MountPointConfig {
    fn default() -> Self {
        Self {
            mode: DEFAULT_DIR_MODE,
            uid: OWNER_UNCHANGED,
            gid: OWNER_UNCHANGED,
            mount_points: Vec::new(),
        }
    }
}

impl MountPointConfig {
    /// Parses and validates a configuration from JSON text.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for this model or if
    /// validation fails.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| NsMountError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks mode bounds, id ranges, and that every mount point is absolute.
    ///
    /// # Errors
    ///
    /// Returns [`NsMountError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.mode > MAX_MODE {
            return Err(NsMountError::Config {
                message: format!("mode {:#o} exceeds {MAX_MODE:#o}", self.mode),
            });
        }
        let _ = self.ownership()?;
        if let Some(path) = self.mount_points.iter().find(|p| !p.is_absolute()) {
            return Err(NsMountError::Config {
                message: format!("mount point {} is not absolute", path.display()),
            });
        }
        Ok(())
    }

    /// Returns the ownership triple applied to created entries.
    ///
    /// # Errors
    ///
    /// Returns [`NsMountError::Config`] if `uid` or `gid` is neither
    /// `-1` nor a valid id.
    pub fn ownership(&self) -> Result<Ownership> {
        Ownership::from_raw(self.mode, self.uid, self.gid).ok_or_else(|| NsMountError::Config {
            message: format!(
                "owner {}.{} is neither a valid id nor {OWNER_UNCHANGED}",
                self.uid, self.gid
            ),
        })
    }
}
