//! System-wide constants and defaults.

/// The filesystem root every absolute walk starts from.
pub const ROOT_DIR: &str = "/";

/// Default permission mode for directories created by the walker.
pub const DEFAULT_DIR_MODE: u32 = 0o755;

/// Largest permission mode accepted (permission bits plus setuid, setgid and sticky).
pub const MAX_MODE: u32 = 0o7777;

/// Sentinel uid/gid meaning "leave the owner unchanged".
pub const OWNER_UNCHANGED: i64 = -1;
