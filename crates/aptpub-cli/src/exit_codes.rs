//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Remote error - the aptly service refused a request or could not be reached
pub const REMOTE_ERROR: i32 = 3;

/// Publish error - at least one publication could not be published
pub const PUBLISH_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Configuration error - unreadable or invalid configuration file (EX_CONFIG)
pub const CONFIG_ERROR: i32 = 78;

/// Interrupted by Ctrl-C
pub const INTERRUPTED: i32 = 130;
