//! Error codes and exit status for tallyctl

/// Exit code when the daemon returns a body that does not parse
pub const EXIT_INVALID_RESPONSE: i32 = 65;

/// Exit code when the daemon is unavailable/unreachable
pub const EXIT_DAEMON_UNAVAILABLE: i32 = 70;

/// Exit code for success
pub const EXIT_SUCCESS: i32 = 0;

/// Exit code for general errors
pub const EXIT_GENERAL_ERROR: i32 = 1;
