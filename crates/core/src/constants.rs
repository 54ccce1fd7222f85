/// Constants used throughout the graceful crates
// Exit codes
pub const EXIT_CODE_OK: i32 = 0;
pub const EXIT_CODE_ERR: i32 = 1;

/// Passing this to `exit` picks `EXIT_CODE_OK` or `EXIT_CODE_ERR` from the
/// outcome of the cleanup pass.
pub const EXIT_CODE_AUTO: i32 = -1;

// Environment variable names
pub const GRACEFUL_EXIT_WITH_SIGNAL_CODE_VAR: &str = "GRACEFUL_EXIT_WITH_SIGNAL_CODE";
pub const GRACEFUL_EXIT_CODE_OK_VAR: &str = "GRACEFUL_EXIT_CODE_OK";
pub const GRACEFUL_EXIT_CODE_ERR_VAR: &str = "GRACEFUL_EXIT_CODE_ERR";

// Description used when a panic payload carries no message
pub const ABNORMAL_TERMINATION: &str = "action terminated abnormally";
