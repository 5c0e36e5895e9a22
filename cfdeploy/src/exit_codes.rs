//! Stable exit codes for cfdeploy commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Director, descriptor, deploy, or other runtime failure.
pub const FAILED: i32 = 1;
/// Validation rejected the attributes; nothing was deployed.
pub const INVALID: i32 = 2;
/// Missing or malformed command-line input.
pub const USAGE: i32 = 3;
/// The operator declined a confirmation.
pub const CANCELLED: i32 = 4;
