//! CLI exit codes.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | The script failed to compile or run       |
//! | 2    | Usage error (bad arguments)               |
//! | 3    | I/O error (script, storage, PNG output)   |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// The script ran and failed. Partial output (PNG) may still have been written.
pub const EXIT_SCRIPT_FAILED: u8 = 1;

/// Usage error - bad arguments, malformed `WxH` / `X,Y` values.
pub const EXIT_USAGE: u8 = 2;

/// Reading the script or writing output failed.
pub const EXIT_IO: u8 = 3;
