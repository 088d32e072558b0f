//! CLI Exit Code Registry
//!
//! Single source of truth for the exit codes scripts can rely on.
//!
//! | Code | Meaning                                           |
//! |------|---------------------------------------------------|
//! | 0    | Success                                           |
//! | 1    | General error (unspecified)                       |
//! | 2    | Usage error (bad arguments, unparseable values)   |
//! | 3    | Workbook could not be read or written             |
//! | 4    | Target record not found (row out of range, key)   |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, malformed `--set` pairs.
pub const EXIT_USAGE: u8 = 2;

/// Workbook or filesystem failure.
pub const EXIT_IO: u8 = 3;

/// Update/delete target does not exist.
pub const EXIT_NOT_FOUND: u8 = 4;
