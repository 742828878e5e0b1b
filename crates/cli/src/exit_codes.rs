//! CLI Exit Code Registry
//!
//! Single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success; the run was fully reconciled               |
//! | 1    | Run completed but unmatched records remain          |
//! | 2    | Usage error (bad args, unknown export column)       |
//! | 3    | Invalid run config (parse or validation failure)    |
//! | 4    | Runtime error (IO, malformed CSV, engine failure)   |

/// Success — run completed and every record paired up.
pub const EXIT_SUCCESS: u8 = 0;

/// Run completed, but unmatched, foreign, duplicate, or skipped
/// records remain. Like `diff(1)`, "completed with differences".
pub const EXIT_UNMATCHED: u8 = 1;

/// Usage error — bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime error — unreadable files, malformed CSV, engine failure.
pub const EXIT_RUNTIME: u8 = 4;
