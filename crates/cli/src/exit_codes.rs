//! CLI Exit Code Registry
//!
//! Single source of truth for `tvlineup` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success (possibly with per-provider warnings)             |
//! | 1    | General error (unspecified)                               |
//! | 2    | Usage error (bad arguments, unknown provider, no source)  |
//! | 3    | Alias table or settings could not be loaded               |
//! | 4    | Output could not be written; previous output untouched    |
//! | 5    | Every selected provider failed, nothing to write          |

/// Success - command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Alias source missing/unparseable, or a strict settings load failed.
pub const EXIT_CONFIG: u8 = 3;

/// Writer failed (file locked, disk full, ...).
pub const EXIT_PERSISTENCE: u8 = 4;

/// No selected provider produced usable data.
pub const EXIT_NO_DATA: u8 = 5;
