//! CLI Exit Code Registry
//!
//! Single source of truth for `stocktally` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad arguments, unknown table)           |
//! | 3    | Configuration file unreadable or invalid             |
//! | 4    | Database cannot be opened or queried                 |
//! | 5    | Import/plan finished but at least one table failed   |
//! | 6    | Invalid date range or classification thresholds      |
//! | 7    | Report export failed                                 |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, table not in `[tables]`.
pub const EXIT_USAGE: u8 = 2;

/// Config file missing (when given explicitly), unparsable or failing validation.
pub const EXIT_CONFIG: u8 = 3;

/// SQLite store cannot be opened, or a read outside reconciliation failed.
pub const EXIT_STORE: u8 = 4;

/// Batch ran to the end but one or more tables reported a failure.
/// Successful tables are committed.
pub const EXIT_PARTIAL_IMPORT: u8 = 5;

/// `abc` date range is empty or reversed, or thresholds are inconsistent.
pub const EXIT_INVALID_RANGE: u8 = 6;

/// Writing the `--export` file failed.
pub const EXIT_EXPORT: u8 = 7;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_STORE,
            EXIT_PARTIAL_IMPORT,
            EXIT_INVALID_RANGE,
            EXIT_EXPORT,
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}
