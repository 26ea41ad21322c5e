//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | CLI usage error (bad args)                           |
//! | 3    | Config unreadable, unparsable or invalid             |
//! | 4    | Catalog unreadable or without usable products        |
//! | 5    | Checkpoint missing, unreadable or not writable       |
//! | 6    | Source / output file I/O failure                     |
//!
//! Rejected rows and unmatched records are results, not errors: they never
//! change the exit code.

use skumatch_recon::MatchError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments. Clap exits with this code on its own.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, not valid TOML, or failed validation.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Catalog file unreadable or produced no usable product.
pub const EXIT_CATALOG: u8 = 4;

/// Checkpoint could not be read or written, or is missing for a command
/// that needs a finished match.
pub const EXIT_CHECKPOINT: u8 = 5;

/// Reading a source file or writing an output file failed.
pub const EXIT_IO: u8 = 6;

/// Map an engine error to its exit code.
pub fn match_exit_code(err: &MatchError) -> u8 {
    match err {
        MatchError::ConfigParse(_) | MatchError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        MatchError::CatalogLoad(_) => EXIT_CATALOG,
        MatchError::Checkpoint { .. } => EXIT_CHECKPOINT,
        MatchError::Io(_) | MatchError::Sink(_) => EXIT_IO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_INVALID_CONFIG,
            EXIT_CATALOG,
            EXIT_CHECKPOINT,
            EXIT_IO,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        assert_eq!(match_exit_code(&MatchError::ConfigParse("x".into())), EXIT_INVALID_CONFIG);
        assert_eq!(match_exit_code(&MatchError::CatalogLoad("x".into())), EXIT_CATALOG);
        assert_eq!(
            match_exit_code(&MatchError::Checkpoint {
                key: "incoming".into(),
                message: "x".into()
            }),
            EXIT_CHECKPOINT
        );
        assert_eq!(match_exit_code(&MatchError::Sink("x".into())), EXIT_IO);
    }
}
