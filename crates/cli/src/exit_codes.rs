//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Meaning                                                   |
//! |------|-----------------------------------------------------------|
//! | 0    | Success                                                   |
//! | 1    | General error (unspecified)                               |
//! | 2    | CLI usage error (bad args, missing file)                  |
//! | 3    | Stock export or catalog could not be read                 |
//! | 4    | Configured columns missing from an input                  |
//! | 5    | Config file invalid                                       |
//! | 6    | Feed could not be encoded or written                      |
//! | 7    | Delta report failed; the feed was still written           |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into `pipeline_exit_code` or the command's error handling

use stockfeed_cli::pipeline::PipelineError;
use stockfeed_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, unreadable input path.
pub const EXIT_USAGE: u8 = 2;

/// Ingestion failed: unreadable stock export, no data rows, unparsable catalog.
pub const EXIT_INGEST: u8 = 3;

/// A configured source column is missing from the stock export or catalog.
pub const EXIT_SCHEMA: u8 = 4;

/// Config file could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 5;

/// Feed could not be encoded or written to its destination.
pub const EXIT_OUTPUT: u8 = 6;

/// Delta step failed after the primary feed was written.
pub const EXIT_DELTA: u8 = 7;

/// Map a pipeline error to its exit code.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Ingest(_) => EXIT_INGEST,
        PipelineError::Recon(ReconError::Schema { .. }) => EXIT_SCHEMA,
        PipelineError::Recon(ReconError::ConfigParse(_) | ReconError::ConfigValidation(_)) => EXIT_CONFIG,
    }
}
