//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                              |
//! |---------|------------|------------------------------------------|
//! | 0       | Universal  | Success                                  |
//! | 1       | Universal  | General error (unspecified)              |
//! | 2       | Universal  | CLI usage error (bad args, missing file) |
//! | 3       | ask        | Query ran and matched nothing            |
//! | 10-19   | ai         | Provider and credential codes            |
//! | 20-29   | pipeline   | Stage failures                           |
//! | 30-39   | database   | Store availability and population        |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use peoplesay_engine::{PipelineError, RetrievalError, TranslationError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing input file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Ask (3)
// =============================================================================

/// The generated query matched no excerpts. Synthesis was skipped.
pub const EXIT_NO_RESULTS: u8 = 3;

// =============================================================================
// AI (10-19)
// =============================================================================

/// AI disabled (provider=none).
pub const EXIT_AI_DISABLED: u8 = 10;

/// AI provider configured but API key missing.
pub const EXIT_AI_MISSING_KEY: u8 = 11;

/// Provider rejected the API key (401/403, or key check failed).
pub const EXIT_AI_KEY_REJECTED: u8 = 12;

// =============================================================================
// Pipeline (20-29)
// =============================================================================

/// Translation stage failed (provider error, timeout, unusable output).
pub const EXIT_TRANSLATION: u8 = 20;

/// Retrieval stage failed, including read-only guard rejections.
pub const EXIT_RETRIEVAL: u8 = 21;

/// Synthesis stage failed, including strict citation failures.
pub const EXIT_SYNTHESIS: u8 = 22;

// =============================================================================
// Database (30-39)
// =============================================================================

/// Database file missing or unreadable.
pub const EXIT_DB_MISSING: u8 = 30;

/// `init-db` could not build the database.
pub const EXIT_DB_POPULATE: u8 = 31;

/// Exit code for a failed pipeline run.
pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Translation(TranslationError::MissingCredential(_)) => EXIT_AI_MISSING_KEY,
        PipelineError::Translation(TranslationError::InvalidCredential(_)) => EXIT_AI_KEY_REJECTED,
        PipelineError::Translation(_) => EXIT_TRANSLATION,
        PipelineError::Retrieval(RetrievalError::Unavailable(_)) => EXIT_DB_MISSING,
        PipelineError::Retrieval(_) => EXIT_RETRIEVAL,
        PipelineError::Synthesis(_) => EXIT_SYNTHESIS,
    }
}
