//! Cross-cutting error types for sipgen.
//!
//! Stage-specific errors (`ModelError`, `RuleError`, `ParserError`) live in
//! their own crates and converge in `sipgen-cli`.

use thiserror::Error;

/// Errors that can be raised by any sipgen crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A run produced error-level diagnostics and the caller asked to fail on them.
    #[error("{count} error diagnostic(s), first: {first}")]
    DiagnosticErrors { count: usize, first: String },

    /// Data failed validation (names, patterns, attribute values).
    #[error("Validation error: {0}")]
    Validation(String),
}
