//! Parser error types for sipgen-parser.

use std::path::PathBuf;

/// Errors that can occur while turning a header into a declaration tree.
#[derive(Debug, thiserror::Error)]
pub enum ParserError {
    #[error("Parse failed for {path}: {message}")]
    ParseFailed { path: String, message: String },

    #[error("Not a C++ header: {0}")]
    UnsupportedFile(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
