//! Header detection and the parse entry points.

use std::path::Path;

use ast_grep_language::SupportLang;
use sipgen_model::{AstNode, NodeKind};
use tracing::{debug, warn};

use crate::convert::Converter;
use crate::error::ParserError;
use crate::masking::MaskedSource;

/// Whether `path` has a C++ header extension.
#[must_use]
pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "h" | "hh" | "hpp" | "hxx" | "h++"))
}

/// Parse header source text into a `translation_unit` declaration tree.
///
/// Syntax errors are tolerated: unparseable regions become `unexposed` nodes.
/// Fails only when nothing in a non-empty header could be recognized.
///
/// # Errors
///
/// Returns [`ParserError::ParseFailed`] when the source yields no declarations
/// at all because of syntax errors.
pub fn parse_header(source: &str) -> Result<AstNode, ParserError> {
    use ast_grep_language::LanguageExt;

    let masked = MaskedSource::new(source);
    debug!(macros = masked.macros().len(), "masked annotation macros");

    let tree = SupportLang::Cpp.ast_grep(masked.text());
    let root = tree.root();
    if root.kind().as_ref() != "translation_unit" {
        return Err(ParserError::ParseFailed {
            path: "<source>".to_string(),
            message: format!("unexpected root node `{}`", root.kind()),
        });
    }

    let mut converter = Converter::new(&masked);
    let unit = converter.translation_unit(&root);
    let errors = converter.syntax_errors();
    if errors > 0 {
        warn!(errors, "header contains syntax errors");
        if unit.children.iter().all(|c| c.kind == NodeKind::Unexposed) {
            return Err(ParserError::ParseFailed {
                path: "<source>".to_string(),
                message: format!("no declarations recognized ({errors} syntax errors)"),
            });
        }
    }
    Ok(unit)
}

/// Read and parse a header file.
///
/// # Errors
///
/// Returns [`ParserError::UnsupportedFile`] for non-header extensions,
/// [`ParserError::Read`] when the file cannot be read, and
/// [`ParserError::ParseFailed`] as [`parse_header`] does.
pub fn parse_file(path: &Path) -> Result<AstNode, ParserError> {
    if !is_header(path) {
        return Err(ParserError::UnsupportedFile(path.to_path_buf()));
    }
    let source = std::fs::read_to_string(path).map_err(|source| ParserError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_header(&source).map_err(|err| match err {
        ParserError::ParseFailed { message, .. } => ParserError::ParseFailed {
            path: path.display().to_string(),
            message,
        },
        other => other,
    })
}
