//! # sipgen-parser
//!
//! ast-grep/tree-sitter front end for sipgen.
//!
//! Turns C++ header text into the normalized declaration tree
//! ([`sipgen_model::AstNode`]) that the model builder consumes:
//! - **Masking**: export, deprecation, and Qt statement macros are blanked
//!   before parsing so tree-sitter sees plain C++; byte offsets are preserved.
//! - **Conversion**: the syntax tree is walked scope by scope; masked
//!   annotations come back as `attribute` children, statement macros as
//!   `unexposed` nodes.
//!
//! Preprocessor conditionals follow their first branch. Includes and macro
//! definitions are not expanded.

mod convert;
pub mod error;
pub mod masking;
mod parser;

pub use error::ParserError;
pub use masking::{MacroRole, MaskedMacro, MaskedSource};
pub use parser::{is_header, parse_file, parse_header};
