//! # sipgen-core
//!
//! Foundational types shared across all sipgen crates:
//! - Access and symbol-visibility enums collapsed from C++ source attributes
//! - The diagnostics channel every pipeline stage reports into
//! - Cross-cutting error types

pub mod diagnostics;
pub mod enums;
pub mod errors;

pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use enums::{Access, DeclAttributes, SymbolVisibility};
pub use errors::CoreError;
