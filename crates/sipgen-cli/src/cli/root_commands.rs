use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Generate `.sip` files from headers.
    Generate(GenerateArgs),
    /// Load and compile a rule table, then list its rules.
    CheckRules(CheckRulesArgs),
    /// Print the normalized declaration tree of a header as JSON.
    DumpAst(DumpAstArgs),
}

#[derive(Clone, Debug, Args)]
pub struct GenerateArgs {
    /// Headers or directories of headers. With `--json-ast`, tree dumps.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Rule table (repeatable; earlier files win ties)
    #[arg(long)]
    pub rules: Vec<PathBuf>,

    /// Write one `.sip` per header here instead of stdout
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Directory prepended to header names in `#include` lines
    #[arg(long)]
    pub include_prefix: Option<String>,

    /// Inputs are JSON declaration trees, not headers
    #[arg(long)]
    pub json_ast: bool,

    /// Load the built-in Qt rules
    #[arg(long, overrides_with = "no_builtin_rules")]
    builtin_rules: bool,

    /// Skip the built-in Qt rules
    #[arg(long, overrides_with = "builtin_rules")]
    no_builtin_rules: bool,

    /// Emit comments naming the rules that changed or dropped declarations
    #[arg(long)]
    pub trace_rules: bool,

    /// Exit non-zero when any error diagnostic is reported
    #[arg(long)]
    pub fail_on_error: bool,

    /// Spaces per nesting level
    #[arg(long)]
    pub indent: Option<usize>,
}

impl GenerateArgs {
    /// Explicit built-in rule choice, if either flag was given.
    #[must_use]
    pub const fn builtin_rules(&self) -> Option<bool> {
        match (self.builtin_rules, self.no_builtin_rules) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct CheckRulesArgs {
    /// Rule table to check
    pub file: PathBuf,

    /// Append the built-in Qt rules to the listing
    #[arg(long)]
    pub with_builtin: bool,
}

#[derive(Clone, Debug, Args)]
pub struct DumpAstArgs {
    /// Header to parse
    pub header: PathBuf,

    /// Single-line JSON
    #[arg(long)]
    pub compact: bool,
}
