use std::path::PathBuf;

use clap::ValueEnum;

/// How diagnostics and reports are printed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub config: Option<PathBuf>,
    pub quiet: bool,
    pub verbose: bool,
}
