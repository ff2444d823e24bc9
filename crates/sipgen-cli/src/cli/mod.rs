use std::path::PathBuf;

use clap::Parser;

pub mod global;
pub mod root_commands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `sipgen` binary.
#[derive(Debug, Parser)]
#[command(
    name = "sipgen",
    version,
    about = "Generate SIP binding descriptors from C++ headers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Diagnostics format: text, json
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Config file merged above `.sipgen/config.toml`
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging, rule traces)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            config: self.config.clone(),
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_all_flags() {
        let cli = Cli::try_parse_from([
            "sipgen",
            "generate",
            "widget.h",
            "button.h",
            "--rules",
            "qt.toml",
            "--rules",
            "local.toml",
            "--out-dir",
            "sip",
            "--include-prefix",
            "KWidgets",
            "--trace-rules",
            "--fail-on-error",
            "--no-builtin-rules",
        ])
        .expect("cli should parse");

        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(
            args.inputs,
            vec![PathBuf::from("widget.h"), PathBuf::from("button.h")]
        );
        assert_eq!(
            args.rules,
            vec![PathBuf::from("qt.toml"), PathBuf::from("local.toml")]
        );
        assert_eq!(args.out_dir, Some(PathBuf::from("sip")));
        assert_eq!(args.include_prefix.as_deref(), Some("KWidgets"));
        assert!(args.trace_rules);
        assert!(args.fail_on_error);
        assert_eq!(args.builtin_rules(), Some(false));
        assert!(!args.json_ast);
    }

    #[test]
    fn last_builtin_flag_wins() {
        let cli = Cli::try_parse_from([
            "sipgen",
            "generate",
            "widget.h",
            "--no-builtin-rules",
            "--builtin-rules",
        ])
        .expect("cli should parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.builtin_rules(), Some(true));
    }

    #[test]
    fn builtin_flag_defaults_to_config() {
        let cli = Cli::try_parse_from(["sipgen", "generate", "widget.h"]).expect("cli should parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.builtin_rules(), None);
    }

    #[test]
    fn generate_requires_an_input() {
        assert!(Cli::try_parse_from(["sipgen", "generate"]).is_err());
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["sipgen", "check-rules", "rules.toml", "--format", "json", "-q"])
            .expect("cli should parse");
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.quiet);
        assert!(matches!(cli.command, Commands::CheckRules(_)));
    }

    #[test]
    fn dump_ast_takes_one_header() {
        let cli = Cli::try_parse_from(["sipgen", "--verbose", "dump-ast", "widget.h"])
            .expect("cli should parse");
        assert!(cli.verbose);
        let Commands::DumpAst(args) = cli.command else {
            panic!("expected dump-ast");
        };
        assert_eq!(args.header, PathBuf::from("widget.h"));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        assert!(Cli::try_parse_from(["sipgen", "--format", "xml", "dump-ast", "a.h"]).is_err());
    }
}
