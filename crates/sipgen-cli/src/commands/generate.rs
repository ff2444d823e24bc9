//! `sipgen generate`: headers in, `.sip` files out.
//!
//! Every input runs through its own [`Pipeline`] on the rayon pool; the rule
//! table is built once and shared. Results are collected in input order, so
//! stdout and the report do not depend on scheduling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use sipgen_config::SipgenConfig;
use sipgen_core::Diagnostics;
use sipgen_emit::{EmitOptions, Pipeline, PipelineOutput};
use sipgen_rules::{RuleTable, RuleUsage};
use tracing::{debug, info};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::GenerateArgs;
use crate::commands::load_config;
use crate::inputs;
use crate::output::{self, HeaderReport};

/// Effective settings: command-line flags over configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub rule_files: Vec<PathBuf>,
    pub builtin_rules: bool,
    pub include_prefix: Option<String>,
    pub trace_rules: bool,
    pub fail_on_error: bool,
    pub indent: usize,
    pub out_dir: Option<PathBuf>,
    pub extension: String,
}

impl Settings {
    pub fn resolve(args: &GenerateArgs, config: &SipgenConfig) -> Self {
        let rule_files = if args.rules.is_empty() {
            config.rules.files.clone()
        } else {
            args.rules.clone()
        };
        Self {
            rule_files,
            builtin_rules: args.builtin_rules().unwrap_or(config.generator.builtin_rules),
            include_prefix: args
                .include_prefix
                .clone()
                .or_else(|| config.generator.include_prefix.clone()),
            trace_rules: args.trace_rules || config.generator.trace_rules,
            fail_on_error: args.fail_on_error || config.generator.fail_on_error,
            indent: args.indent.unwrap_or(config.generator.indent),
            out_dir: args.out_dir.clone().or_else(|| config.output.dir.clone()),
            extension: config.output.extension.clone(),
        }
    }

    fn emit_options(&self, header: String) -> EmitOptions {
        EmitOptions {
            header,
            include_prefix: self.include_prefix.clone(),
            trace_rules: self.trace_rules,
            indent: self.indent,
        }
    }

    fn output_path(&self, dir: &Path, input: &Path) -> PathBuf {
        let stem = input.file_stem().unwrap_or(input.as_os_str());
        dir.join(stem).with_extension(&self.extension)
    }

    /// Refuse inputs that would write the same output file.
    fn check_output_collisions(&self, files: &[PathBuf]) -> anyhow::Result<()> {
        let Some(dir) = &self.out_dir else {
            return Ok(());
        };
        let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
        for input in files {
            let output = self.output_path(dir, input);
            if let Some(first) = claimed.insert(output.clone(), input) {
                anyhow::bail!(
                    "{} and {} would both write {}",
                    first.display(),
                    input.display(),
                    output.display()
                );
            }
        }
        Ok(())
    }
}

/// User rule files in order, then the built-ins when enabled.
pub fn load_rules(files: &[PathBuf], builtin: bool) -> anyhow::Result<RuleTable> {
    let mut table = RuleTable::new();
    for file in files {
        let loaded = RuleTable::load(file)
            .with_context(|| format!("invalid rule table {}", file.display()))?;
        table.extend(loaded);
    }
    if builtin {
        table = table.with_builtin().context("failed to compile built-in rules")?;
    }
    debug!(rules = table.len(), builtin, "rule table ready");
    Ok(table)
}

pub fn handle(args: &GenerateArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let config = load_config(flags)?;
    let settings = Settings::resolve(args, &config);
    let table = load_rules(&settings.rule_files, settings.builtin_rules)?;
    let files = inputs::expand(&args.inputs, args.json_ast)?;
    if files.is_empty() {
        anyhow::bail!("no input headers found");
    }
    settings.check_output_collisions(&files)?;

    if let Some(dir) = &settings.out_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let results: Vec<(PathBuf, anyhow::Result<PipelineOutput>)> = files
        .par_iter()
        .map(|path| (path.clone(), generate_one(path, args.json_ast, &table, &settings)))
        .collect();

    let mut usage = RuleUsage::for_table(&table);
    let mut all = Diagnostics::new();
    let mut reports = Vec::with_capacity(results.len());
    let mut failures = 0usize;

    for (path, result) in results {
        let input = path.display().to_string();
        match result {
            Ok(out) => {
                let written = write_output(&settings, &path, &out.text)?;
                usage.merge(&out.usage);
                reports.push(HeaderReport {
                    input,
                    output: written.map(|p| p.display().to_string()),
                    failure: None,
                    diagnostics: out.diagnostics.records().to_vec(),
                });
                all.extend(out.diagnostics);
            }
            Err(error) => {
                failures += 1;
                reports.push(HeaderReport {
                    input,
                    output: None,
                    failure: Some(format!("{error:#}")),
                    diagnostics: Vec::new(),
                });
            }
        }
    }

    usage.report();
    if !flags.quiet || all.has_errors() || failures > 0 {
        output::emit(&reports, flags.format)?;
    }
    info!(
        inputs = reports.len(),
        failures,
        errors = all.count(sipgen_core::Severity::Error),
        warnings = all.count(sipgen_core::Severity::Warning),
        "generation finished"
    );

    if failures > 0 {
        anyhow::bail!("{failures} input(s) failed");
    }
    if settings.fail_on_error {
        all.check()?;
    }
    Ok(())
}

fn generate_one(
    path: &Path,
    json_ast: bool,
    table: &RuleTable,
    settings: &Settings,
) -> anyhow::Result<PipelineOutput> {
    let tree = inputs::load_tree(path, json_ast)?;
    let options = settings.emit_options(inputs::header_name(path, json_ast));
    Pipeline::new(table, options)
        .run(&tree)
        .with_context(|| format!("failed to generate bindings for {}", path.display()))
}

/// Write to the output directory, or stdout without one.
fn write_output(settings: &Settings, input: &Path, text: &str) -> anyhow::Result<Option<PathBuf>> {
    let Some(dir) = &settings.out_dir else {
        print!("{text}");
        return Ok(None);
    };
    let path = settings.output_path(dir, input);
    std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote sip file");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use crate::cli::{Cli, Commands};

    fn generate_args(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["sipgen", "generate"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).expect("cli should parse").command {
            Commands::Generate(args) => args,
            other => panic!("expected generate, got {other:?}"),
        }
    }

    #[test]
    fn config_fills_unset_flags() {
        let mut config = SipgenConfig::default();
        config.generator.include_prefix = Some("FromConfig".to_string());
        config.generator.builtin_rules = false;
        config.generator.indent = 2;
        config.rules.files = vec![PathBuf::from("config-rules.toml")];

        let settings = Settings::resolve(&generate_args(&["widget.h"]), &config);
        assert_eq!(settings.include_prefix.as_deref(), Some("FromConfig"));
        assert!(!settings.builtin_rules);
        assert_eq!(settings.indent, 2);
        assert_eq!(settings.rule_files, vec![PathBuf::from("config-rules.toml")]);
    }

    #[test]
    fn flags_beat_config() {
        let config = SipgenConfig::default();
        let args = generate_args(&[
            "widget.h",
            "--rules",
            "cli.toml",
            "--include-prefix",
            "FromCli",
            "--indent",
            "8",
            "--no-builtin-rules",
        ]);
        let settings = Settings::resolve(&args, &config);
        assert_eq!(settings.rule_files, vec![PathBuf::from("cli.toml")]);
        assert_eq!(settings.include_prefix.as_deref(), Some("FromCli"));
        assert_eq!(settings.indent, 8);
        assert!(!settings.builtin_rules);
    }

    #[test]
    fn output_path_uses_configured_extension() {
        let mut config = SipgenConfig::default();
        config.output.extension = "sip5".to_string();
        let settings = Settings::resolve(&generate_args(&["widget.h"]), &config);
        assert_eq!(
            settings.output_path(Path::new("out"), Path::new("include/widget.h")),
            PathBuf::from("out/widget.sip5")
        );
    }

    #[test]
    fn inputs_sharing_a_stem_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let args = generate_args(&["a/widget.h", "--out-dir", out.to_str().unwrap()]);
        let settings = Settings::resolve(&args, &SipgenConfig::default());

        let files = vec![
            dir.path().join("a/widget.h"),
            dir.path().join("b/widget.h"),
            dir.path().join("b/widget.hpp"),
        ];
        let err = settings.check_output_collisions(&files).unwrap_err().to_string();
        assert!(err.contains("a/widget.h"), "{err}");
        assert!(err.contains("b/widget.h"), "{err}");
        assert!(err.contains("widget.sip"), "{err}");

        let distinct = vec![dir.path().join("a/widget.h"), dir.path().join("a/label.h")];
        settings.check_output_collisions(&distinct).unwrap();
    }

    #[test]
    fn stdout_output_never_collides() {
        let settings = Settings::resolve(&generate_args(&["widget.h"]), &SipgenConfig::default());
        let files = vec![PathBuf::from("a/widget.h"), PathBuf::from("b/widget.h")];
        settings.check_output_collisions(&files).unwrap();
    }

    #[test]
    fn rule_files_load_in_order_before_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "[[rule]]\nname = \"a\"\npattern = \"A\"\naction = \"suppress\"\n")
            .unwrap();
        std::fs::write(&second, "[[rule]]\nname = \"b\"\npattern = \"B\"\naction = \"suppress\"\n")
            .unwrap();

        let table = load_rules(&[first, second], true).unwrap();
        let labels: Vec<_> = table.iter().map(|r| r.label().to_string()).collect();
        assert_eq!(&labels[..2], &["a".to_string(), "b".to_string()]);
        assert!(table.len() > 2);
        assert_eq!(table.iter().nth(1).map(sipgen_rules::Rule::ordinal), Some(1));
    }

    #[test]
    fn broken_rule_file_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[[rule]]\npattern = ").unwrap();
        let err = load_rules(&[path], false).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn one_header_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let header = dir.path().join("counter.h");
        std::fs::write(
            &header,
            "class Counter {\npublic:\n    int value() const;\n};\n",
        )
        .unwrap();

        let table = load_rules(&[], false).unwrap();
        let settings = Settings::resolve(&generate_args(&["counter.h"]), &SipgenConfig::default());
        let out = generate_one(&header, false, &table, &settings).unwrap();
        assert!(out.text.contains("class Counter"));
        assert!(out.text.contains("#include <counter.h>"));
        assert!(out.text.contains("int value() const;"));
        assert!(out.diagnostics.is_empty());
    }
}
