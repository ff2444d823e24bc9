use anyhow::Context;
use serde::Serialize;
use sipgen_rules::{RuleOrigin, RuleSpec, RuleTable};

use crate::cli::root_commands::CheckRulesArgs;
use crate::cli::{GlobalFlags, OutputFormat};

#[derive(Debug, Serialize)]
struct RuleListing<'a> {
    ordinal: usize,
    builtin: bool,
    summary: String,
    #[serde(flatten)]
    spec: &'a RuleSpec,
}

pub fn handle(args: &CheckRulesArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let mut table = RuleTable::load(&args.file)
        .with_context(|| format!("invalid rule table {}", args.file.display()))?;
    if args.with_builtin {
        table = table.with_builtin().context("failed to compile built-in rules")?;
    }

    let listing: Vec<RuleListing<'_>> = table
        .iter()
        .map(|rule| RuleListing {
            ordinal: rule.ordinal(),
            builtin: rule.origin() == RuleOrigin::Builtin,
            summary: rule.action().to_string(),
            spec: rule.spec(),
        })
        .collect();

    match flags.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
        OutputFormat::Text => {
            for entry in &listing {
                let marker = if entry.builtin { " (builtin)" } else { "" };
                println!(
                    "{:>3}  {}{marker}  {}  {}",
                    entry.ordinal,
                    entry.spec.label(),
                    entry.spec.pattern,
                    entry.summary
                );
            }
            if !flags.quiet {
                eprintln!("{}: {} rules OK", args.file.display(), table.len());
            }
        }
    }
    Ok(())
}
