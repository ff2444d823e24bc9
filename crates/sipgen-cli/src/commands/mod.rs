pub mod check_rules;
pub mod dispatch;
pub mod dump_ast;
pub mod generate;

use anyhow::Context;
use sipgen_config::SipgenConfig;

use crate::cli::GlobalFlags;

/// Layered config, with `--config` merged above the project file when given.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<SipgenConfig> {
    match &flags.config {
        Some(path) => SipgenConfig::load_from(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => SipgenConfig::load_with_dotenv().context("failed to load configuration"),
    }
}
