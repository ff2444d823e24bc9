//! # sipgen-config
//!
//! Layered configuration loading for sipgen using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SIPGEN_*` prefix, `__` as separator)
//! 2. Project-level `.sipgen/config.toml`
//! 3. User-level `~/.config/sipgen/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SIPGEN_GENERATOR__TRACE_RULES` -> `generator.trace_rules`,
//! `SIPGEN_OUTPUT__DIR` -> `output.dir`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use sipgen_config::SipgenConfig;
//!
//! let config = SipgenConfig::load_with_dotenv().expect("config");
//! if config.generator.trace_rules {
//!     println!("rule traces enabled");
//! }
//! ```

mod error;
mod generator;
mod output;
mod rules;

pub use error::ConfigError;
pub use generator::GeneratorConfig;
pub use output::OutputConfig;
pub use rules::RulesConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SipgenConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SipgenConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source cannot be read or a value fails
    /// validation.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load with an explicit config file merged above the project file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] when `path` does not exist, or
    /// what [`Self::load`] returns.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_path_buf()));
        }
        let figment = Self::figment()
            .merge(Toml::file(path))
            .merge(Env::prefixed("SIPGEN_").split("__"));
        Self::from_figment(&figment)
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests can inspect the figment or add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        let local_path = PathBuf::from(".sipgen/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("SIPGEN_").split("__"))
    }

    /// Extract and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] on extraction failure and
    /// [`ConfigError::InvalidValue`] when validation fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.generator.validate()?;
        self.output.validate()
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sipgen").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_loads() {
        let config = SipgenConfig::default();
        assert!(config.generator.builtin_rules);
        assert!(!config.generator.trace_rules);
        assert!(config.rules.files.is_empty());
        assert_eq!(config.output.extension, "sip");
    }

    #[test]
    fn figment_builds_without_files() {
        figment::Jail::expect_with(|_jail| {
            let config = SipgenConfig::from_figment(&SipgenConfig::figment())
                .map_err(|e| e.to_string())?;
            assert_eq!(config.generator.indent, 4);
            assert!(config.generator.include_prefix.is_none());
            Ok(())
        });
    }
}
