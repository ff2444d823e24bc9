//! Generator behaviour: rule tracing, built-in rules, error policy.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_indent() -> usize {
    4
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratorConfig {
    /// Directory prepended to header names in `%TypeHeaderCode` includes.
    #[serde(default)]
    pub include_prefix: Option<String>,

    /// Emit `// Discarded` / `// Modified` comments for rule actions.
    #[serde(default)]
    pub trace_rules: bool,

    /// Load the built-in Qt rule table below user rules.
    #[serde(default = "default_true")]
    pub builtin_rules: bool,

    /// Exit non-zero when any error diagnostic is reported.
    #[serde(default)]
    pub fail_on_error: bool,

    /// Spaces per nesting level in emitted SIP text.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            include_prefix: None,
            trace_rules: false,
            builtin_rules: default_true(),
            fail_on_error: false,
            indent: default_indent(),
        }
    }
}

impl GeneratorConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.indent == 0 || self.indent > 16 {
            return Err(ConfigError::InvalidValue {
                field: "generator.indent".to_string(),
                reason: format!("expected 1..=16 spaces, got {}", self.indent),
            });
        }
        Ok(())
    }
}
