//! Rule table sources.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RulesConfig {
    /// TOML rule tables, loaded in order. Earlier files take precedence
    /// among rules of equal specificity.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}
