//! Where generated `.sip` files go.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

fn default_extension() -> String {
    "sip".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output directory. `None` writes to stdout.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Extension of generated files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            extension: default_extension(),
        }
    }
}

impl OutputConfig {
    /// Output path for `header` inside `dir`: `widget.h` -> `dir/widget.sip`.
    #[must_use]
    pub fn output_path(&self, dir: &Path, header: &Path) -> PathBuf {
        let stem = header.file_stem().unwrap_or(header.as_os_str());
        dir.join(stem).with_extension(&self.extension)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.extension.is_empty() || self.extension.contains(['.', '/', '\\']) {
            return Err(ConfigError::InvalidValue {
                field: "output.extension".to_string(),
                reason: format!("'{}' is not a bare file extension", self.extension),
            });
        }
        Ok(())
    }
}
