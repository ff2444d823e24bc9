/// Rendering knobs for one translation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Header file name written into `%TypeHeaderCode` blocks. Empty disables them.
    pub header: String,
    /// Directory prepended to `header` in `#include` lines.
    pub include_prefix: Option<String>,
    /// Emit `// Discarded` and `// Modified` comments for rule actions.
    pub trace_rules: bool,
    /// Spaces per nesting level.
    pub indent: usize,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            header: String::new(),
            include_prefix: None,
            trace_rules: false,
            indent: 4,
        }
    }
}

impl EmitOptions {
    pub fn for_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..Self::default()
        }
    }

    /// Path used inside `#include <...>`.
    #[must_use]
    pub fn include_path(&self) -> String {
        match self.include_prefix.as_deref().map(|p| p.trim_end_matches('/')) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}/{}", self.header),
            _ => self.header.clone(),
        }
    }
}
