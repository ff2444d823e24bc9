//! Access levels and the closed attribute set shared by every stage.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Macro-derived source annotations are collapsed into [`DeclAttributes`] by the
//! model builder, so nothing downstream ever inspects macro tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

/// C++ member access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

impl Access {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }

    /// Parse an access keyword, tolerating a trailing colon (`public:`).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().trim_end_matches(':').trim() {
            "public" => Some(Self::Public),
            "protected" => Some(Self::Protected),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SymbolVisibility
// ---------------------------------------------------------------------------

/// Symbol visibility collapsed from export macros and GCC attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SymbolVisibility {
    #[default]
    Default,
    Export,
    Hidden,
}

impl SymbolVisibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Export => "export",
            Self::Hidden => "hidden",
        }
    }
}

impl fmt::Display for SymbolVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// DeclAttributes
// ---------------------------------------------------------------------------

/// The closed attribute set carried by every declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DeclAttributes {
    pub visibility: SymbolVisibility,
    pub deprecated: bool,
}

impl DeclAttributes {
    #[must_use]
    pub const fn is_hidden(self) -> bool {
        matches!(self.visibility, SymbolVisibility::Hidden)
    }
}
