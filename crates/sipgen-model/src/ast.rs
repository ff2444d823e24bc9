//! Normalized declaration tree consumed by the model builder.
//!
//! Any front end can produce this tree: `sipgen-parser` builds it from
//! tree-sitter, and it round-trips through JSON so pre-dumped trees can be fed
//! to the pipeline directly.
//!
//! Per-kind conventions:
//!
//! | kind | `name` | `type_spelling` | children | attributes |
//! |------|--------|-----------------|----------|------------|
//! | `class`/`struct`/`union` | tag (empty if anonymous) | – | bases, access specifiers, members | `forward`, `access` |
//! | `function`/`method`/ctor/dtor | name | return type | parameters, template params, attributes | `const`, `static`, `virtual`, `pure`, `override`, `explicit`, `deleted`, `access` |
//! | `parameter` | name (may be empty) | parameter type | – | `default` |
//! | `enum` | tag (empty if anonymous) | underlying type | constants | `scoped` |
//! | `enum_constant` | name | – | – | `value` |
//! | `typedef`/`type_alias` | alias | aliased type | optional inline aggregate | – |
//! | `field`/`variable` | name | type | optional inline aggregate | `static`, `extern` |
//! | `base_specifier` | – | base type | – | `access`, `virtual` |
//! | `attribute` | raw annotation text | – | – | – |
//! | `unexposed` | – | – | – | `text` |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind tag of a normalized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    TranslationUnit,
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Function,
    Method,
    Constructor,
    Destructor,
    ConversionFunction,
    Parameter,
    Field,
    Variable,
    Typedef,
    TypeAlias,
    BaseSpecifier,
    TemplateTypeParameter,
    TemplateNonTypeParameter,
    AccessSpecifier,
    Attribute,
    Friend,
    UsingDeclaration,
    UsingDirective,
    LinkageSpec,
    StaticAssert,
    Unexposed,
}

impl NodeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TranslationUnit => "translation_unit",
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::EnumConstant => "enum_constant",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::ConversionFunction => "conversion_function",
            Self::Parameter => "parameter",
            Self::Field => "field",
            Self::Variable => "variable",
            Self::Typedef => "typedef",
            Self::TypeAlias => "type_alias",
            Self::BaseSpecifier => "base_specifier",
            Self::TemplateTypeParameter => "template_type_parameter",
            Self::TemplateNonTypeParameter => "template_non_type_parameter",
            Self::AccessSpecifier => "access_specifier",
            Self::Attribute => "attribute",
            Self::Friend => "friend",
            Self::UsingDeclaration => "using_declaration",
            Self::UsingDirective => "using_directive",
            Self::LinkageSpec => "linkage_spec",
            Self::StaticAssert => "static_assert",
            Self::Unexposed => "unexposed",
        }
    }

    /// Class, struct, or union.
    #[must_use]
    pub const fn is_aggregate(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Union)
    }

    #[must_use]
    pub const fn is_function(self) -> bool {
        matches!(
            self,
            Self::Function
                | Self::Method
                | Self::Constructor
                | Self::Destructor
                | Self::ConversionFunction
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1-based line/column span of a node in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceRange {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceRange {
    #[must_use]
    pub const fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            start_column: 1,
            end_line,
            end_column: 1,
        }
    }
}

/// One node of the normalized tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_spelling: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Self>,
    #[serde(default)]
    pub range: SourceRange,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl AstNode {
    pub fn new(kind: NodeKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            type_spelling: None,
            children: Vec::new(),
            range: SourceRange::default(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn translation_unit(children: Vec<Self>) -> Self {
        Self::new(NodeKind::TranslationUnit, "").with_children(children)
    }

    #[must_use]
    pub fn with_type(mut self, spelling: impl Into<String>) -> Self {
        self.type_spelling = Some(spelling.into());
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Set a boolean attribute to `"true"`.
    #[must_use]
    pub fn with_flag(self, key: &str) -> Self {
        self.with_attr(key, "true")
    }

    #[must_use]
    pub const fn with_range(mut self, range: SourceRange) -> Self {
        self.range = range;
        self
    }

    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Boolean attribute: present and not `"false"`/`"0"`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        self.attr(key).is_some_and(|v| v != "false" && v != "0")
    }

    /// Parse a tree previously dumped with [`AstNode::to_json`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error when the text is not a valid tree.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Pretty-printed JSON dump of the tree.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error (not expected for well-formed trees).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
