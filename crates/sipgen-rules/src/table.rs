//! Ordered rule tables and their TOML form.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::RuleError;
use crate::rule::{Action, KindFilter, MatchKind, Rule, RuleOrigin, RuleSpec};

/// Members moc generates for every `Q_OBJECT` class.
const MOC_MEMBERS: &[&str] = &[
    "metaObject",
    "qt_metacast",
    "qt_metacall",
    "tr",
    "trUtf8",
    "d_func",
    "qt_check_for_QOBJECT_macro",
];

/// Platform id typedefs SIP cannot see through.
const INT_TYPEDEFS: &[&str] = &["uid_t", "gid_t"];

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleSpec>,
}

/// Rules in registration order. The table is immutable once built and is
/// shared by every pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Compile user rules in the given order.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleError`] raised while compiling a rule.
    pub fn from_specs(specs: impl IntoIterator<Item = RuleSpec>) -> Result<Self, RuleError> {
        let mut table = Self::new();
        for spec in specs {
            table.push(spec, RuleOrigin::User)?;
        }
        Ok(table)
    }

    /// Parse a `[[rule]]` TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Toml`] for malformed TOML and a compile error for
    /// an invalid rule.
    pub fn from_toml(text: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(text)?;
        Self::from_specs(file.rule)
    }

    /// Read and parse a rule file.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Io`] when the file cannot be read, otherwise as
    /// [`Self::from_toml`].
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let text = std::fs::read_to_string(path)?;
        let table = Self::from_toml(&text)?;
        debug!(path = %path.display(), rules = table.len(), "loaded rule table");
        Ok(table)
    }

    /// Rules every Qt binding needs.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the patterns are fixed.
    pub fn builtin_qt() -> Result<Self, RuleError> {
        let mut specs: Vec<RuleSpec> = MOC_MEMBERS
            .iter()
            .map(|member| {
                RuleSpec::new(format!("*::{member}"), Action::Suppress)
                    .named(format!("qt-moc-{member}"))
                    .kinds([KindFilter::Function])
            })
            .collect();

        specs.push(
            RuleSpec::new("*", Action::OverrideReturn("int".to_string()))
                .named("qt-flags-typedef")
                .kinds([KindFilter::Typedef])
                .template("QFlags"),
        );
        specs.extend(INT_TYPEDEFS.iter().map(|name| {
            RuleSpec::new(*name, Action::OverrideReturn("int".to_string()))
                .named(format!("posix-{name}"))
                .matching(MatchKind::Exact)
                .kinds([KindFilter::Typedef])
        }));

        specs.push(
            RuleSpec::new("*", Action::Annotate("TransferThis".to_string()))
                .named("qt-parent-ctor")
                .kinds([KindFilter::Constructor])
                .parameter("parent"),
        );
        specs.push(
            RuleSpec::new("*", Action::Annotate("Transfer".to_string()))
                .named("qt-parent-transfer")
                .kinds([KindFilter::Method, KindFilter::FreeFunction])
                .parameter("parent"),
        );

        let mut table = Self::new();
        for spec in specs {
            table.push(spec, RuleOrigin::Builtin)?;
        }
        Ok(table)
    }

    /// Compile and append one rule.
    ///
    /// # Errors
    ///
    /// Returns the [`RuleError`] raised by [`Rule::compile`].
    pub fn push(&mut self, spec: RuleSpec, origin: RuleOrigin) -> Result<(), RuleError> {
        let rule = Rule::compile(spec, origin, self.rules.len())?;
        self.rules.push(rule);
        Ok(())
    }

    /// Append `other`'s rules after this table's, keeping their origin.
    pub fn extend(&mut self, other: Self) {
        for mut rule in other.rules {
            rule.renumber(self.rules.len());
            self.rules.push(rule);
        }
    }

    /// This table followed by [`Self::builtin_qt`].
    ///
    /// # Errors
    ///
    /// As [`Self::builtin_qt`].
    pub fn with_builtin(mut self) -> Result<Self, RuleError> {
        self.extend(Self::builtin_qt()?);
        Ok(self)
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Rules sorted by precedence, most specific first.
    #[must_use]
    pub fn by_precedence(&self) -> Vec<&Rule> {
        let mut ordered: Vec<&Rule> = self.rules.iter().collect();
        ordered.sort_by_key(|r| (r.specificity(), r.ordinal()));
        ordered
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
