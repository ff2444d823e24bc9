//! The non-destructive result of rule application.

use std::collections::BTreeMap;

use sipgen_core::SymbolVisibility;
use sipgen_model::{DeclId, TypeRef};

/// A value together with the label of the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub value: T,
    pub rule: String,
}

impl<T> Applied<T> {
    pub fn new(value: T, rule: impl Into<String>) -> Self {
        Self {
            value,
            rule: rule.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityOverride {
    Suppress,
    Set(SymbolVisibility),
}

/// Everything the winning rules did to one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedActions {
    pub visibility: Option<Applied<VisibilityOverride>>,
    pub rename: Option<Applied<String>>,
    /// Return type, typedef target, or variable type replacement.
    pub type_override: Option<Applied<TypeRef>>,
    /// Keyed by parameter index.
    pub defaults: BTreeMap<usize, Applied<String>>,
    pub markers: Vec<Applied<String>>,
    pub annotations: Vec<Applied<String>>,
    pub parameter_annotations: BTreeMap<usize, Vec<Applied<String>>>,
}

impl AppliedActions {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visibility.is_none()
            && self.rename.is_none()
            && self.type_override.is_none()
            && self.defaults.is_empty()
            && self.markers.is_empty()
            && self.annotations.is_empty()
            && self.parameter_annotations.is_empty()
    }

    /// Removed from the output by `suppress` or `set_visibility = "hidden"`.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        matches!(
            self.visibility.as_ref().map(|a| a.value),
            Some(VisibilityOverride::Suppress | VisibilityOverride::Set(SymbolVisibility::Hidden))
        )
    }

    /// A rule explicitly made the declaration visible again.
    #[must_use]
    pub fn is_forced_visible(&self) -> bool {
        matches!(
            self.visibility.as_ref().map(|a| a.value),
            Some(VisibilityOverride::Set(
                SymbolVisibility::Default | SymbolVisibility::Export
            ))
        )
    }

    /// Rule label responsible for suppression, if any.
    #[must_use]
    pub fn suppressed_by(&self) -> Option<&str> {
        self.visibility
            .as_ref()
            .filter(|_| self.is_suppressed())
            .map(|a| a.rule.as_str())
    }

    /// Labels of rules that modified (rather than removed) the declaration,
    /// deduplicated in application order.
    #[must_use]
    pub fn modifying_rules(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        if let Some(v) = &self.visibility {
            if !self.is_suppressed() {
                push_unique(&mut labels, &v.rule);
            }
        }
        let single = [
            self.rename.as_ref().map(|r| r.rule.as_str()),
            self.type_override.as_ref().map(|t| t.rule.as_str()),
        ];
        for label in single.into_iter().flatten() {
            push_unique(&mut labels, label);
        }
        let many = self
            .defaults
            .values()
            .chain(&self.markers)
            .chain(&self.annotations)
            .chain(self.parameter_annotations.values().flatten());
        for applied in many {
            push_unique(&mut labels, &applied.rule);
        }
        labels
    }

    /// Declaration-level annotation values, in application order.
    pub fn annotation_values(&self) -> impl Iterator<Item = &str> {
        self.annotations.iter().map(|a| a.value.as_str())
    }

    pub fn parameter_annotation_values(&self, index: usize) -> impl Iterator<Item = &str> {
        self.parameter_annotations
            .get(&index)
            .into_iter()
            .flatten()
            .map(|a| a.value.as_str())
    }
}

fn push_unique<'a>(labels: &mut Vec<&'a str>, label: &'a str) {
    if !labels.contains(&label) {
        labels.push(label);
    }
}

/// Declaration id to applied actions. Declarations no rule touched are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overlay {
    entries: BTreeMap<DeclId, AppliedActions>,
}

impl Overlay {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, id: DeclId) -> Option<&AppliedActions> {
        self.entries.get(&id)
    }

    pub(crate) fn entry(&mut self, id: DeclId) -> &mut AppliedActions {
        self.entries.entry(id).or_default()
    }

    #[must_use]
    pub fn is_suppressed(&self, id: DeclId) -> bool {
        self.get(id).is_some_and(AppliedActions::is_suppressed)
    }

    /// Name to emit, honouring a `rename` rule.
    #[must_use]
    pub fn name_of<'a>(&'a self, id: DeclId, source_name: &'a str) -> &'a str {
        self.get(id)
            .and_then(|a| a.rename.as_ref())
            .map_or(source_name, |r| r.value.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeclId, &AppliedActions)> {
        self.entries.iter().map(|(id, a)| (*id, a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hidden_visibility_counts_as_suppression() {
        let mut actions = AppliedActions::default();
        assert!(!actions.is_suppressed());
        actions.visibility = Some(Applied::new(
            VisibilityOverride::Set(SymbolVisibility::Hidden),
            "hide",
        ));
        assert!(actions.is_suppressed());
        assert_eq!(actions.suppressed_by(), Some("hide"));
        assert!(actions.modifying_rules().is_empty());
    }

    #[test]
    fn modifying_rules_are_deduplicated() {
        let mut actions = AppliedActions::default();
        actions.rename = Some(Applied::new("b".to_string(), "r1"));
        actions.annotations.push(Applied::new("Transfer".to_string(), "r1"));
        actions.markers.push(Applied::new("%MethodCode\n%End".to_string(), "r2"));
        assert_eq!(actions.modifying_rules(), vec!["r1", "r2"]);
    }

    #[test]
    fn export_visibility_forces_visible() {
        let mut actions = AppliedActions::default();
        actions.visibility = Some(Applied::new(
            VisibilityOverride::Set(SymbolVisibility::Export),
            "show",
        ));
        assert!(actions.is_forced_visible());
        assert!(!actions.is_suppressed());
    }
}
