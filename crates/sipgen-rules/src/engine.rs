//! Rule application: precedence, per-axis claims and conflict detection.

use std::collections::BTreeMap;
use std::fmt;

use sipgen_core::{DiagnosticCode, Diagnostics};
use sipgen_model::{Decl, DeclId, Model, TypeRef};
use tracing::{debug, info};

use crate::overlay::{Applied, AppliedActions, Overlay, VisibilityOverride};
use crate::rule::{Action, Rule, RuleOrigin, Targets};
use crate::table::RuleTable;

/// The independent properties of a declaration a rule can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    Visibility,
    Name,
    /// Return type, typedef target or variable type.
    Type,
    Default(usize),
    Marker,
    /// `None` for the declaration itself, otherwise a parameter index.
    Annotation(Option<usize>),
}

impl Axis {
    /// Composing axes accumulate every matching rule instead of picking one.
    #[must_use]
    pub const fn composes(self) -> bool {
        matches!(self, Self::Marker | Self::Annotation(_))
    }

    fn for_action(action: &Action, targets: &Targets) -> Vec<Self> {
        let params = || match targets {
            Targets::Declaration => Vec::new(),
            Targets::Parameters(indices) => indices.clone(),
        };
        match action {
            Action::Suppress | Action::SetVisibility(_) => vec![Self::Visibility],
            Action::Rename(_) => vec![Self::Name],
            Action::OverrideReturn(_) => vec![Self::Type],
            Action::OverrideDefault(_) => params().into_iter().map(Self::Default).collect(),
            Action::InjectMarker(_) => vec![Self::Marker],
            Action::Annotate(_) => match targets {
                Targets::Declaration => vec![Self::Annotation(None)],
                Targets::Parameters(_) => params()
                    .into_iter()
                    .map(|i| Self::Annotation(Some(i)))
                    .collect(),
            },
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visibility => f.write_str("visibility"),
            Self::Name => f.write_str("name"),
            Self::Type => f.write_str("type"),
            Self::Default(i) => write!(f, "default of parameter {i}"),
            Self::Marker => f.write_str("marker"),
            Self::Annotation(None) => f.write_str("annotation"),
            Self::Annotation(Some(i)) => write!(f, "annotation of parameter {i}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Usage statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub label: String,
    pub origin: RuleOrigin,
    /// Declarations the rule changed.
    pub hits: usize,
}

/// Per-rule hit counts for one run, indexed like the table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleUsage {
    entries: Vec<RuleHit>,
}

impl RuleUsage {
    #[must_use]
    pub fn for_table(table: &RuleTable) -> Self {
        Self {
            entries: table
                .iter()
                .map(|r| RuleHit {
                    label: r.label().to_string(),
                    origin: r.origin(),
                    hits: 0,
                })
                .collect(),
        }
    }

    fn record(&mut self, ordinal: usize) {
        if let Some(entry) = self.entries.get_mut(ordinal) {
            entry.hits += 1;
        }
    }

    /// Sum another run over the same table into this one.
    pub fn merge(&mut self, other: &Self) {
        if self.entries.is_empty() {
            self.entries.clone_from(&other.entries);
            return;
        }
        for (mine, theirs) in self.entries.iter_mut().zip(&other.entries) {
            mine.hits += theirs.hits;
        }
    }

    #[must_use]
    pub fn hits(&self, label: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.hits)
            .sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RuleHit> {
        self.entries.iter()
    }

    /// User rules that never fired.
    pub fn unused(&self) -> impl Iterator<Item = &RuleHit> {
        self.entries
            .iter()
            .filter(|e| e.hits == 0 && e.origin == RuleOrigin::User)
    }

    /// Log every rule's hit count, and unused user rules at `info`.
    pub fn report(&self) {
        for entry in &self.entries {
            debug!(rule = %entry.label, hits = entry.hits, "rule usage");
        }
        for entry in self.unused() {
            info!(rule = %entry.label, "rule matched no declaration");
        }
    }
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

/// Output of [`apply_rules`].
#[derive(Debug, Clone, Default)]
pub struct RuleOutcome {
    pub overlay: Overlay,
    pub diagnostics: Diagnostics,
    pub usage: RuleUsage,
}

/// Every rule matching `id`, most specific first, with what each targets.
#[must_use]
pub fn matching_rules<'t>(
    model: &Model,
    table: &'t RuleTable,
    id: DeclId,
) -> Vec<(&'t Rule, Targets)> {
    let decl = model.get(id);
    table
        .by_precedence()
        .into_iter()
        .filter_map(|rule| rule.matches(model, decl).map(|t| (rule, t)))
        .collect()
}

/// Apply `table` to every declaration of `model`.
///
/// Rules are tried in precedence order. The first rule to claim a
/// non-composing axis keeps it; a later rule with equal specificity on the
/// same axis is a conflict and produces an error diagnostic.
#[must_use]
pub fn apply_rules(model: &Model, table: &RuleTable) -> RuleOutcome {
    let ordered = table.by_precedence();
    let mut outcome = RuleOutcome {
        usage: RuleUsage::for_table(table),
        ..RuleOutcome::default()
    };

    for decl in model.iter().filter(|d| d.parent.is_some()) {
        let mut claims: BTreeMap<Axis, &Rule> = BTreeMap::new();
        for &rule in &ordered {
            let Some(targets) = rule.matches(model, decl) else {
                continue;
            };
            let mut applied = false;
            for axis in Axis::for_action(rule.action(), &targets) {
                if let Some(holder) = claims.get(&axis).copied() {
                    if !axis.composes() {
                        contest(decl, axis, holder, rule, &mut outcome.diagnostics);
                        continue;
                    }
                } else {
                    claims.insert(axis, rule);
                }
                apply(outcome.overlay.entry(decl.id), axis, rule);
                applied = true;
            }
            if applied {
                outcome.usage.record(rule.ordinal());
            }
        }
    }

    debug!(
        rules = table.len(),
        touched = outcome.overlay.len(),
        conflicts = outcome.diagnostics.len(),
        "rules applied"
    );
    outcome
}

fn contest(
    decl: &Decl,
    axis: Axis,
    holder: &Rule,
    challenger: &Rule,
    diagnostics: &mut Diagnostics,
) {
    if holder.specificity() == challenger.specificity() {
        diagnostics.error(
            &decl.qualified_name,
            DiagnosticCode::RuleConflict,
            format!(
                "rules `{}` and `{}` both set the {axis} with equal specificity; applying `{}`",
                holder.label(),
                challenger.label(),
                holder.label()
            ),
        );
    } else {
        debug!(
            decl = %decl.qualified_name,
            %axis,
            winner = holder.label(),
            loser = challenger.label(),
            "more specific rule wins"
        );
    }
}

fn apply(actions: &mut AppliedActions, axis: Axis, rule: &Rule) {
    let label = rule.label();
    match (rule.action(), axis) {
        (Action::Suppress, _) => {
            actions.visibility = Some(Applied::new(VisibilityOverride::Suppress, label));
        }
        (Action::SetVisibility(v), _) => {
            actions.visibility = Some(Applied::new(VisibilityOverride::Set(*v), label));
        }
        (Action::Rename(name), _) => {
            actions.rename = Some(Applied::new(name.clone(), label));
        }
        (Action::OverrideReturn(spelling), _) => {
            actions.type_override = Some(Applied::new(TypeRef::parse(spelling), label));
        }
        (Action::OverrideDefault(value), Axis::Default(index)) => {
            actions
                .defaults
                .insert(index, Applied::new(value.clone(), label));
        }
        (Action::InjectMarker(code), _) => {
            actions.markers.push(Applied::new(code.clone(), label));
        }
        (Action::Annotate(value), Axis::Annotation(None)) => {
            if !actions.annotations.iter().any(|a| &a.value == value) {
                actions.annotations.push(Applied::new(value.clone(), label));
            }
        }
        (Action::Annotate(value), Axis::Annotation(Some(index))) => {
            let list = actions.parameter_annotations.entry(index).or_default();
            if !list.iter().any(|a| &a.value == value) {
                list.push(Applied::new(value.clone(), label));
            }
        }
        (Action::OverrideDefault(_) | Action::Annotate(_), _) => {}
    }
}
