//! # sipgen-rules
//!
//! Rule tables and the overlay engine.
//!
//! A [`RuleTable`] is an ordered list of compiled [`Rule`]s, loaded from
//! TOML or built in code. [`apply_rules`] matches every declaration of a
//! [`Model`](sipgen_model::Model) against the table and records the winning
//! actions in an [`Overlay`] without touching the model itself.

pub mod engine;
pub mod error;
pub mod overlay;
pub mod rule;
pub mod table;

pub use engine::{Axis, RuleHit, RuleOutcome, RuleUsage, apply_rules, matching_rules};
pub use error::RuleError;
pub use overlay::{Applied, AppliedActions, Overlay, VisibilityOverride};
pub use rule::{Action, KindFilter, MatchKind, Rule, RuleOrigin, RuleSpec, Specificity, Targets};
pub use table::RuleTable;
