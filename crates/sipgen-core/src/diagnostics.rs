//! Side-channel diagnostics collected by every pipeline stage.
//!
//! Records are appended in stage order and never abort a run. Each record is
//! mirrored to `tracing` at the matching level when it is pushed.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CoreError;

// ---------------------------------------------------------------------------
// Severity / DiagnosticCode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticCode {
    /// Syntax the model cannot represent, kept as an opaque placeholder.
    OpaqueConstruct,
    /// A source attribute or annotation macro outside the known set.
    UnknownAttribute,
    /// A type shape with no SIP spelling.
    UnrepresentableType,
    /// Two rules claim the same axis of one declaration.
    RuleConflict,
    /// A typedef chain refers back to itself.
    TypedefCycle,
}

impl DiagnosticCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpaqueConstruct => "opaque_construct",
            Self::UnknownAttribute => "unknown_attribute",
            Self::UnrepresentableType => "unrepresentable_type",
            Self::RuleConflict => "rule_conflict",
            Self::TypedefCycle => "typedef_cycle",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// One record: which declaration, how bad, and what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Fully qualified name of the declaration the record is about.
    pub subject: String,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity, self.code, self.subject, self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Ordered accumulator of [`Diagnostic`] records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!(
                subject = %diagnostic.subject,
                code = %diagnostic.code,
                "{}",
                diagnostic.message
            ),
            Severity::Error => tracing::error!(
                subject = %diagnostic.subject,
                code = %diagnostic.code,
                "{}",
                diagnostic.message
            ),
        }
        self.records.push(diagnostic);
    }

    pub fn warn(
        &mut self,
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            subject: subject.into(),
            severity: Severity::Warning,
            code,
            message: message.into(),
        });
    }

    pub fn error(
        &mut self,
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic {
            subject: subject.into(),
            severity: Severity::Error,
            code,
            message: message.into(),
        });
    }

    /// Append another stage's records without logging them a second time.
    pub fn extend(&mut self, other: Self) {
        self.records.extend(other.records);
    }

    #[must_use]
    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.records
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.records.iter().any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    /// Fail when any error-level record is present.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DiagnosticErrors`] naming the first error record.
    pub fn check(&self) -> Result<(), CoreError> {
        let mut errors = self.records.iter().filter(|d| d.severity == Severity::Error);
        match errors.next() {
            None => Ok(()),
            Some(first) => Err(CoreError::DiagnosticErrors {
                count: 1 + errors.count(),
                first: first.to_string(),
            }),
        }
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_keep_push_order() {
        let mut diags = Diagnostics::new();
        diags.warn("A::f", DiagnosticCode::OpaqueConstruct, "first");
        diags.error("B", DiagnosticCode::RuleConflict, "second");
        diags.warn("C", DiagnosticCode::UnknownAttribute, "third");

        let subjects: Vec<_> = diags.iter().map(|d| d.subject.as_str()).collect();
        assert_eq!(subjects, vec!["A::f", "B", "C"]);
        assert_eq!(diags.count(Severity::Warning), 2);
        assert_eq!(diags.count(Severity::Error), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn check_passes_on_warnings_only() {
        let mut diags = Diagnostics::new();
        diags.warn("X", DiagnosticCode::OpaqueConstruct, "kept raw");
        assert!(diags.check().is_ok());
    }

    #[test]
    fn check_reports_first_error() {
        let mut diags = Diagnostics::new();
        diags.error("T", DiagnosticCode::TypedefCycle, "T -> U -> T");
        diags.error("f", DiagnosticCode::RuleConflict, "two renames");
        let err = diags.check().unwrap_err();
        assert_eq!(
            err.to_string(),
            "2 error diagnostic(s), first: error[typedef_cycle] T: T -> U -> T"
        );
    }

    #[test]
    fn serializes_as_plain_array() {
        let mut diags = Diagnostics::new();
        diags.warn("N::E", DiagnosticCode::UnrepresentableType, "no spelling");
        let json = serde_json::to_string(&diags).unwrap();
        assert_eq!(
            json,
            r#"[{"subject":"N::E","severity":"warning","code":"unrepresentable_type","message":"no spelling"}]"#
        );
    }

    #[test]
    fn extend_appends_in_order() {
        let mut a = Diagnostics::new();
        a.warn("a", DiagnosticCode::OpaqueConstruct, "1");
        let mut b = Diagnostics::new();
        b.error("b", DiagnosticCode::RuleConflict, "2");
        a.extend(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.records()[1].subject, "b");
    }
}
