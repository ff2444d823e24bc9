//! Rule records: what to match, and what to do about it.

use std::cmp::Reverse;
use std::fmt;

use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use sipgen_core::SymbolVisibility;
use sipgen_model::{
    Decl, DeclKind, FunctionDecl, FunctionRole, Model, TypeRef, TypedefResolution,
    strip_template_args,
};

use crate::error::RuleError;

// ---------------------------------------------------------------------------
// Serialized form
// ---------------------------------------------------------------------------

/// How `pattern` is compared against qualified names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    #[default]
    Glob,
}

/// Declaration kinds a rule can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    Namespace,
    Class,
    Enum,
    EnumConstant,
    /// Any function, constructors included.
    Function,
    Constructor,
    /// Member function other than a constructor.
    Method,
    FreeFunction,
    Variable,
    Typedef,
    Opaque,
}

impl KindFilter {
    #[must_use]
    pub fn accepts(self, model: &Model, decl: &Decl) -> bool {
        let role = decl.as_function().map(|f| f.role);
        match self {
            Self::Namespace => matches!(decl.kind, DeclKind::Namespace(_)),
            Self::Class => matches!(decl.kind, DeclKind::Class(_)),
            Self::Enum => matches!(decl.kind, DeclKind::Enum(_)),
            Self::EnumConstant => matches!(decl.kind, DeclKind::EnumConstant(_)),
            Self::Function => role.is_some(),
            Self::Constructor => role == Some(FunctionRole::Constructor),
            Self::Method => role.is_some_and(|r| {
                !matches!(r, FunctionRole::Constructor | FunctionRole::Free)
                    && !(r == FunctionRole::Operator && !is_member(model, decl))
            }),
            Self::FreeFunction => {
                role == Some(FunctionRole::Free)
                    || (role == Some(FunctionRole::Operator) && !is_member(model, decl))
            }
            Self::Variable => matches!(decl.kind, DeclKind::Variable(_)),
            Self::Typedef => matches!(decl.kind, DeclKind::Typedef(_)),
            Self::Opaque => matches!(decl.kind, DeclKind::Opaque(_)),
        }
    }
}

/// Operators are members exactly when their owner is a class.
fn is_member(model: &Model, decl: &Decl) -> bool {
    decl.parent
        .is_some_and(|p| matches!(model.get(p).kind, DeclKind::Class(_)))
}

/// The closed set of rule actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Suppress,
    Rename(String),
    SetVisibility(SymbolVisibility),
    /// Replace a function's return type, a typedef's target, or a variable's type.
    OverrideReturn(String),
    /// Replace the default of the parameter named by the rule.
    OverrideDefault(String),
    /// Code block emitted after the declaration (`%MethodCode ... %End`).
    InjectMarker(String),
    /// SIP annotation (`Transfer`, `KeepReference`, ...).
    Annotate(String),
}

impl Action {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Suppress => "suppress",
            Self::Rename(_) => "rename",
            Self::SetVisibility(_) => "set_visibility",
            Self::OverrideReturn(_) => "override_return",
            Self::OverrideDefault(_) => "override_default",
            Self::InjectMarker(_) => "inject_marker",
            Self::Annotate(_) => "annotate",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `[[rule]]` entry as written in a rule table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub pattern: String,
    #[serde(default, rename = "match")]
    pub match_kind: MatchKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<KindFilter>,
    /// `(int, const QString &) const`: restricts a rule to one overload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Parameter name targeted by parameter-scoped actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Template head the declaration must instantiate (`QFlags`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub action: Action,
}

impl RuleSpec {
    pub fn new(pattern: impl Into<String>, action: Action) -> Self {
        Self {
            name: None,
            pattern: pattern.into(),
            match_kind: MatchKind::default(),
            kinds: Vec::new(),
            signature: None,
            parameter: None,
            template: None,
            action,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn matching(mut self, kind: MatchKind) -> Self {
        self.match_kind = kind;
        self
    }

    #[must_use]
    pub fn kinds(mut self, kinds: impl IntoIterator<Item = KindFilter>) -> Self {
        self.kinds = kinds.into_iter().collect();
        self
    }

    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    #[must_use]
    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = Some(parameter.into());
        self
    }

    #[must_use]
    pub fn template(mut self, head: impl Into<String>) -> Self {
        self.template = Some(head.into());
        self
    }

    /// Label used in diagnostics and trace comments.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.pattern)
    }
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleOrigin {
    User,
    Builtin,
}

/// Ordering key; smaller sorts first. Equal keys on one axis are a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Specificity {
    origin: RuleOrigin,
    match_kind: MatchKind,
    unconstrained: bool,
    literal_len: Reverse<usize>,
}

/// Parameter-type shape parsed from a `signature` string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    params: Vec<TypeRef>,
    /// `None` when the signature does not mention constness.
    is_const: Option<bool>,
}

impl Signature {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let open = text.find('(')?;
        let close = text.rfind(')')?;
        if close < open || !text[..open].trim().is_empty() {
            return None;
        }
        let inner = text[open + 1..close].trim();
        let params = if inner.is_empty() || inner == "void" {
            Vec::new()
        } else {
            split_top_level(inner)
                .into_iter()
                .map(|p| TypeRef::parse(p.trim()))
                .collect()
        };
        let is_const = match text[close + 1..].trim() {
            "" => None,
            "const" => Some(true),
            _ => return None,
        };
        Some(Self { params, is_const })
    }

    fn matches(&self, function: &FunctionDecl) -> bool {
        self.is_const.is_none_or(|c| c == function.is_const)
            && self.params.len() == function.params.len()
            && self
                .params
                .iter()
                .zip(&function.params)
                .all(|(want, have)| *want == have.ty)
    }
}

fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        match ch {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// What part of a matched declaration a rule acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    Declaration,
    /// Indices of the parameters named by the rule.
    Parameters(Vec<usize>),
}

/// A validated rule ready for matching.
#[derive(Debug, Clone)]
pub struct Rule {
    spec: RuleSpec,
    origin: RuleOrigin,
    ordinal: usize,
    pattern: String,
    glob: Option<GlobMatcher>,
    signature: Option<Signature>,
}

impl Rule {
    /// Validate `spec`. `ordinal` is its registration position in the table.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] for an invalid glob or signature, or a
    /// parameter-scoped action without a parameter.
    pub fn compile(spec: RuleSpec, origin: RuleOrigin, ordinal: usize) -> Result<Self, RuleError> {
        let pattern = spec.pattern.trim().trim_start_matches("::").to_string();
        let glob = match spec.match_kind {
            MatchKind::Glob => Some(
                Glob::new(&pattern)
                    .map(|g| g.compile_matcher())
                    .map_err(|source| RuleError::InvalidGlob {
                        pattern: pattern.clone(),
                        source,
                    })?,
            ),
            MatchKind::Exact | MatchKind::Prefix => None,
        };
        let signature = spec
            .signature
            .as_deref()
            .map(|s| {
                Signature::parse(s).ok_or_else(|| RuleError::InvalidSignature {
                    rule: spec.label().to_string(),
                    signature: s.to_string(),
                })
            })
            .transpose()?;
        if matches!(spec.action, Action::OverrideDefault(_)) && spec.parameter.is_none() {
            return Err(RuleError::MissingParameter {
                rule: spec.label().to_string(),
                action: spec.action.to_string(),
            });
        }
        Ok(Self {
            spec,
            origin,
            ordinal,
            pattern,
            glob,
            signature,
        })
    }

    #[must_use]
    pub const fn spec(&self) -> &RuleSpec {
        &self.spec
    }

    #[must_use]
    pub const fn action(&self) -> &Action {
        &self.spec.action
    }

    #[must_use]
    pub const fn origin(&self) -> RuleOrigin {
        self.origin
    }

    #[must_use]
    pub const fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub(crate) const fn renumber(&mut self, ordinal: usize) {
        self.ordinal = ordinal;
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.spec.label()
    }

    /// Restricted to one overload by a full signature.
    #[must_use]
    pub const fn is_signature_constrained(&self) -> bool {
        self.signature.is_some()
    }

    #[must_use]
    pub fn specificity(&self) -> Specificity {
        let literal_len = match self.spec.match_kind {
            MatchKind::Glob => self
                .pattern
                .chars()
                .filter(|c| !matches!(c, '*' | '?' | '[' | ']' | '{' | '}'))
                .count(),
            MatchKind::Exact | MatchKind::Prefix => self.pattern.len(),
        };
        Specificity {
            origin: self.origin,
            match_kind: self.spec.match_kind,
            unconstrained: self.signature.is_none(),
            literal_len: Reverse(literal_len),
        }
    }

    fn name_matches(&self, candidate: &str) -> bool {
        match self.spec.match_kind {
            MatchKind::Exact => candidate == self.pattern,
            MatchKind::Prefix => candidate.starts_with(&self.pattern),
            MatchKind::Glob => self.glob.as_ref().is_some_and(|g| g.is_match(candidate)),
        }
    }

    /// Match against one declaration; `None` when the rule does not apply.
    #[must_use]
    pub fn matches(&self, model: &Model, decl: &Decl) -> Option<Targets> {
        if decl.parent.is_none() {
            return None;
        }
        if !self.spec.kinds.is_empty() && !self.spec.kinds.iter().any(|k| k.accepts(model, decl)) {
            return None;
        }
        if !self.action_applies(decl) {
            return None;
        }

        let stripped = strip_template_args(&decl.qualified_name);
        if !self.name_matches(&decl.qualified_name) && !self.name_matches(&stripped) {
            return None;
        }

        if let Some(head) = &self.spec.template {
            if !template_heads(decl).iter().any(|h| head_matches(h, head)) {
                return None;
            }
        }

        if let Some(signature) = &self.signature {
            if !signature.matches(decl.as_function()?) {
                return None;
            }
        }

        match &self.spec.parameter {
            None => Some(Targets::Declaration),
            Some(name) => {
                let function = decl.as_function()?;
                let indices: Vec<usize> = function
                    .params
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.name.as_deref() == Some(name.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                if indices.is_empty() {
                    None
                } else {
                    Some(Targets::Parameters(indices))
                }
            }
        }
    }

    fn action_applies(&self, decl: &Decl) -> bool {
        match &self.spec.action {
            Action::OverrideReturn(_) => match &decl.kind {
                DeclKind::Function(f) => f.return_type.is_some(),
                DeclKind::Typedef(_) | DeclKind::Variable(_) => true,
                _ => false,
            },
            Action::OverrideDefault(_) => decl.as_function().is_some(),
            Action::InjectMarker(_) => {
                matches!(decl.kind, DeclKind::Function(_) | DeclKind::Class(_))
            }
            Action::Suppress
            | Action::Rename(_)
            | Action::SetVisibility(_)
            | Action::Annotate(_) => true,
        }
    }
}

/// Template heads a declaration instantiates or aliases.
fn template_heads(decl: &Decl) -> Vec<String> {
    let mut heads = Vec::new();
    let mut push = |ty: &TypeRef| {
        if let Some(head) = ty.template_head() {
            heads.push(head.to_string());
        }
    };
    match &decl.kind {
        DeclKind::Typedef(td) => {
            push(&td.target);
            if let TypedefResolution::Resolved { ty, .. } = &td.resolution {
                push(ty);
            }
        }
        DeclKind::Class(class) => {
            for base in &class.bases {
                push(&base.ty);
            }
            if let Some((head, _)) = decl.name.split_once('<') {
                heads.push(head.trim().to_string());
            }
        }
        DeclKind::Variable(var) => push(&var.ty),
        DeclKind::Function(f) => {
            if let Some(ret) = &f.return_type {
                push(ret);
            }
        }
        _ => {}
    }
    heads
}

fn head_matches(head: &str, wanted: &str) -> bool {
    let wanted = wanted.trim_start_matches("::");
    head == wanted || head.rsplit("::").next() == Some(wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("(int)", Some(1), None)]
    #[case("()", Some(0), None)]
    #[case("(void)", Some(0), None)]
    #[case("(const QString &, QMap<int, int>) const", Some(2), Some(true))]
    #[case("int)", None, None)]
    #[case("(int) volatile", None, None)]
    fn signature_parsing(
        #[case] text: &str,
        #[case] arity: Option<usize>,
        #[case] constness: Option<bool>,
    ) {
        let parsed = Signature::parse(text);
        assert_eq!(parsed.as_ref().map(|s| s.params.len()), arity);
        if let Some(sig) = parsed {
            assert_eq!(sig.is_const, constness);
        }
    }

    #[test]
    fn specificity_orders_exact_before_glob() {
        let exact = Rule::compile(
            RuleSpec::new("A::f", Action::Suppress).matching(MatchKind::Exact),
            RuleOrigin::User,
            1,
        )
        .unwrap();
        let glob = Rule::compile(RuleSpec::new("A::*", Action::Suppress), RuleOrigin::User, 0)
            .unwrap();
        assert!(exact.specificity() < glob.specificity());
    }

    #[test]
    fn signature_constrained_beats_name_only() {
        let name_only = Rule::compile(
            RuleSpec::new("A::f", Action::Suppress).matching(MatchKind::Exact),
            RuleOrigin::User,
            0,
        )
        .unwrap();
        let sig = Rule::compile(
            RuleSpec::new("A::f", Action::Suppress)
                .matching(MatchKind::Exact)
                .signature("(int)"),
            RuleOrigin::User,
            1,
        )
        .unwrap();
        assert!(sig.specificity() < name_only.specificity());
    }

    #[test]
    fn builtin_origin_sorts_after_user() {
        let user = Rule::compile(RuleSpec::new("*", Action::Suppress), RuleOrigin::User, 5).unwrap();
        let builtin = Rule::compile(
            RuleSpec::new("A::f", Action::Suppress).matching(MatchKind::Exact),
            RuleOrigin::Builtin,
            0,
        )
        .unwrap();
        assert!(user.specificity() < builtin.specificity());
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let err = Rule::compile(RuleSpec::new("A::[", Action::Suppress), RuleOrigin::User, 0)
            .unwrap_err();
        assert!(matches!(err, RuleError::InvalidGlob { .. }));
    }

    #[test]
    fn override_default_needs_parameter() {
        let err = Rule::compile(
            RuleSpec::new("f", Action::OverrideDefault("0".into())),
            RuleOrigin::User,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::MissingParameter { .. }));
    }

    #[rstest]
    #[case("QFlags", "QFlags", true)]
    #[case("Qt::QFlags", "QFlags", true)]
    #[case("QFlags", "::QFlags", true)]
    #[case("QList", "QFlags", false)]
    fn template_head_comparison(#[case] head: &str, #[case] wanted: &str, #[case] expected: bool) {
        assert_eq!(head_matches(head, wanted), expected);
    }
}
