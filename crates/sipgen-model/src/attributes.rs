//! Collapse of macro-derived annotations into the closed attribute set.
//!
//! Export macros, GCC visibility attributes, and deprecation markers all arrive
//! as raw annotation text. They are classified once here; nothing after the
//! builder sees macro tokens.

/// Classification of one raw annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeClass {
    Export,
    Hidden,
    Deprecated,
    /// Known annotation with no effect on bindings.
    Ignored,
    Unknown,
}

/// Annotations that carry no binding-relevant meaning.
const IGNORED_PREFIXES: &[&str] = &[
    "Q_REQUIRED_RESULT",
    "Q_DECL_",
    "Q_INVOKABLE",
    "Q_SLOT",
    "Q_SIGNAL",
    "Q_SCRIPTABLE",
    "Q_ALWAYS_INLINE",
    "Q_NORETURN",
    "format(printf",
    "format (printf",
    "__format__",
    "nodiscard",
    "maybe_unused",
    "noreturn",
    "final",
    "override",
    "noexcept",
    "always_inline",
    "warn_unused_result",
    "pure",
    "const",
    "nonnull",
];

#[must_use]
pub fn classify_attribute(raw: &str) -> AttributeClass {
    let text = raw
        .trim()
        .trim_start_matches("[[")
        .trim_end_matches("]]")
        .trim_start_matches("__attribute__")
        .trim_start_matches("((")
        .trim_end_matches("))")
        .trim();
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.to_ascii_lowercase().contains("deprecated") {
        AttributeClass::Deprecated
    } else if compact.ends_with("_NO_EXPORT")
        || compact.contains("visibility(\"hidden\")")
        || compact.contains("visibility(\"internal\")")
    {
        AttributeClass::Hidden
    } else if compact.ends_with("_EXPORT")
        || compact.contains("visibility(\"default\")")
        || compact.contains("dllexport")
        || compact.contains("dllimport")
    {
        AttributeClass::Export
    } else if IGNORED_PREFIXES.iter().any(|p| compact.starts_with(p)) {
        AttributeClass::Ignored
    } else {
        AttributeClass::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("MYLIB_EXPORT", AttributeClass::Export)]
    #[case("MYLIB_NO_EXPORT", AttributeClass::Hidden)]
    #[case("__attribute__((visibility(\"hidden\")))", AttributeClass::Hidden)]
    #[case("__attribute__ ((visibility (\"default\")))", AttributeClass::Export)]
    #[case("__declspec(dllexport)", AttributeClass::Export)]
    #[case("MYLIB_DEPRECATED", AttributeClass::Deprecated)]
    #[case("MYLIB_DEPRECATED_EXPORT", AttributeClass::Deprecated)]
    #[case("[[deprecated(\"use other\")]]", AttributeClass::Deprecated)]
    #[case("Q_REQUIRED_RESULT", AttributeClass::Ignored)]
    #[case("Q_DECL_CONSTEXPR", AttributeClass::Ignored)]
    #[case("__attribute__((format(printf, 1, 2)))", AttributeClass::Ignored)]
    #[case("[[nodiscard]]", AttributeClass::Ignored)]
    #[case("MY_WEIRD_MACRO", AttributeClass::Unknown)]
    fn classifies(#[case] raw: &str, #[case] expected: AttributeClass) {
        assert_eq!(classify_attribute(raw), expected);
    }
}
