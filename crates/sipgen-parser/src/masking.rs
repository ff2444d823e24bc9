//! Macro masking ahead of tree-sitter.
//!
//! tree-sitter-cpp sees unexpanded source, so `class MYLIB_EXPORT Widget` or a
//! bare `Q_OBJECT` line derails the grammar. Annotation and Qt statement
//! macros are overwritten with spaces before parsing. Byte offsets stay valid,
//! so the converter can re-attach every masked macro to the declaration it
//! sits in front of.

use std::ops::Range;

use sipgen_model::attributes::{AttributeClass, classify_attribute};

/// How a masked macro is re-attached to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroRole {
    /// Annotation on the following declaration (`MYLIB_EXPORT`, `Q_DECL_DEPRECATED`).
    Attribute,
    /// Declaration-like statement (`Q_OBJECT`, `Q_DECLARE_FLAGS(Flags, Flag)`).
    Statement,
}

/// One macro blanked out of the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedMacro {
    pub range: Range<usize>,
    pub text: String,
    pub role: MacroRole,
}

/// Qt statement macros, with or without an argument list.
const STATEMENT_MACROS: &[&str] = &[
    "Q_OBJECT",
    "Q_GADGET",
    "Q_NAMESPACE",
    "Q_DECLARE_FLAGS",
    "Q_DECLARE_OPERATORS_FOR_FLAGS",
    "Q_DECLARE_PRIVATE",
    "Q_DECLARE_PRIVATE_D",
    "Q_DECLARE_PUBLIC",
    "Q_DECLARE_METATYPE",
    "Q_DECLARE_TYPEINFO",
    "Q_DECLARE_INTERFACE",
    "Q_DISABLE_COPY",
    "Q_DISABLE_MOVE",
    "Q_DISABLE_COPY_MOVE",
    "Q_PROPERTY",
    "Q_PRIVATE_PROPERTY",
    "Q_PRIVATE_SLOT",
    "Q_ENUM",
    "Q_ENUMS",
    "Q_ENUM_NS",
    "Q_FLAG",
    "Q_FLAGS",
    "Q_FLAG_NS",
    "Q_INTERFACES",
    "Q_CLASSINFO",
];

/// Blanked without a trace.
const SILENT_MACROS: &[&str] = &["QT_BEGIN_NAMESPACE", "QT_END_NAMESPACE"];

/// Macros with a plain keyword equivalent.
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("Q_DECL_OVERRIDE", "override"),
    ("Q_DECL_FINAL", "final"),
    ("Q_DECL_CONSTEXPR", "constexpr"),
    ("Q_DECL_NOEXCEPT", "noexcept"),
    ("Q_DECL_NOTHROW", "noexcept"),
    ("Q_NULLPTR", "nullptr"),
];

/// Qt access-section keywords, rewritten only when followed by `:`.
const ACCESS_KEYWORDS: &[(&str, &str)] = &[
    ("signals", "public"),
    ("Q_SIGNALS", "public"),
    ("slots", ""),
    ("Q_SLOTS", ""),
];

/// Header source with macros blanked, plus what was blanked.
#[derive(Debug, Clone)]
pub struct MaskedSource {
    text: String,
    macros: Vec<MaskedMacro>,
}

struct Mask {
    range: Range<usize>,
    replacement: &'static str,
    role: Option<MacroRole>,
}

impl MaskedSource {
    #[must_use]
    pub fn new(source: &str) -> Self {
        let bytes = source.as_bytes();
        let mut text = source.to_string();
        let mut macros = Vec::new();
        let mut line_start = true;
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\n' => {
                    line_start = true;
                    i += 1;
                }
                b' ' | b'\t' | b'\r' => i += 1,
                b'#' if line_start => i = skip_directive(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => i = skip_line(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
                b'"' | b'\'' => {
                    line_start = false;
                    i = skip_literal(bytes, i);
                }
                b if is_ident_start(b) => {
                    line_start = false;
                    let end = ident_end(bytes, i);
                    match classify_word(source, i..end) {
                        Some(mask) => {
                            let len = mask.range.len();
                            let padded = format!("{:<len$}", mask.replacement);
                            text.replace_range(mask.range.clone(), &padded);
                            if let Some(role) = mask.role {
                                macros.push(MaskedMacro {
                                    text: source[mask.range.clone()].to_string(),
                                    range: mask.range.clone(),
                                    role,
                                });
                            }
                            i = mask.range.end;
                        }
                        None => i = end,
                    }
                }
                _ => {
                    line_start = false;
                    i += 1;
                }
            }
        }
        Self { text, macros }
    }

    /// Source as tree-sitter should see it.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn macros(&self) -> &[MaskedMacro] {
        &self.macros
    }

    /// Masked macros of `role` starting inside `span`, in source order.
    pub fn within(
        &self,
        span: Range<usize>,
        role: MacroRole,
    ) -> impl Iterator<Item = &MaskedMacro> + '_ {
        self.macros
            .iter()
            .filter(move |m| m.role == role && span.contains(&m.range.start))
    }
}

fn classify_word(source: &str, word: Range<usize>) -> Option<Mask> {
    let bytes = source.as_bytes();
    let token = &source[word.clone()];

    if let Some((_, keyword)) = ACCESS_KEYWORDS.iter().find(|(k, _)| *k == token) {
        let next = skip_blanks(bytes, word.end);
        return (bytes.get(next) == Some(&b':') && bytes.get(next + 1) != Some(&b':')).then(|| {
            Mask {
                range: word,
                replacement: keyword,
                role: None,
            }
        });
    }
    if let Some((_, keyword)) = SUBSTITUTIONS.iter().find(|(m, _)| *m == token) {
        return Some(Mask {
            range: word,
            replacement: keyword,
            role: None,
        });
    }
    if SILENT_MACROS.contains(&token) {
        return Some(Mask {
            range: word,
            replacement: "",
            role: None,
        });
    }
    if STATEMENT_MACROS.contains(&token) {
        let mut end = skip_args(bytes, word.end).unwrap_or(word.end);
        let semicolon = skip_blanks(bytes, end);
        if bytes.get(semicolon) == Some(&b';') {
            end = semicolon + 1;
        }
        return Some(Mask {
            range: word.start..end,
            replacement: "",
            role: Some(MacroRole::Statement),
        });
    }
    if is_upper_snake(token) && classify_attribute(token) != AttributeClass::Unknown {
        let end = skip_args(bytes, word.end).unwrap_or(word.end);
        return Some(Mask {
            range: word.start..end,
            replacement: "",
            role: Some(MacroRole::Attribute),
        });
    }
    None
}

// ---------------------------------------------------------------------------
// Lexing helpers
// ---------------------------------------------------------------------------

const fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn ident_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))
        .map_or(bytes.len(), |p| start + p)
}

fn is_upper_snake(token: &str) -> bool {
    token.contains('_')
        && token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

fn skip_blanks(bytes: &[u8], mut i: usize) -> usize {
    while matches!(bytes.get(i), Some(b' ' | b'\t')) {
        i += 1;
    }
    i
}

/// End of a balanced `( ... )` group starting after optional blanks at `from`.
fn skip_args(bytes: &[u8], from: usize) -> Option<usize> {
    let mut i = skip_blanks(bytes, from);
    if bytes.get(i) != Some(&b'(') {
        return None;
    }
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| from + p)
}

/// Preprocessor lines, including backslash continuations.
fn skip_directive(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    loop {
        let end = skip_line(bytes, i);
        let continued = bytes[i..end]
            .iter()
            .rev()
            .find(|b| **b != b'\r')
            .is_some_and(|b| *b == b'\\');
        if !continued || end >= bytes.len() {
            return end;
        }
        i = end + 1;
    }
}

fn skip_block_comment(bytes: &[u8], from: usize) -> usize {
    bytes[from + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |p| from + 2 + p + 2)
}

fn skip_literal(bytes: &[u8], from: usize) -> usize {
    let quote = bytes[from];
    let mut i = from + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}
