//! Structural type references parsed from C++ type spellings.
//!
//! A [`TypeRef`] is an immutable value: two declarations naming `const QString &`
//! hold equal (not identical) values. Spellings the parser cannot structure
//! are kept verbatim as [`TypeRef::Unparsed`].

use std::fmt;

/// Words that make up builtin arithmetic and void types.
const PRIMITIVE_WORDS: &[&str] = &[
    "void", "bool", "char", "wchar_t", "char8_t", "char16_t", "char32_t", "short", "int", "long",
    "float", "double", "signed", "unsigned",
];

/// Keywords skipped while reading declaration specifiers.
const IGNORED_SPECIFIERS: &[&str] = &[
    "volatile", "typename", "struct", "class", "enum", "union", "mutable", "constexpr", "inline",
    "static", "extern", "register",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Builtin arithmetic or `void` type, words in canonical order.
    Primitive(String),
    /// Class, struct, enum, or typedef reference by possibly-qualified name.
    Named(String),
    /// `head<args...>`.
    Template {
        head: String,
        args: Vec<TemplateArg>,
    },
    FunctionPointer {
        ret: Box<Self>,
        params: Vec<Self>,
    },
    Pointer(Box<Self>),
    LValueRef(Box<Self>),
    RValueRef(Box<Self>),
    Const(Box<Self>),
    Array {
        element: Box<Self>,
        extent: Option<String>,
    },
    /// Whitespace-normalized source spelling the parser could not structure.
    Unparsed(String),
}

/// Template argument: a type, or a constant expression kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateArg {
    Type(TypeRef),
    Value(String),
}

impl TypeRef {
    /// Parse a C++ type spelling such as `const QMap<int, QString> &`.
    ///
    /// Never fails: unstructurable spellings become [`TypeRef::Unparsed`].
    #[must_use]
    pub fn parse(spelling: &str) -> Self {
        let toks = tokenize(spelling);
        let mut parser = TypeParser { toks, pos: 0 };
        match parser.parse_type() {
            Some(ty) if parser.at_end_or_name() => ty,
            _ => Self::Unparsed(normalize_whitespace(spelling)),
        }
    }

    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    #[must_use]
    pub fn pointer(inner: Self) -> Self {
        Self::Pointer(Box::new(inner))
    }

    #[must_use]
    pub fn lvalue_ref(inner: Self) -> Self {
        Self::LValueRef(Box::new(inner))
    }

    #[must_use]
    pub fn constant(inner: Self) -> Self {
        Self::Const(Box::new(inner))
    }

    /// The type with top-level `const` and references removed.
    #[must_use]
    pub fn unqualified(&self) -> &Self {
        match self {
            Self::Const(inner) | Self::LValueRef(inner) | Self::RValueRef(inner) => {
                inner.unqualified()
            }
            other => other,
        }
    }

    #[must_use]
    pub fn is_pointer(&self) -> bool {
        matches!(self.unqualified(), Self::Pointer(_) | Self::FunctionPointer { .. })
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Primitive(p) if p == "void")
    }

    /// Name of the referenced class/enum/typedef or template head, if any.
    #[must_use]
    pub fn head_name(&self) -> Option<&str> {
        match self.unqualified() {
            Self::Named(name) => Some(name),
            Self::Template { head, .. } => Some(head),
            _ => None,
        }
    }

    /// Head of a template instantiation, ignoring cv/ref qualifiers.
    #[must_use]
    pub fn template_head(&self) -> Option<&str> {
        match self.unqualified() {
            Self::Template { head, .. } => Some(head),
            _ => None,
        }
    }

    /// Whether every part of the type has a structured form.
    #[must_use]
    pub fn is_representable(&self) -> bool {
        match self {
            Self::Unparsed(_) => false,
            Self::Primitive(_) | Self::Named(_) => true,
            Self::Template { args, .. } => args.iter().all(|a| match a {
                TemplateArg::Type(t) => t.is_representable(),
                TemplateArg::Value(_) => true,
            }),
            Self::FunctionPointer { ret, params } => {
                ret.is_representable() && params.iter().all(Self::is_representable)
            }
            Self::Pointer(inner)
            | Self::LValueRef(inner)
            | Self::RValueRef(inner)
            | Self::Const(inner) => inner.is_representable(),
            Self::Array { element, .. } => element.is_representable(),
        }
    }

    /// Spell a declaration of `name` with this type: `const QString &name`,
    /// `int (*name)(int)`, `char name[16]`.
    #[must_use]
    pub fn declare(&self, name: &str) -> String {
        match self {
            Self::FunctionPointer { ret, params } => {
                format!("{}(*{name})({})", leading(ret), join_types(params))
            }
            Self::Array { element, extent } => {
                format!("{}[{}]", element.declare(name), extent.as_deref().unwrap_or(""))
            }
            other => {
                let spelled = other.to_string();
                if name.is_empty() {
                    spelled
                } else if spelled.ends_with('*') || spelled.ends_with('&') {
                    format!("{spelled}{name}")
                } else {
                    format!("{spelled} {name}")
                }
            }
        }
    }
}

fn join_types(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A type spelled in front of a declarator: `int ` but `char *`.
fn leading(ty: &TypeRef) -> String {
    let spelled = ty.to_string();
    if spelled.ends_with('*') || spelled.ends_with('&') {
        spelled
    } else {
        format!("{spelled} ")
    }
}

fn append_declarator(f: &mut fmt::Formatter<'_>, inner: &TypeRef, op: &str) -> fmt::Result {
    let spelled = inner.to_string();
    if spelled.ends_with('*') || spelled.ends_with('&') {
        write!(f, "{spelled}{op}")
    } else {
        write!(f, "{spelled} {op}")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(name) | Self::Named(name) | Self::Unparsed(name) => f.write_str(name),
            Self::Template { head, args } => {
                write!(f, "{head}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match arg {
                        TemplateArg::Type(t) => write!(f, "{t}")?,
                        TemplateArg::Value(v) => f.write_str(v)?,
                    }
                }
                f.write_str(">")
            }
            Self::FunctionPointer { ret, params } => {
                write!(f, "{}(*)({})", leading(ret), join_types(params))
            }
            Self::Pointer(inner) => append_declarator(f, inner, "*"),
            Self::LValueRef(inner) => append_declarator(f, inner, "&"),
            Self::RValueRef(inner) => append_declarator(f, inner, "&&"),
            Self::Const(inner) => match **inner {
                Self::Pointer(_) | Self::LValueRef(_) | Self::RValueRef(_) => {
                    write!(f, "{inner}const")
                }
                _ => write!(f, "const {inner}"),
            },
            Self::Array { element, extent } => {
                write!(f, "{element}[{}]", extent.as_deref().unwrap_or(""))
            }
        }
    }
}

/// Remove every `<...>` argument list from a qualified name:
/// `Traits<int>::Inner<char>` becomes `Traits::Inner`.
#[must_use]
pub fn strip_template_args(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut depth = 0usize;
    for ch in name.chars() {
        match ch {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
    }
    out.trim().to_string()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Word(String),
    Scope,
    Lt,
    Gt,
    Comma,
    Star,
    Amp,
    AmpAmp,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Ellipsis,
    Other(String),
}

impl Tok {
    fn text(&self) -> &str {
        match self {
            Self::Word(w) | Self::Other(w) => w,
            Self::Scope => "::",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Comma => ",",
            Self::Star => "*",
            Self::Amp => "&",
            Self::AmpAmp => "&&",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Ellipsis => "...",
        }
    }
}

fn tokenize(text: &str) -> Vec<Tok> {
    let chars: Vec<char> = text.chars().collect();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c.is_alphanumeric() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            toks.push(Tok::Word(chars[start..i].iter().collect()));
        } else {
            let next = chars.get(i + 1).copied();
            let (tok, len) = match (c, next) {
                (':', Some(':')) => (Tok::Scope, 2),
                ('&', Some('&')) => (Tok::AmpAmp, 2),
                ('.', Some('.')) if chars.get(i + 2) == Some(&'.') => (Tok::Ellipsis, 3),
                ('<', _) => (Tok::Lt, 1),
                ('>', _) => (Tok::Gt, 1),
                (',', _) => (Tok::Comma, 1),
                ('*', _) => (Tok::Star, 1),
                ('&', _) => (Tok::Amp, 1),
                ('(', _) => (Tok::LParen, 1),
                (')', _) => (Tok::RParen, 1),
                ('[', _) => (Tok::LBracket, 1),
                (']', _) => (Tok::RBracket, 1),
                (other, _) => (Tok::Other(other.to_string()), 1),
            };
            toks.push(tok);
            i += len;
        }
    }
    toks
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct TypeParser {
    toks: Vec<Tok>,
    pos: usize,
}

impl TypeParser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.toks.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == Some(tok) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Tok::Word(w)) => Some(w),
            _ => None,
        }
    }

    /// Spellings may carry a declarator name (`int count`); accept one trailing word.
    fn at_end_or_name(&self) -> bool {
        match self.toks.len().saturating_sub(self.pos) {
            0 => true,
            1 => matches!(self.peek(), Some(Tok::Word(w)) if is_identifier(w)),
            _ => false,
        }
    }

    fn parse_type(&mut self) -> Option<TypeRef> {
        let base = self.parse_specifiers()?;
        self.parse_declarator(base)
    }

    fn parse_specifiers(&mut self) -> Option<TypeRef> {
        let mut is_const = false;
        let mut words: Vec<String> = Vec::new();
        let mut named: Option<TypeRef> = None;

        loop {
            match self.peek() {
                Some(Tok::Word(w)) if w == "const" => {
                    is_const = true;
                    self.pos += 1;
                }
                Some(Tok::Word(w)) if IGNORED_SPECIFIERS.contains(&w.as_str()) => {
                    self.pos += 1;
                }
                Some(Tok::Word(w)) if named.is_none() && PRIMITIVE_WORDS.contains(&w.as_str()) => {
                    words.push(w.clone());
                    self.pos += 1;
                }
                Some(Tok::Word(w)) if named.is_none() && words.is_empty() && is_identifier(w) => {
                    named = Some(self.parse_qualified()?);
                }
                Some(Tok::Scope) if named.is_none() && words.is_empty() => {
                    self.pos += 1;
                    named = Some(self.parse_qualified()?);
                }
                _ => break,
            }
        }

        let base = match named {
            Some(ty) => ty,
            None if !words.is_empty() => TypeRef::Primitive(canonical_primitive(&words)),
            None => return None,
        };
        Some(if is_const {
            TypeRef::Const(Box::new(base))
        } else {
            base
        })
    }

    fn parse_qualified(&mut self) -> Option<TypeRef> {
        let mut text = String::new();
        loop {
            let word = self.peek_word()?.to_string();
            if !is_identifier(&word) {
                return None;
            }
            self.pos += 1;
            text.push_str(&word);

            if self.peek() == Some(&Tok::Lt) {
                self.pos += 1;
                let args = self.parse_template_args()?;
                if self.peek() == Some(&Tok::Scope) && matches!(self.peek_at(1), Some(Tok::Word(_))) {
                    let inst = TypeRef::Template {
                        head: std::mem::take(&mut text),
                        args,
                    };
                    text = format!("{inst}::");
                    self.pos += 1;
                    continue;
                }
                return Some(TypeRef::Template { head: text, args });
            }

            if self.peek() == Some(&Tok::Scope) && matches!(self.peek_at(1), Some(Tok::Word(_))) {
                self.pos += 1;
                text.push_str("::");
                continue;
            }
            return Some(TypeRef::Named(text));
        }
    }

    fn parse_template_args(&mut self) -> Option<Vec<TemplateArg>> {
        let mut args = Vec::new();
        if self.eat(&Tok::Gt) {
            return Some(args);
        }
        loop {
            let start = self.pos;
            let as_type = self
                .parse_type()
                .filter(|_| matches!(self.peek(), Some(Tok::Comma | Tok::Gt)));
            if let Some(ty) = as_type {
                args.push(TemplateArg::Type(ty));
            } else {
                self.pos = start;
                args.push(TemplateArg::Value(self.raw_value_arg()?));
            }
            match self.bump()? {
                Tok::Comma => {}
                Tok::Gt => return Some(args),
                _ => return None,
            }
        }
    }

    /// Consume a non-type template argument up to the next top-level `,` or `>`.
    fn raw_value_arg(&mut self) -> Option<String> {
        let mut depth = 0usize;
        let mut out = String::new();
        let mut prev_word = false;
        while let Some(tok) = self.peek() {
            match tok {
                Tok::Comma | Tok::Gt if depth == 0 => break,
                Tok::LParen => depth += 1,
                Tok::RParen => depth = depth.checked_sub(1)?,
                _ => {}
            }
            let is_word = matches!(tok, Tok::Word(_));
            if is_word && prev_word {
                out.push(' ');
            }
            out.push_str(tok.text());
            prev_word = is_word;
            self.pos += 1;
        }
        if out.is_empty() { None } else { Some(out) }
    }

    fn parse_declarator(&mut self, mut ty: TypeRef) -> Option<TypeRef> {
        loop {
            match self.peek() {
                Some(Tok::Star) => ty = TypeRef::Pointer(Box::new(ty)),
                Some(Tok::Amp) => ty = TypeRef::LValueRef(Box::new(ty)),
                Some(Tok::AmpAmp) => ty = TypeRef::RValueRef(Box::new(ty)),
                Some(Tok::Word(w)) if w == "const" => ty = TypeRef::Const(Box::new(ty)),
                Some(Tok::Word(w)) if w == "volatile" => {}
                _ => break,
            }
            self.pos += 1;
        }

        if self.peek() == Some(&Tok::LParen) {
            ty = self.parse_function_pointer(ty)?;
        }

        if self.peek() == Some(&Tok::LBracket)
            || (matches!(self.peek(), Some(Tok::Word(_))) && self.peek_at(1) == Some(&Tok::LBracket))
        {
            if self.peek() != Some(&Tok::LBracket) {
                self.pos += 1;
            }
            self.pos += 1;
            let mut extent = String::new();
            loop {
                match self.bump()? {
                    Tok::RBracket => break,
                    tok => extent.push_str(tok.text()),
                }
            }
            ty = TypeRef::Array {
                element: Box::new(ty),
                extent: if extent.is_empty() { None } else { Some(extent) },
            };
        }
        Some(ty)
    }

    /// `ret (*[name])(params)`; pointers to members and nested declarators are rejected.
    fn parse_function_pointer(&mut self, ret: TypeRef) -> Option<TypeRef> {
        self.pos += 1;
        if !self.eat(&Tok::Star) {
            return None;
        }
        while matches!(self.peek(), Some(Tok::Word(w)) if w == "const") {
            self.pos += 1;
        }
        if matches!(self.peek(), Some(Tok::Word(_))) {
            self.pos += 1;
        }
        if !self.eat(&Tok::RParen) || !self.eat(&Tok::LParen) {
            return None;
        }
        let params = self.parse_param_list()?;
        while matches!(self.peek(), Some(Tok::Word(w)) if w == "const" || w == "noexcept") {
            self.pos += 1;
        }
        Some(TypeRef::FunctionPointer {
            ret: Box::new(ret),
            params,
        })
    }

    fn parse_param_list(&mut self) -> Option<Vec<TypeRef>> {
        let mut params = Vec::new();
        if self.eat(&Tok::RParen) {
            return Some(params);
        }
        if self.peek_word() == Some("void") && self.peek_at(1) == Some(&Tok::RParen) {
            self.pos += 2;
            return Some(params);
        }
        loop {
            if self.eat(&Tok::Ellipsis) {
                params.push(TypeRef::Unparsed("...".to_string()));
            } else {
                params.push(self.parse_type()?);
                if matches!(self.peek(), Some(Tok::Word(w)) if is_identifier(w)) {
                    self.pos += 1;
                }
            }
            match self.bump()? {
                Tok::Comma => {}
                Tok::RParen => return Some(params),
                _ => return None,
            }
        }
    }
}

fn is_identifier(word: &str) -> bool {
    word.chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && !matches!(word, "const" | "volatile" | "operator")
}

/// Order primitive words: signedness, then size, then the base word.
fn canonical_primitive(words: &[String]) -> String {
    let rank = |w: &str| match w {
        "signed" | "unsigned" => 0,
        "short" | "long" => 1,
        _ => 2,
    };
    let mut sorted: Vec<&str> = words.iter().map(String::as_str).collect();
    sorted.sort_by_key(|w| rank(w));
    sorted.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("int", "int")]
    #[case("unsigned   int", "unsigned int")]
    #[case("long unsigned int", "unsigned long int")]
    #[case("const QString&", "const QString &")]
    #[case("QString const &", "const QString &")]
    #[case("char**", "char **")]
    #[case("const char * const", "const char *const")]
    #[case("QMap<int,QString>", "QMap<int, QString>")]
    #[case("QList<QList<int>>", "QList<QList<int>>")]
    #[case("std::array<int, 4>", "std::array<int, 4>")]
    #[case("void (*)(int, char)", "void (*)(int, char)")]
    #[case("int(*)(void)", "int (*)()")]
    #[case("struct Point *", "Point *")]
    #[case("QString&&", "QString &&")]
    #[case("int[4]", "int[4]")]
    #[case("::Qt::AlignmentFlag", "Qt::AlignmentFlag")]
    fn canonical_spelling(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(TypeRef::parse(input).to_string(), expected);
    }

    #[test]
    fn structure_of_reference_to_const() {
        assert_eq!(
            TypeRef::parse("const QString &"),
            TypeRef::lvalue_ref(TypeRef::constant(TypeRef::named("QString")))
        );
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(TypeRef::parse("QList< int >"), TypeRef::parse("QList<int>"));
        assert_ne!(TypeRef::parse("QList<int>"), TypeRef::parse("QVector<int>"));
    }

    #[test]
    fn template_value_arguments() {
        let ty = TypeRef::parse("Buffer<char, N + 1>");
        assert_eq!(
            ty,
            TypeRef::Template {
                head: "Buffer".to_string(),
                args: vec![
                    TemplateArg::Type(TypeRef::primitive("char")),
                    TemplateArg::Value("N+1".to_string()),
                ],
            }
        );
    }

    #[test]
    fn nested_template_scope_is_named() {
        let ty = TypeRef::parse("QList<int>::iterator");
        assert_eq!(ty, TypeRef::named("QList<int>::iterator"));
        assert_eq!(ty.head_name(), Some("QList<int>::iterator"));
    }

    #[test]
    fn function_pointer_structure() {
        let ty = TypeRef::parse("const char *(*)(int, double)");
        let TypeRef::FunctionPointer { ret, params } = &ty else {
            panic!("expected function pointer, got {ty:?}");
        };
        assert_eq!(ret.to_string(), "const char *");
        assert_eq!(params.len(), 2);
        assert_eq!(ty.declare("Callback"), "const char *(*Callback)(int, double)");
    }

    #[rstest]
    #[case("int (Foo::*)(int)")]
    #[case("void (*(*)(int))(double)")]
    fn unstructurable_shapes_stay_unparsed(#[case] input: &str) {
        let ty = TypeRef::parse(input);
        assert!(matches!(ty, TypeRef::Unparsed(_)), "{ty:?}");
        assert!(!ty.is_representable());
    }

    #[rstest]
    #[case("const QString &", "prefix", "const QString &prefix")]
    #[case("int", "count", "int count")]
    #[case("char *", "name", "char *name")]
    #[case("char[16]", "buf", "char buf[16]")]
    fn declare_places_name(#[case] ty: &str, #[case] name: &str, #[case] expected: &str) {
        assert_eq!(TypeRef::parse(ty).declare(name), expected);
    }

    #[test]
    fn spelling_with_declarator_name_is_accepted() {
        assert_eq!(TypeRef::parse("int count"), TypeRef::primitive("int"));
    }

    #[test]
    fn unqualified_strips_const_and_refs() {
        let ty = TypeRef::parse("const QFlags<Option> &");
        assert_eq!(ty.template_head(), Some("QFlags"));
        assert!(!ty.is_pointer());
        assert!(TypeRef::parse("QObject * const").is_pointer());
    }

    #[rstest]
    #[case("Traits<int>::Inner", "Traits::Inner")]
    #[case("QFlags<Qt::MatchFlag>", "QFlags")]
    #[case("A<B<C>>::D<E>", "A::D")]
    #[case("Plain::Name", "Plain::Name")]
    fn template_args_stripped(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_template_args(input), expected);
    }
}
