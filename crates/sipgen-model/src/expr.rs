//! Default-value and enumerator expressions kept as token streams.
//!
//! An [`Expr`] is opaque to the model: it is tokenized once, never evaluated
//! for emission, and printed back through a canonical pretty-printer so that
//! unchanged input re-emits byte-identically regardless of source spacing.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Token {
    /// Identifier, possibly `::`-qualified (`Outer::Val1`, `::Global`).
    Ident(String),
    Number(String),
    /// String literal including quotes and any encoding prefix.
    Str(String),
    Char(String),
    Punct(String),
    /// `<` opening a template argument list.
    TemplateOpen,
    /// `>` closing a template argument list.
    TemplateClose,
}

impl Token {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Ident(t) | Self::Number(t) | Self::Str(t) | Self::Char(t) | Self::Punct(t) => t,
            Self::TemplateOpen => "<",
            Self::TemplateClose => ">",
        }
    }

    const fn is_operand(&self) -> bool {
        matches!(
            self,
            Self::Ident(_) | Self::Number(_) | Self::Str(_) | Self::Char(_)
        )
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(self, Self::Punct(t) if t == p)
    }
}

/// Spellings of the null pointer accepted in source.
pub const NULL_SPELLINGS: &[&str] = &["nullptr", "NULL", "Q_NULLPTR", "__null"];

const PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "<=>", "...", "->*", "<<", "<=", ">=", "==", "!=", "&&", "||", "->", "++", "--",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", ".*",
];

const BINARY_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "<<", ">>", "<", ">", "<=", ">=", "<=>", "==", "!=", "&", "|", "^",
    "&&", "||", "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "?", ":",
];

/// A tokenized C++ expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Expr {
    tokens: Vec<Token>,
}

impl Expr {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut tokens = tokenize(text);
        mark_templates(&mut tokens);
        Self { tokens }
    }

    #[must_use]
    pub const fn from_tokens(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Exactly `{}`.
    #[must_use]
    pub fn is_empty_braces(&self) -> bool {
        matches!(self.tokens.as_slice(), [open, close] if open.is_punct("{") && close.is_punct("}"))
    }

    /// A lone null-pointer spelling (`NULL`, `Q_NULLPTR`, ...); `0` does not count.
    #[must_use]
    pub fn is_null_pointer(&self) -> bool {
        matches!(self.tokens.as_slice(), [Token::Ident(name)] if NULL_SPELLINGS.contains(&name.as_str()))
    }

    /// Rewrite value identifiers.
    ///
    /// Identifiers in call position (`f(`) or after member access are left
    /// alone; `f` returns `None` to keep an identifier unchanged.
    #[must_use]
    pub fn map_identifiers(&self, mut f: impl FnMut(&str) -> Option<String>) -> Self {
        let mut tokens = self.tokens.clone();
        for i in 0..tokens.len() {
            let Token::Ident(name) = &tokens[i] else {
                continue;
            };
            let called = tokens
                .get(i + 1)
                .is_some_and(|t| t.is_punct("(") || *t == Token::TemplateOpen);
            let member = i > 0 && (tokens[i - 1].is_punct(".") || tokens[i - 1].is_punct("->"));
            if called || member {
                continue;
            }
            if let Some(replacement) = f(name) {
                tokens[i] = Token::Ident(replacement);
            }
        }
        Self { tokens }
    }

    /// `Type{}` value-initialization becomes `Type()`.
    #[must_use]
    pub fn with_call_init(&self) -> Self {
        let mut tokens = self.tokens.clone();
        for i in 1..tokens.len().saturating_sub(1) {
            let after_type = matches!(tokens[i - 1], Token::Ident(_) | Token::TemplateClose);
            if after_type && tokens[i].is_punct("{") && tokens[i + 1].is_punct("}") {
                tokens[i] = Token::Punct("(".to_string());
                tokens[i + 1] = Token::Punct(")".to_string());
            }
        }
        Self { tokens }
    }

    /// Evaluate an integral constant expression.
    ///
    /// `lookup` resolves identifiers (earlier enumerators). Returns `None` for
    /// anything outside integer arithmetic.
    #[must_use]
    pub fn eval_integer(&self, lookup: impl Fn(&str) -> Option<i64>) -> Option<i64> {
        let mut eval = Evaluator {
            tokens: &self.tokens,
            pos: 0,
            lookup: &lookup,
        };
        let value = eval.bitor()?;
        (eval.pos == self.tokens.len()).then_some(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut space_pending = false;
        for (i, tok) in self.tokens.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| &self.tokens[p]);
            let binary = is_binary_at(&self.tokens, i);

            let space = if i == 0 {
                false
            } else if binary || space_pending {
                true
            } else {
                match (prev, tok) {
                    (Some(p), t) if p.is_operand() && t.is_operand() => true,
                    (Some(Token::TemplateClose), t) if t.is_operand() => {
                        !t.text().starts_with("::")
                    }
                    _ => false,
                }
            };
            if space {
                f.write_str(" ")?;
            }
            f.write_str(tok.text())?;
            space_pending = binary || tok.is_punct(",");
        }
        Ok(())
    }
}

/// Whether the operator at `i` is used as a binary operator.
fn is_binary_at(tokens: &[Token], i: usize) -> bool {
    let Token::Punct(op) = &tokens[i] else {
        return false;
    };
    if !BINARY_OPERATORS.contains(&op.as_str()) {
        return false;
    }
    if !matches!(op.as_str(), "+" | "-" | "*" | "&") {
        return true;
    }
    if matches!(op.as_str(), "*" | "&") && closes_declarator(&tokens[i + 1..]) {
        return false;
    }
    // Unary when there is no left operand.
    match i.checked_sub(1).map(|p| &tokens[p]) {
        None => false,
        Some(Token::Punct(p)) => matches!(p.as_str(), ")" | "]" | "}"),
        Some(Token::TemplateOpen) => false,
        Some(_) => true,
    }
}

/// `*`/`&` in a cast's type: only more declarator tokens follow before `)` or `>`.
fn closes_declarator(rest: &[Token]) -> bool {
    for tok in rest {
        match tok {
            Token::TemplateClose => return true,
            Token::Punct(p) if p == ")" => return true,
            Token::Punct(p) if matches!(p.as_str(), "*" | "&") => {}
            Token::Ident(word) if word == "const" => {}
            _ => return false,
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            let hex = c == '0' && matches!(next, Some('x' | 'X'));
            while i < chars.len() {
                let ch = chars[i];
                let exponent = if hex {
                    matches!(ch, 'p' | 'P')
                } else {
                    matches!(ch, 'e' | 'E')
                };
                if exponent && matches!(chars.get(i + 1), Some('+' | '-')) {
                    i += 2;
                } else if ch.is_ascii_alphanumeric() || ch == '.' || ch == '\'' {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c == '"' || c == '\'' {
            let end = scan_quoted(&chars, i);
            let lit: String = chars[i..end].iter().collect();
            tokens.push(if c == '"' {
                Token::Str(lit)
            } else {
                Token::Char(lit)
            });
            i = end;
        } else if c.is_alphabetic() || c == '_' || (c == ':' && next == Some(':')) {
            let start = i;
            let mut word = String::new();
            if c == ':' {
                word.push_str("::");
                i = skip_whitespace(&chars, i + 2);
            }
            i = scan_identifier(&chars, i, &mut word);
            loop {
                let sep = skip_whitespace(&chars, i);
                if chars.get(sep) != Some(&':') || chars.get(sep + 1) != Some(&':') {
                    break;
                }
                let part = skip_whitespace(&chars, sep + 2);
                if !chars
                    .get(part)
                    .is_some_and(|n| n.is_alphabetic() || *n == '_' || *n == '~')
                {
                    break;
                }
                word.push_str("::");
                i = scan_identifier(&chars, part, &mut word);
            }
            let quote = chars.get(i).copied();
            if matches!(word.as_str(), "L" | "u" | "U" | "u8") && matches!(quote, Some('"' | '\'')) {
                let end = scan_quoted(&chars, i);
                let lit: String = chars[start..end].iter().collect();
                tokens.push(if quote == Some('"') {
                    Token::Str(lit)
                } else {
                    Token::Char(lit)
                });
                i = end;
            } else {
                tokens.push(Token::Ident(word));
            }
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let punct = PUNCTUATORS
                .iter()
                .find(|p| rest.starts_with(**p))
                .map_or_else(|| c.to_string(), |p| (*p).to_string());
            i += punct.chars().count();
            tokens.push(Token::Punct(punct));
        }
    }
    tokens
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while chars.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    i
}

fn scan_identifier(chars: &[char], mut i: usize, word: &mut String) -> usize {
    if chars.get(i) == Some(&'~') {
        word.push('~');
        i += 1;
    }
    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
        word.push(chars[i]);
        i += 1;
    }
    i
}

/// Index one past the closing quote of the literal starting at `start`.
fn scan_quoted(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            ch if ch == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

/// Turn `<`/`>` pairs that enclose template arguments into template tokens.
///
/// Shift operators are split into single `>` first and re-glued afterwards
/// wherever they did not close a list.
fn mark_templates(tokens: &mut Vec<Token>) {
    split_shift_right(tokens);
    let mut i = 0;
    while i < tokens.len() {
        let opens = tokens[i].is_punct("<") && i > 0 && matches!(tokens[i - 1], Token::Ident(_));
        if opens && let Some(close) = find_template_close(tokens, i) {
            tokens[i] = Token::TemplateOpen;
            tokens[close] = Token::TemplateClose;
        }
        i += 1;
    }
    glue_shift_right(tokens);
}

fn find_template_close(tokens: &[Token], open: usize) -> Option<usize> {
    let mut angle = 1usize;
    let mut nesting = 0usize;
    for (j, tok) in tokens.iter().enumerate().skip(open + 1) {
        match tok {
            Token::Punct(p) => match p.as_str() {
                "(" | "[" | "{" => nesting += 1,
                ")" | "]" | "}" => nesting = nesting.checked_sub(1)?,
                "<" if nesting == 0 && matches!(tokens[j - 1], Token::Ident(_)) => angle += 1,
                ">" if nesting == 0 => {
                    angle -= 1;
                    if angle == 0 {
                        return closes_template(tokens.get(j + 1)).then_some(j);
                    }
                }
                ";" | "&&" | "||" | "?" | "==" | "!=" if nesting == 0 => return None,
                _ => {}
            },
            Token::TemplateClose if nesting == 0 => {
                angle -= 1;
                if angle == 0 {
                    return closes_template(tokens.get(j + 1)).then_some(j);
                }
            }
            _ => {}
        }
    }
    None
}

fn closes_template(next: Option<&Token>) -> bool {
    match next {
        None => true,
        Some(Token::Punct(p)) => matches!(p.as_str(), "(" | "{" | ")" | "," | "]" | "}" | ">"),
        Some(Token::TemplateClose) => true,
        Some(Token::Ident(name)) => name.starts_with("::"),
        Some(_) => false,
    }
}

fn split_shift_right(tokens: &mut Vec<Token>) {
    let mut out = Vec::with_capacity(tokens.len());
    for tok in tokens.drain(..) {
        if tok.is_punct(">>") {
            out.push(Token::Punct(">".to_string()));
            out.push(Token::Punct(">".to_string()));
        } else if tok.is_punct(">>=") {
            out.push(Token::Punct(">".to_string()));
            out.push(Token::Punct(">=".to_string()));
        } else {
            out.push(tok);
        }
    }
    *tokens = out;
}

fn glue_shift_right(tokens: &mut Vec<Token>) {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for tok in tokens.drain(..) {
        let glued = match (out.last(), &tok) {
            (Some(Token::Punct(a)), Token::Punct(b)) if a == ">" && (b == ">" || b == ">=") => {
                Some(format!(">{b}"))
            }
            _ => None,
        };
        match glued {
            Some(op) => {
                out.pop();
                out.push(Token::Punct(op));
            }
            None => out.push(tok),
        }
    }
    *tokens = out;
}

// ---------------------------------------------------------------------------
// Integer evaluation
// ---------------------------------------------------------------------------

struct Evaluator<'a, F: Fn(&str) -> Option<i64>> {
    tokens: &'a [Token],
    pos: usize,
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<i64>> Evaluator<'_, F> {
    fn eat(&mut self, op: &str) -> bool {
        if self.tokens.get(self.pos).is_some_and(|t| t.is_punct(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn bitor(&mut self) -> Option<i64> {
        let mut v = self.bitxor()?;
        while self.eat("|") {
            v |= self.bitxor()?;
        }
        Some(v)
    }

    fn bitxor(&mut self) -> Option<i64> {
        let mut v = self.bitand()?;
        while self.eat("^") {
            v ^= self.bitand()?;
        }
        Some(v)
    }

    fn bitand(&mut self) -> Option<i64> {
        let mut v = self.shift()?;
        while self.eat("&") {
            v &= self.shift()?;
        }
        Some(v)
    }

    fn shift(&mut self) -> Option<i64> {
        let mut v = self.additive()?;
        loop {
            if self.eat("<<") {
                v = v.checked_shl(u32::try_from(self.additive()?).ok()?)?;
            } else if self.eat(">>") {
                v = v.checked_shr(u32::try_from(self.additive()?).ok()?)?;
            } else {
                return Some(v);
            }
        }
    }

    fn additive(&mut self) -> Option<i64> {
        let mut v = self.multiplicative()?;
        loop {
            if self.eat("+") {
                v = v.checked_add(self.multiplicative()?)?;
            } else if self.eat("-") {
                v = v.checked_sub(self.multiplicative()?)?;
            } else {
                return Some(v);
            }
        }
    }

    fn multiplicative(&mut self) -> Option<i64> {
        let mut v = self.unary()?;
        loop {
            if self.eat("*") {
                v = v.checked_mul(self.unary()?)?;
            } else if self.eat("/") {
                v = v.checked_div(self.unary()?)?;
            } else if self.eat("%") {
                v = v.checked_rem(self.unary()?)?;
            } else {
                return Some(v);
            }
        }
    }

    fn unary(&mut self) -> Option<i64> {
        if self.eat("-") {
            return self.unary()?.checked_neg();
        }
        if self.eat("+") {
            return self.unary();
        }
        if self.eat("~") {
            return Some(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<i64> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        match tok {
            Token::Number(text) => parse_integer_literal(text),
            Token::Char(text) => parse_char_literal(text),
            Token::Ident(name) => (self.lookup)(name),
            Token::Punct(p) if p == "(" => {
                let v = self.bitor()?;
                self.eat(")").then_some(v)
            }
            _ => None,
        }
    }
}

/// Decimal, hex, octal, or binary literal with optional `u`/`l` suffixes.
fn parse_integer_literal(text: &str) -> Option<i64> {
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let digits = cleaned.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

fn parse_char_literal(text: &str) -> Option<i64> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| i64::from(u32::from(c)))
}
