//! Declarator unwinding: names, type spellings, parameter lists.
//!
//! C++ spreads a type over the declaration specifiers and the declarator
//! (`const char *(*cb)(int)`). A spelling is rebuilt from source text: the
//! type specifiers, then the declarator with its name cut out.

use std::ops::Range;

use ast_grep_core::Node;

use super::helpers::collapse;

/// Qualifiers tree-sitter files under `type_qualifier` that are not part of a type.
const STORAGE_QUALIFIERS: &[&str] = &["constexpr", "consteval", "constinit", "mutable"];

/// Declarators that name the declared entity.
const NAME_KINDS: &[&str] = &[
    "identifier",
    "field_identifier",
    "type_identifier",
    "qualified_identifier",
    "destructor_name",
    "operator_name",
    "template_function",
];

/// Declarators wrapping another declarator.
const WRAPPER_KINDS: &[&str] = &[
    "pointer_declarator",
    "reference_declarator",
    "array_declarator",
    "init_declarator",
    "function_declarator",
    "parenthesized_declarator",
    "attributed_declarator",
    "abstract_pointer_declarator",
    "abstract_reference_declarator",
    "abstract_array_declarator",
    "abstract_function_declarator",
    "abstract_parenthesized_declarator",
];

/// Parts of a declaration that spell its base type.
const TYPE_KINDS: &[&str] = &[
    "type_qualifier",
    "primitive_type",
    "sized_type_specifier",
    "type_identifier",
    "qualified_identifier",
    "template_type",
    "placeholder_type_specifier",
    "decltype",
    "dependent_type",
    "class_specifier",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
];

pub(super) fn is_declarator<D: ast_grep_core::Doc>(node: &Node<D>) -> bool {
    let kind = node.kind();
    NAME_KINDS.contains(&kind.as_ref()) || WRAPPER_KINDS.contains(&kind.as_ref())
}

/// Aggregate or enum specifier carrying a body.
pub(super) fn is_tag_definition<D: ast_grep_core::Doc>(node: &Node<D>) -> bool {
    matches!(
        node.kind().as_ref(),
        "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
    ) && node.field("body").is_some()
}

fn inner<'r, D: ast_grep_core::Doc>(node: &Node<'r, D>) -> Option<Node<'r, D>> {
    node.children().find(|c| c.is_named() && is_declarator(c))
}

/// Innermost name of a declarator, if it has one.
pub(super) fn name_node<'r, D: ast_grep_core::Doc>(node: &Node<'r, D>) -> Option<Node<'r, D>> {
    if NAME_KINDS.contains(&node.kind().as_ref()) {
        return Some(node.clone());
    }
    inner(node).and_then(|n| name_node(&n))
}

/// The `function_declarator` declaring a function, looking through pointer and
/// reference wrappers of the return type. Function pointers yield `None`.
pub(super) fn function_declarator<'r, D: ast_grep_core::Doc>(
    node: &Node<'r, D>,
) -> Option<Node<'r, D>> {
    match node.kind().as_ref() {
        "function_declarator" => {
            let declared = inner(node)?;
            (declared.kind().as_ref() != "parenthesized_declarator").then(|| node.clone())
        }
        "pointer_declarator" | "reference_declarator" | "attributed_declarator" => {
            inner(node).and_then(|n| function_declarator(&n))
        }
        _ => None,
    }
}

/// Declarator text with `cut` removed, whitespace collapsed.
pub(super) fn text_without<D: ast_grep_core::Doc>(node: &Node<D>, cut: &Range<usize>) -> String {
    let text = node.text();
    let range = node.range();
    if cut.start < range.start || cut.end > range.end {
        return collapse(&text);
    }
    let before = text[..cut.start - range.start].trim_end();
    let after = text[cut.end - range.start..].trim_start();
    let word = |c: char| c.is_alphanumeric() || c == '_';
    let glue = if before.ends_with(word) && after.starts_with(word) {
        " "
    } else {
        ""
    };
    collapse(&format!("{before}{glue}{after}"))
}

/// Base type spelled by the specifier children before byte offset `stop`
/// (the first declarator) or the first `=`.
///
/// Elaborated specifiers without a body (`struct Foo`) spell as their tag name;
/// a tag defined inline spells as `tag`.
pub(super) fn base_type<D: ast_grep_core::Doc>(
    children: &[Node<D>],
    stop: usize,
    tag: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    for child in children {
        if child.range().start >= stop || child.text().as_ref() == "=" {
            break;
        }
        let kind = child.kind();
        match kind.as_ref() {
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier" => {
                if child.field("body").is_some() {
                    parts.push(tag.unwrap_or_default().to_string());
                } else if let Some(name) = child.field("name") {
                    parts.push(name.text().to_string());
                }
            }
            "type_qualifier" if STORAGE_QUALIFIERS.contains(&child.text().trim()) => {}
            k if TYPE_KINDS.contains(&k) => parts.push(collapse(&child.text())),
            _ => {}
        }
    }
    collapse(&parts.join(" "))
}

/// Spelling of a declared entity's type: `base` plus the declarator minus its name.
pub(super) fn spelling<D: ast_grep_core::Doc>(base: &str, declarator: Option<&Node<D>>) -> String {
    let Some(declarator) = declarator else {
        return base.to_string();
    };
    let declarator = strip_initializer(declarator);
    let rest = match name_node(&declarator) {
        Some(name) => text_without(&declarator, &name.range()),
        None => collapse(&declarator.text()),
    };
    collapse(&format!("{base} {rest}"))
}

/// `x = 3` → `x`.
pub(super) fn strip_initializer<'r, D: ast_grep_core::Doc>(node: &Node<'r, D>) -> Node<'r, D> {
    if node.kind().as_ref() == "init_declarator"
        && let Some(declared) = inner(node)
    {
        return declared;
    }
    node.clone()
}

/// Keyword specifiers (`static`, `virtual`, `explicit`, ...) and raw attributes
/// attached directly to a declaration.
#[derive(Debug, Default)]
pub(super) struct Specifiers {
    pub(super) is_static: bool,
    pub(super) is_extern: bool,
    pub(super) is_virtual: bool,
    pub(super) is_explicit: bool,
    pub(super) attributes: Vec<String>,
}

impl Specifiers {
    pub(super) fn collect<D: ast_grep_core::Doc>(children: &[Node<D>]) -> Self {
        let mut specifiers = Self::default();
        for child in children {
            let text = child.text();
            match child.kind().as_ref() {
                "attribute_specifier" | "attribute_declaration" | "ms_declspec_modifier" => {
                    specifiers.attributes.push(collapse(&text));
                }
                _ => match text.trim() {
                    "static" => specifiers.is_static = true,
                    "extern" => specifiers.is_extern = true,
                    "virtual" => specifiers.is_virtual = true,
                    _ if child.kind().as_ref() == "explicit_function_specifier" => {
                        specifiers.is_explicit = true;
                    }
                    _ => {}
                },
            }
        }
        specifiers
    }
}

/// One parameter of a parameter list.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct ParamParts {
    pub(super) name: String,
    pub(super) ty: String,
    pub(super) default: Option<String>,
}

pub(super) fn parameters<D: ast_grep_core::Doc>(function: &Node<D>) -> Vec<ParamParts> {
    let Some(list) = function
        .field("parameters")
        .or_else(|| function.children().find(|c| c.kind().as_ref() == "parameter_list"))
    else {
        return Vec::new();
    };
    let mut params: Vec<ParamParts> = list
        .children()
        .filter(Node::is_named)
        .filter_map(|p| parameter(&p))
        .collect();
    // `f(void)` declares no parameters.
    if params.len() == 1 && params[0].ty == "void" && params[0].name.is_empty() {
        params.clear();
    }
    params
}

pub(super) fn parameter<D: ast_grep_core::Doc>(node: &Node<D>) -> Option<ParamParts> {
    match node.kind().as_ref() {
        "variadic_parameter" => Some(ParamParts {
            name: String::new(),
            ty: "...".to_string(),
            default: None,
        }),
        "parameter_declaration"
        | "optional_parameter_declaration"
        | "variadic_parameter_declaration" => {
            let children: Vec<_> = node.children().collect();
            let declarator = node.field("declarator");
            let name = declarator
                .as_ref()
                .and_then(name_node)
                .map(|n| n.text().to_string())
                .unwrap_or_default();
            let stop = declarator.as_ref().map_or(usize::MAX, |d| d.range().start);
            let base = base_type(&children, stop, None);
            Some(ParamParts {
                name,
                ty: spelling(&base, declarator.as_ref()),
                default: node.field("default_value").map(|d| collapse(&d.text())),
            })
        }
        _ => None,
    }
}

/// Text between the end of `declarator` and the body (or end) of
/// `declaration`, with all whitespace removed: `=0;`, `=delete;`, `override;`.
pub(super) fn trailer<D: ast_grep_core::Doc>(declaration: &Node<D>, declarator: &Node<D>) -> String {
    let range = declaration.range();
    let end = declaration
        .children()
        .find(|c| {
            matches!(
                c.kind().as_ref(),
                "compound_statement" | "field_initializer_list" | "try_statement"
            )
        })
        .map_or(range.end, |body| body.range().start);
    let text = declaration.text();
    let from = declarator.range().end.saturating_sub(range.start);
    let to = end.saturating_sub(range.start);
    text.get(from..to)
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}
