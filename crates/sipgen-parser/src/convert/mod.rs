//! tree-sitter-cpp syntax tree → normalized declaration tree.
//!
//! The converter walks the concrete syntax tree scope by scope and emits one
//! [`AstNode`] per declaration, following the per-kind conventions documented
//! in `sipgen_model::ast`. Macros blanked by [`crate::masking`] are put back
//! by byte offset: annotations become `attribute` children of the declaration
//! they precede, statements become `unexposed` nodes between declarations.

mod classes;
mod declarators;
mod helpers;

use std::ops::Range;

use ast_grep_core::Node;
use sipgen_model::{AstNode, NodeKind};
use tracing::{debug, warn};

use crate::masking::{MacroRole, MaskedSource};
use declarators::{
    Specifiers, base_type, function_declarator, is_declarator, is_tag_definition, name_node,
    parameter, parameters, spelling, text_without, trailer,
};
use helpers::{LineIndex, collapse, doc_comment};

pub(crate) struct Converter<'s> {
    masked: &'s MaskedSource,
    lines: LineIndex,
    syntax_errors: usize,
}

impl<'s> Converter<'s> {
    pub(crate) fn new(masked: &'s MaskedSource) -> Self {
        Self {
            lines: LineIndex::new(masked.text()),
            masked,
            syntax_errors: 0,
        }
    }

    /// `ERROR` nodes met so far.
    pub(crate) const fn syntax_errors(&self) -> usize {
        self.syntax_errors
    }

    pub(crate) fn translation_unit<D: ast_grep_core::Doc>(&mut self, root: &Node<D>) -> AstNode {
        let members: Vec<_> = root.children().collect();
        let mut children = Vec::new();
        self.walk(&members, 0..self.masked.text().len(), None, &mut children);
        AstNode::translation_unit(children).with_range(self.lines.span(root.range()))
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    /// Convert the members of one scope into `out`. `class` names the
    /// enclosing class, if any.
    fn walk<D: ast_grep_core::Doc>(
        &mut self,
        members: &[Node<D>],
        span: Range<usize>,
        class: Option<&str>,
        out: &mut Vec<AstNode>,
    ) {
        let mut cursor = span.start;
        for (idx, member) in members.iter().enumerate() {
            let range = member.range();
            self.statements(cursor..range.start, out);

            if member.is_named() {
                let kind = member.kind();
                match kind.as_ref() {
                    "comment" => {}
                    "preproc_if" | "preproc_ifdef" => {
                        let branch = taken_branch(member);
                        self.walk(&branch, range.clone(), class, out);
                    }
                    _ => {
                        let attributes: Vec<AstNode> = self
                            .masked
                            .within(cursor..head_end(member), MacroRole::Attribute)
                            .map(|m| AstNode::new(NodeKind::Attribute, m.text.clone()))
                            .collect();
                        let doc = doc_comment(members, idx);
                        for mut node in self.member(member, class) {
                            node.children.extend(attributes.iter().cloned());
                            if let Some(doc) = &doc {
                                node.attributes
                                    .entry("doc".to_string())
                                    .or_insert_with(|| doc.clone());
                            }
                            out.push(node);
                        }
                    }
                }
            }
            cursor = cursor.max(range.end);
        }
        self.statements(cursor..span.end, out);
    }

    /// Masked statement macros inside `gap`, as `unexposed` nodes.
    fn statements(&self, gap: Range<usize>, out: &mut Vec<AstNode>) {
        for m in self.masked.within(gap, MacroRole::Statement) {
            out.push(
                AstNode::new(NodeKind::Unexposed, "")
                    .with_attr("text", m.text.clone())
                    .with_range(self.lines.span(m.range.clone())),
            );
        }
    }

    fn member<D: ast_grep_core::Doc>(&mut self, node: &Node<D>, class: Option<&str>) -> Vec<AstNode> {
        let kind = node.kind();
        match kind.as_ref() {
            "access_specifier" => {
                vec![self.node(NodeKind::AccessSpecifier, node.text().trim(), node)]
            }
            "namespace_definition" => vec![self.namespace(node)],
            "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier" => {
                vec![self.tag(node)]
            }
            "declaration" | "field_declaration" | "function_definition" => {
                self.declaration(node, class)
            }
            "template_declaration" => self.template(node, class),
            "type_definition" => self.typedef(node),
            "alias_declaration" => self.alias(node).into_iter().collect(),
            "linkage_specification" => vec![self.linkage(node, class)],
            "friend_declaration" => vec![self.node(NodeKind::Friend, collapse(&node.text()), node)],
            "using_declaration" => {
                let text = collapse(&node.text());
                let kind = if text.starts_with("using namespace") {
                    NodeKind::UsingDirective
                } else {
                    NodeKind::UsingDeclaration
                };
                vec![self.node(kind, text, node)]
            }
            "static_assert_declaration" => vec![
                self.node(NodeKind::StaticAssert, "", node)
                    .with_attr("text", collapse(&node.text())),
            ],
            "preproc_include" | "preproc_def" | "preproc_function_def" | "preproc_call"
            | "namespace_alias_definition" => Vec::new(),
            "ERROR" => {
                self.syntax_errors += 1;
                let at = self.lines.span(node.range());
                warn!(line = at.start_line, text = %collapse(&node.text()), "syntax error kept as unexposed");
                vec![self.unexposed(node)]
            }
            other => {
                debug!(kind = other, "unrecognized construct kept as unexposed");
                vec![self.unexposed(node)]
            }
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    /// Variables, fields, function declarations and definitions, and bare
    /// aggregate definitions ending in `;`.
    fn declaration<D: ast_grep_core::Doc>(&mut self, node: &Node<D>, class: Option<&str>) -> Vec<AstNode> {
        let children: Vec<_> = node.children().collect();
        let specifiers = Specifiers::collect(&children);

        if let Some(cast) = children.iter().find(|c| c.kind().as_ref() == "operator_cast") {
            return self.conversion(node, cast, class, &specifiers).into_iter().collect();
        }

        let ty = node.field("type");
        let declarators = declarators_of(&children, ty.as_ref());
        let mut tag = match &ty {
            Some(t) if is_tag_definition(t) => Some(self.tag(t)),
            _ => None,
        };

        let Some(first) = declarators.first() else {
            return match (tag, ty) {
                (Some(tag), _) => vec![tag],
                (None, Some(t)) if is_tag_kind(&t) => vec![self.tag(&t)],
                _ => vec![self.unexposed(node)],
            };
        };

        let tag_spelled = tag.as_ref().map(tag_spelling);
        let base = base_type(&children, first.range().start, tag_spelled.as_deref());
        let mut out = Vec::new();
        for declarator in &declarators {
            let converted = match function_declarator(declarator) {
                Some(function) => {
                    self.function(node, &children, declarator, &function, class, &specifiers)
                }
                None => self.variable(node, declarator, &base, class, &specifiers),
            };
            let Some(mut converted) = converted else {
                continue;
            };
            if let Some(tag) = tag.take() {
                if converted.type_spelling.as_deref() == Some(base.as_str()) && tag.name.is_empty() {
                    converted.type_spelling = None;
                }
                converted.children.push(tag);
            }
            out.push(converted);
        }
        out
    }

    fn function<D: ast_grep_core::Doc>(
        &self,
        node: &Node<D>,
        children: &[Node<D>],
        declarator: &Node<D>,
        function: &Node<D>,
        class: Option<&str>,
        specifiers: &Specifiers,
    ) -> Option<AstNode> {
        let declared = function.children().find(|c| c.is_named() && is_declarator(c))?;
        let name = collapse(&declared.text());
        if matches!(declared.kind().as_ref(), "qualified_identifier" | "template_function") {
            debug!(name, "skipping out-of-line or specialized definition");
            return None;
        }

        let kind = match class {
            Some(_) if name.starts_with('~') => NodeKind::Destructor,
            Some(class) if name == class => NodeKind::Constructor,
            Some(_) => NodeKind::Method,
            None => NodeKind::Function,
        };
        let mut out = self.node(kind, name, node);

        if !matches!(kind, NodeKind::Constructor | NodeKind::Destructor) {
            let trailing = function
                .children()
                .find(|c| c.kind().as_ref() == "trailing_return_type")
                .map(|t| collapse(t.text().trim_start_matches("->")));
            let ret = trailing.unwrap_or_else(|| {
                let base = base_type(children, declarator.range().start, None);
                collapse(&format!("{base} {}", text_without(declarator, &function.range())))
            });
            out = out.with_type(ret);
        }

        for param in parameters(function) {
            let mut p = AstNode::new(NodeKind::Parameter, param.name).with_type(param.ty);
            if let Some(default) = param.default {
                p = p.with_attr("default", default);
            }
            out.children.push(p);
        }

        let qualifiers: Vec<String> = function
            .children()
            .filter(|c| matches!(c.kind().as_ref(), "type_qualifier" | "virtual_specifier"))
            .map(|c| c.text().trim().to_string())
            .collect();
        let tail = trailer(node, declarator);
        let tail = tail.trim_end_matches(';');

        if qualifiers.iter().any(|q| q == "const") {
            out = out.with_flag("const");
        }
        if qualifiers.iter().any(|q| q == "override") || tail.contains("override") {
            out = out.with_flag("override");
        }
        if tail.ends_with("=0") {
            out = out.with_flag("pure");
        }
        if tail.ends_with("=delete") {
            out = out.with_flag("deleted");
        }
        out = apply_specifiers(out, specifiers);
        Some(out)
    }

    /// `operator bool() const` inside a class.
    fn conversion<D: ast_grep_core::Doc>(
        &self,
        node: &Node<D>,
        cast: &Node<D>,
        class: Option<&str>,
        specifiers: &Specifiers,
    ) -> Option<AstNode> {
        if class.is_none() {
            debug!(text = %collapse(&cast.text()), "skipping out-of-line conversion operator");
            return None;
        }
        let text = collapse(&cast.text());
        let (head, rest) = text.split_once('(')?;
        let target = head.trim().strip_prefix("operator")?.trim().to_string();
        let mut out = self
            .node(NodeKind::ConversionFunction, format!("operator {target}"), node)
            .with_type(target);
        if rest.rsplit_once(')').is_some_and(|(_, suffix)| suffix.contains("const")) {
            out = out.with_flag("const");
        }
        Some(apply_specifiers(out, specifiers))
    }

    fn variable<D: ast_grep_core::Doc>(
        &self,
        node: &Node<D>,
        declarator: &Node<D>,
        base: &str,
        class: Option<&str>,
        specifiers: &Specifiers,
    ) -> Option<AstNode> {
        let name = name_node(declarator)?;
        if name.kind().as_ref() == "qualified_identifier" {
            debug!(name = %name.text(), "skipping out-of-line member definition");
            return None;
        }
        let kind = if class.is_some() {
            NodeKind::Field
        } else {
            NodeKind::Variable
        };
        let out = self
            .node(kind, name.text().to_string(), node)
            .with_type(spelling(base, Some(declarator)));
        Some(apply_specifiers(out, specifiers))
    }

    fn typedef<D: ast_grep_core::Doc>(&mut self, node: &Node<D>) -> Vec<AstNode> {
        let children: Vec<_> = node.children().collect();
        let ty = node.field("type");
        let declarators = declarators_of(&children, ty.as_ref());
        let mut tag = match &ty {
            Some(t) if is_tag_definition(t) => Some(self.tag(t)),
            _ => None,
        };
        let tag_spelled = tag.as_ref().map(tag_spelling);
        let stop = declarators.first().map_or(usize::MAX, |d| d.range().start);
        let base = base_type(&children, stop, tag_spelled.as_deref());

        let mut out = Vec::new();
        for declarator in &declarators {
            let Some(name) = name_node(declarator) else {
                continue;
            };
            let spelled = spelling(&base, Some(declarator));
            let mut typedef = self.node(NodeKind::Typedef, name.text().to_string(), node);
            match tag.take() {
                Some(inline) => {
                    if !(inline.name.is_empty() && spelled == base) {
                        typedef = typedef.with_type(spelled);
                    }
                    typedef.children.push(inline);
                }
                None => typedef = typedef.with_type(spelled),
            }
            out.push(typedef);
        }
        out
    }

    /// `using Name = Type;`
    fn alias<D: ast_grep_core::Doc>(&self, node: &Node<D>) -> Option<AstNode> {
        let name = node.field("name")?;
        let ty = node.field("type")?;
        Some(
            self.node(NodeKind::TypeAlias, name.text().to_string(), node)
                .with_type(collapse(&ty.text())),
        )
    }

    fn template<D: ast_grep_core::Doc>(&mut self, node: &Node<D>, class: Option<&str>) -> Vec<AstNode> {
        let params: Vec<AstNode> = node
            .field("parameters")
            .map(|list| self.template_params(&list))
            .unwrap_or_default();
        let Some(inner) = node.children().find(|c| {
            c.is_named()
                && !matches!(
                    c.kind().as_ref(),
                    "template_parameter_list" | "comment" | "requires_clause"
                )
        }) else {
            return Vec::new();
        };
        let mut nodes = self.member(&inner, class);
        for n in &mut nodes {
            n.children.extend(params.iter().cloned());
        }
        nodes
    }

    fn template_params<D: ast_grep_core::Doc>(&self, list: &Node<D>) -> Vec<AstNode> {
        list.children()
            .filter(Node::is_named)
            .filter_map(|p| match p.kind().as_ref() {
                "type_parameter_declaration"
                | "optional_type_parameter_declaration"
                | "variadic_type_parameter_declaration"
                | "template_template_parameter_declaration" => {
                    let name = p.field("name").or_else(|| {
                        p.children()
                            .filter(|c| c.kind().as_ref() == "type_identifier")
                            .last()
                    })?;
                    Some(self.node(NodeKind::TemplateTypeParameter, name.text().to_string(), &p))
                }
                _ => parameter(&p).map(|parts| {
                    self.node(NodeKind::TemplateNonTypeParameter, parts.name, &p)
                        .with_type(parts.ty)
                }),
            })
            .collect()
    }

    fn namespace<D: ast_grep_core::Doc>(&mut self, node: &Node<D>) -> AstNode {
        let name = node
            .field("name")
            .map(|n| collapse(&n.text()))
            .unwrap_or_default();
        let mut children = Vec::new();
        if let Some(body) = node.field("body") {
            let members: Vec<_> = body.children().collect();
            self.walk(&members, body.range(), None, &mut children);
        }

        // `namespace a::b { ... }` nests.
        let mut parts = name.rsplit("::").map(str::trim);
        let innermost = parts.next().unwrap_or_default();
        let mut out = self.node(NodeKind::Namespace, innermost, node).with_children(children);
        for outer in parts {
            out = self.node(NodeKind::Namespace, outer, node).with_child(out);
        }
        out
    }

    /// `extern "C" { ... }` or `extern "C" decl;`
    fn linkage<D: ast_grep_core::Doc>(&mut self, node: &Node<D>, class: Option<&str>) -> AstNode {
        let mut children = Vec::new();
        if let Some(body) = node.field("body") {
            if body.kind().as_ref() == "declaration_list" {
                let members: Vec<_> = body.children().collect();
                self.walk(&members, body.range(), class, &mut children);
            } else {
                let start = node.field("value").map_or(node.range().start, |v| v.range().end);
                self.walk(std::slice::from_ref(&body), start..node.range().end, class, &mut children);
            }
        }
        self.node(NodeKind::LinkageSpec, "", node).with_children(children)
    }

    // -----------------------------------------------------------------------
    // Node helpers
    // -----------------------------------------------------------------------

    fn node<D: ast_grep_core::Doc>(
        &self,
        kind: NodeKind,
        name: impl Into<String>,
        syntax: &Node<D>,
    ) -> AstNode {
        AstNode::new(kind, name).with_range(self.lines.span(syntax.range()))
    }

    fn unexposed<D: ast_grep_core::Doc>(&self, node: &Node<D>) -> AstNode {
        self.node(NodeKind::Unexposed, "", node)
            .with_attr("text", collapse(&node.text()))
    }
}

fn apply_specifiers(mut node: AstNode, specifiers: &Specifiers) -> AstNode {
    for (flag, set) in [
        ("static", specifiers.is_static),
        ("extern", specifiers.is_extern),
        ("virtual", specifiers.is_virtual),
        ("explicit", specifiers.is_explicit),
    ] {
        if set {
            node = node.with_flag(flag);
        }
    }
    node.children.extend(
        specifiers
            .attributes
            .iter()
            .map(|a| AstNode::new(NodeKind::Attribute, a.clone())),
    );
    node
}

/// Declarators of a declaration: named declarator children other than the
/// type, up to a top-level `=` (a member initializer or `= 0`).
fn declarators_of<'r, D: ast_grep_core::Doc>(
    children: &[Node<'r, D>],
    ty: Option<&Node<'r, D>>,
) -> Vec<Node<'r, D>> {
    let type_range = ty.map(Node::range);
    children
        .iter()
        .take_while(|c| c.text().as_ref() != "=")
        .filter(|c| c.is_named() && is_declarator(c) && Some(c.range()) != type_range)
        .cloned()
        .collect()
}

fn is_tag_kind<D: ast_grep_core::Doc>(node: &Node<D>) -> bool {
    matches!(
        node.kind().as_ref(),
        "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier"
    )
}

/// How declarators refer to an inline tag: its name, or the anonymous marker
/// the model builder renames.
fn tag_spelling(tag: &AstNode) -> String {
    if tag.name.is_empty() {
        format!("{} (anonymous)", tag.kind)
    } else {
        tag.name.clone()
    }
}

/// End of the part of `node` whose masked annotations belong to it: the start
/// of its body, if it has one.
fn head_end<D: ast_grep_core::Doc>(node: &Node<D>) -> usize {
    let kind = node.kind();
    match kind.as_ref() {
        "template_declaration" => node
            .children()
            .filter(|c| c.is_named() && c.kind().as_ref() != "template_parameter_list")
            .last()
            .map_or(node.range().end, |inner| head_end(&inner)),
        "linkage_specification" => node
            .field("value")
            .map_or(node.range().start, |v| v.range().end),
        _ => {
            if let Some(body) = node.field("body") {
                return body.range().start;
            }
            node.field("type")
                .filter(is_tag_definition)
                .and_then(|t| t.field("body"))
                .map_or(node.range().end, |body| body.range().start)
        }
    }
}

/// Members of the branch a conditional directive takes first; `#else` and
/// `#elif` alternatives are skipped.
fn taken_branch<'r, D: ast_grep_core::Doc>(node: &Node<'r, D>) -> Vec<Node<'r, D>> {
    let skipped: Vec<Range<usize>> = ["name", "condition", "alternative"]
        .iter()
        .filter_map(|field| node.field(field))
        .map(|n| n.range())
        .collect();
    node.children()
        .filter(|c| !skipped.contains(&c.range()))
        .collect()
}
