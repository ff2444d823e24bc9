//! Class, struct, union, and enum specifiers.

use ast_grep_core::Node;
use sipgen_model::{AstNode, NodeKind};
use tracing::debug;

use super::Converter;
use super::helpers::collapse;

impl Converter<'_> {
    /// Any tag specifier, with or without a body.
    pub(super) fn tag<D: ast_grep_core::Doc>(&mut self, node: &Node<D>) -> AstNode {
        if node.kind().as_ref() == "enum_specifier" {
            self.enumeration(node)
        } else {
            self.aggregate(node)
        }
    }

    fn aggregate<D: ast_grep_core::Doc>(&mut self, node: &Node<D>) -> AstNode {
        let kind = match node.kind().as_ref() {
            "struct_specifier" => NodeKind::Struct,
            "union_specifier" => NodeKind::Union,
            _ => NodeKind::Class,
        };
        let name = node
            .field("name")
            .map(|n| collapse(&n.text()))
            .unwrap_or_default();
        if name.contains('<') {
            debug!(name, "skipping template specialization");
            return self.unexposed(node);
        }
        let simple = name.rsplit("::").next().unwrap_or_default().to_string();

        let mut out = self.node(kind, simple.clone(), node);
        for child in node.children() {
            match child.kind().as_ref() {
                "attribute_specifier" | "attribute_declaration" | "ms_declspec_modifier" => {
                    out.children
                        .push(AstNode::new(NodeKind::Attribute, collapse(&child.text())));
                }
                "base_class_clause" => out.children.extend(self.bases(&child)),
                _ => {}
            }
        }

        match node.field("body") {
            Some(body) => {
                let members: Vec<_> = body.children().collect();
                let mut children = Vec::new();
                self.walk(&members, body.range(), Some(&simple), &mut children);
                out.children.extend(children);
            }
            None => out = out.with_flag("forward"),
        }
        out
    }

    /// `: public Base, protected virtual Other<int>`
    fn bases<D: ast_grep_core::Doc>(&self, clause: &Node<D>) -> Vec<AstNode> {
        let mut bases = Vec::new();
        let mut access: Option<String> = None;
        let mut is_virtual = false;
        for child in clause.children() {
            let text = collapse(&child.text());
            match (child.kind().as_ref(), text.as_str()) {
                (_, ":" | "," | "...") | ("attribute_declaration", _) => {}
                (_, "virtual") => is_virtual = true,
                (_, "public" | "protected" | "private") => access = Some(text),
                ("access_specifier", _) => access = Some(text),
                _ if child.is_named() => {
                    let mut base = self
                        .node(NodeKind::BaseSpecifier, "", &child)
                        .with_type(text);
                    if let Some(access) = access.take() {
                        base = base.with_attr("access", access);
                    }
                    if std::mem::take(&mut is_virtual) {
                        base = base.with_flag("virtual");
                    }
                    bases.push(base);
                }
                _ => {}
            }
        }
        bases
    }

    fn enumeration<D: ast_grep_core::Doc>(&self, node: &Node<D>) -> AstNode {
        let name = node
            .field("name")
            .map(|n| collapse(&n.text()))
            .unwrap_or_default();
        let simple = name.rsplit("::").next().unwrap_or_default().to_string();
        let mut out = self.node(NodeKind::Enum, simple, node);

        if node
            .children()
            .any(|c| !c.is_named() && matches!(c.text().as_ref(), "class" | "struct"))
        {
            out = out.with_flag("scoped");
        }
        if let Some(base) = node.field("base") {
            out = out.with_type(collapse(&base.text()));
        }
        for child in node.children() {
            if matches!(
                child.kind().as_ref(),
                "attribute_specifier" | "attribute_declaration"
            ) {
                out.children
                    .push(AstNode::new(NodeKind::Attribute, collapse(&child.text())));
            }
        }

        let Some(body) = node.field("body") else {
            return out.with_flag("forward");
        };
        for enumerator in body
            .children()
            .filter(|c| c.kind().as_ref() == "enumerator")
        {
            let Some(name) = enumerator.field("name") else {
                continue;
            };
            let mut constant = self.node(NodeKind::EnumConstant, name.text().to_string(), &enumerator);
            if let Some(value) = enumerator.field("value") {
                constant = constant.with_attr("value", collapse(&value.text()));
            }
            out.children.push(constant);
        }
        out
    }
}
