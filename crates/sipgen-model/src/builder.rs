//! Single-pass construction of the [`Model`] from a normalized tree.
//!
//! The walk assigns positional synthetic names to anonymous aggregates and
//! enums, folds forward declarations into later definitions, hoists
//! `extern "C"` blocks, and collapses annotation macros. A handful of
//! whole-model passes then run over the arena: qualified names and the name
//! index, enumerator values, typedef resolution, and override detection.

use std::collections::HashMap;

use sipgen_core::{Access, DeclAttributes, DiagnosticCode, Diagnostics, SymbolVisibility};
use tracing::debug;

use crate::ast::{AstNode, NodeKind, SourceRange};
use crate::attributes::{AttributeClass, classify_attribute};
use crate::error::ModelError;
use crate::expr::Expr;
use crate::model::{
    BaseSpecifier, ClassDecl, ClassFlavor, Decl, DeclId, DeclKind, EnumConstantDecl, EnumDecl,
    FunctionDecl, FunctionRole, Model, NameOrigin, NamespaceDecl, OpaqueDecl, Parameter,
    TypedefDecl, TypedefResolution, VariableDecl,
};
use crate::types::{TemplateArg, TypeRef};

/// Macros that expand to nothing a binding needs.
const IGNORED_MACROS: &[&str] = &[
    "Q_OBJECT",
    "Q_GADGET",
    "Q_DECLARE_PRIVATE",
    "Q_DECLARE_PUBLIC",
    "Q_DISABLE_COPY",
    "Q_DECLARE_OPERATORS_FOR_FLAGS",
    "Q_DECLARE_METATYPE",
    "Q_PROPERTY",
    "Q_ENUM",
    "Q_ENUMS",
    "Q_FLAG",
    "Q_FLAGS",
    "Q_INTERFACES",
    "Q_CLASSINFO",
    "Q_PRIVATE_SLOT",
];

/// Build the declaration model for one translation unit.
///
/// Recoverable problems land in `diagnostics`; the returned model always
/// covers every declaration of the tree.
///
/// # Errors
///
/// Returns [`ModelError`] when the root is not a translation unit or a
/// synthetic name collides with a sibling.
pub fn build_model(root: &AstNode, diagnostics: &mut Diagnostics) -> Result<Model, ModelError> {
    if root.kind != NodeKind::TranslationUnit {
        return Err(ModelError::InvalidRoot {
            kind: root.kind.to_string(),
        });
    }
    let mut builder = ModelBuilder {
        decls: Vec::new(),
        diagnostics,
    };
    builder.push(Decl {
        id: DeclId::ROOT,
        name: String::new(),
        qualified_name: String::new(),
        name_origin: NameOrigin::Source,
        parent: None,
        access: Access::Public,
        attributes: DeclAttributes::default(),
        forward_only: false,
        doc: None,
        range: root.range,
        kind: DeclKind::Namespace(NamespaceDecl::default()),
    });
    builder.walk_scope(DeclId::ROOT, &root.children, Access::Public)?;
    builder.finish()
}

/// Per-scope walk state.
struct ScopeState {
    access: Access,
    anonymous_ordinal: usize,
    children: Vec<DeclId>,
    /// Class and enum tags seen so far, for folding forward declarations.
    tags: HashMap<String, DeclId>,
    /// Most recent synthetically named sibling, for libclang-style typedefs.
    last_anonymous: Option<DeclId>,
}

impl ScopeState {
    fn new(access: Access) -> Self {
        Self {
            access,
            anonymous_ordinal: 0,
            children: Vec::new(),
            tags: HashMap::new(),
            last_anonymous: None,
        }
    }

    fn next_ordinal(&mut self) -> usize {
        let ordinal = self.anonymous_ordinal;
        self.anonymous_ordinal += 1;
        ordinal
    }

    fn member_access(&self, node: &AstNode) -> Access {
        node.attr("access")
            .and_then(Access::parse)
            .unwrap_or(self.access)
    }
}

struct ModelBuilder<'d> {
    decls: Vec<Decl>,
    diagnostics: &'d mut Diagnostics,
}

/// Fields shared by every new declaration.
struct DeclHeader {
    name: String,
    origin: NameOrigin,
    access: Access,
    attributes: DeclAttributes,
    doc: Option<String>,
    range: SourceRange,
}

impl ModelBuilder<'_> {
    fn push(&mut self, decl: Decl) -> DeclId {
        let id = DeclId::from_index(self.decls.len());
        self.decls.push(Decl { id, ..decl });
        id
    }

    fn qualify(&self, parent: DeclId, name: &str) -> String {
        let scope = &self.decls[parent.index()].qualified_name;
        if scope.is_empty() {
            name.to_string()
        } else {
            format!("{scope}::{name}")
        }
    }

    fn add(&mut self, parent: DeclId, header: DeclHeader, kind: DeclKind) -> DeclId {
        let qualified_name = self.qualify(parent, &header.name);
        self.push(Decl {
            id: DeclId::ROOT,
            name: header.name,
            qualified_name,
            name_origin: header.origin,
            parent: Some(parent),
            access: header.access,
            attributes: header.attributes,
            forward_only: false,
            doc: header.doc,
            range: header.range,
            kind,
        })
    }

    fn header(&mut self, node: &AstNode, parent: DeclId, name: String, access: Access) -> DeclHeader {
        let subject = self.qualify(parent, &name);
        DeclHeader {
            attributes: self.collapse_attributes(node, &subject),
            name,
            origin: NameOrigin::Source,
            access,
            doc: node.attr("doc").map(str::to_string),
            range: node.range,
        }
    }

    fn collapse_attributes(&mut self, node: &AstNode, subject: &str) -> DeclAttributes {
        let mut attrs = DeclAttributes {
            visibility: SymbolVisibility::Default,
            deprecated: node.flag("deprecated"),
        };
        for child in node.children.iter().filter(|c| c.kind == NodeKind::Attribute) {
            match classify_attribute(&child.name) {
                AttributeClass::Export => {
                    if attrs.visibility == SymbolVisibility::Default {
                        attrs.visibility = SymbolVisibility::Export;
                    }
                }
                AttributeClass::Hidden => attrs.visibility = SymbolVisibility::Hidden,
                AttributeClass::Deprecated => attrs.deprecated = true,
                AttributeClass::Ignored => debug!(subject, attribute = %child.name, "ignoring attribute"),
                AttributeClass::Unknown => self.diagnostics.warn(
                    subject,
                    DiagnosticCode::UnknownAttribute,
                    format!("unrecognized attribute `{}`", child.name.trim()),
                ),
            }
        }
        attrs
    }

    fn set_children(&mut self, scope: DeclId, children: Vec<DeclId>) {
        match &mut self.decls[scope.index()].kind {
            DeclKind::Namespace(ns) => ns.children = children,
            DeclKind::Class(class) => class.children = children,
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Walk
    // -----------------------------------------------------------------------

    fn walk_scope(
        &mut self,
        scope: DeclId,
        nodes: &[AstNode],
        default_access: Access,
    ) -> Result<(), ModelError> {
        let mut state = ScopeState::new(default_access);
        for node in nodes {
            self.visit(node, scope, &mut state)?;
        }
        self.set_children(scope, state.children);
        Ok(())
    }

    fn visit(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
    ) -> Result<(), ModelError> {
        match node.kind {
            NodeKind::AccessSpecifier => {
                if let Some(access) = Access::parse(&node.name) {
                    state.access = access;
                }
            }
            NodeKind::Namespace => self.visit_namespace(node, scope, state)?,
            NodeKind::Class | NodeKind::Struct | NodeKind::Union => {
                self.visit_aggregate(node, scope, state, None)?;
            }
            NodeKind::Enum => {
                self.visit_enum(node, scope, state, None);
            }
            NodeKind::Function
            | NodeKind::Method
            | NodeKind::Constructor
            | NodeKind::Destructor
            | NodeKind::ConversionFunction => self.visit_function(node, scope, state),
            NodeKind::Field | NodeKind::Variable => self.visit_variable(node, scope, state)?,
            NodeKind::Typedef | NodeKind::TypeAlias => self.visit_typedef(node, scope, state)?,
            NodeKind::LinkageSpec => {
                for child in &node.children {
                    self.visit(child, scope, state)?;
                }
            }
            NodeKind::Friend
            | NodeKind::UsingDeclaration
            | NodeKind::UsingDirective
            | NodeKind::StaticAssert => {
                debug!(kind = %node.kind, name = %node.name, "skipping non-binding declaration");
            }
            NodeKind::BaseSpecifier
            | NodeKind::TemplateTypeParameter
            | NodeKind::TemplateNonTypeParameter
            | NodeKind::Attribute => {}
            NodeKind::Unexposed => self.visit_unexposed(node, scope, state),
            NodeKind::TranslationUnit
            | NodeKind::EnumConstant
            | NodeKind::Parameter => self.add_opaque(node, scope, state),
        }
        Ok(())
    }

    fn visit_namespace(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
    ) -> Result<(), ModelError> {
        if node.name.is_empty() {
            debug!("skipping anonymous namespace (internal linkage)");
            return Ok(());
        }
        let header = self.header(node, scope, node.name.clone(), Access::Public);
        let id = self.add(scope, header, DeclKind::Namespace(NamespaceDecl::default()));
        state.children.push(id);
        self.walk_scope(id, &node.children, Access::Public)
    }

    /// Name for a possibly anonymous tag; consumes an ordinal when anonymous.
    fn tag_name(
        state: &mut ScopeState,
        raw: &str,
        keyword: &str,
        alias: Option<&str>,
    ) -> (String, NameOrigin) {
        if !is_anonymous_name(raw) {
            return (raw.to_string(), NameOrigin::Source);
        }
        let ordinal = state.next_ordinal();
        match alias {
            Some(alias) => (alias.to_string(), NameOrigin::TypedefAlias),
            None => (format!("__{keyword}{ordinal}"), NameOrigin::Synthetic),
        }
    }

    fn visit_aggregate(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
        alias: Option<&str>,
    ) -> Result<DeclId, ModelError> {
        let flavor = match node.kind {
            NodeKind::Struct => ClassFlavor::Struct,
            NodeKind::Union => ClassFlavor::Union,
            _ => ClassFlavor::Class,
        };
        let forward = node.flag("forward");
        let access = state.member_access(node);

        if forward {
            if let Some(existing) = state.tags.get(&node.name) {
                debug!(name = %node.name, "dropping repeated forward declaration");
                return Ok(*existing);
            }
        }

        let (name, origin) = Self::tag_name(state, &node.name, flavor.keyword(), alias);
        let mut header = self.header(node, scope, name.clone(), access);
        header.origin = origin;

        let class = ClassDecl {
            flavor,
            bases: node
                .children
                .iter()
                .filter(|c| c.kind == NodeKind::BaseSpecifier)
                .map(|c| BaseSpecifier {
                    ty: TypeRef::parse(c.type_spelling.as_deref().unwrap_or(&c.name)),
                    access: c
                        .attr("access")
                        .and_then(Access::parse)
                        .unwrap_or_else(|| flavor.default_access()),
                    is_virtual: c.flag("virtual"),
                })
                .collect(),
            has_body: !forward,
            template_params: template_params(node),
            children: Vec::new(),
            is_abstract: false,
        };

        let folded = state
            .tags
            .get(&name)
            .copied()
            .filter(|id| origin == NameOrigin::Source && self.decls[id.index()].forward_only);

        let id = if forward {
            let id = self.add(scope, header, DeclKind::Class(class));
            self.decls[id.index()].forward_only = true;
            state.children.push(id);
            id
        } else if let Some(id) = folded {
            debug!(name = %name, "definition replaces forward declaration in place");
            let decl = &mut self.decls[id.index()];
            decl.forward_only = false;
            decl.access = header.access;
            decl.attributes = header.attributes;
            decl.doc = header.doc;
            decl.range = header.range;
            decl.kind = DeclKind::Class(class);
            id
        } else {
            let id = self.add(scope, header, DeclKind::Class(class));
            state.children.push(id);
            id
        };

        if origin == NameOrigin::Source {
            state.tags.entry(name).or_insert(id);
        } else {
            state.last_anonymous = Some(id);
        }

        if !forward {
            self.walk_scope(id, &node.children, flavor.default_access())?;
        }
        Ok(id)
    }

    fn visit_enum(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
        alias: Option<&str>,
    ) -> DeclId {
        let forward = node.flag("forward");
        if forward {
            if let Some(existing) = state.tags.get(&node.name) {
                return *existing;
            }
        }
        let access = state.member_access(node);
        let (name, origin) = Self::tag_name(state, &node.name, "enum", alias);
        let mut header = self.header(node, scope, name.clone(), access);
        header.origin = origin;

        let folded = state
            .tags
            .get(&name)
            .copied()
            .filter(|id| !forward && self.decls[id.index()].forward_only);
        let enum_decl = EnumDecl {
            scoped: node.flag("scoped"),
            underlying: node.type_spelling.as_deref().map(TypeRef::parse),
            constants: Vec::new(),
        };
        let id = if let Some(id) = folded {
            let decl = &mut self.decls[id.index()];
            decl.forward_only = false;
            decl.attributes = header.attributes;
            decl.doc = header.doc;
            decl.range = header.range;
            decl.kind = DeclKind::Enum(enum_decl);
            id
        } else {
            let id = self.add(scope, header, DeclKind::Enum(enum_decl));
            self.decls[id.index()].forward_only = forward;
            state.children.push(id);
            id
        };

        match origin {
            NameOrigin::Source => {
                state.tags.entry(name).or_insert(id);
            }
            NameOrigin::Synthetic | NameOrigin::TypedefAlias => state.last_anonymous = Some(id),
        }

        let mut constants = Vec::new();
        for child in node.children.iter().filter(|c| c.kind == NodeKind::EnumConstant) {
            let header = self.header(child, id, child.name.clone(), Access::Public);
            let constant = EnumConstantDecl {
                value: child.attr("value").map(Expr::parse),
                computed: None,
            };
            constants.push(self.add(id, header, DeclKind::EnumConstant(constant)));
        }
        if let DeclKind::Enum(e) = &mut self.decls[id.index()].kind {
            e.constants = constants;
        }
        id
    }

    fn visit_function(&mut self, node: &AstNode, scope: DeclId, state: &mut ScopeState) {
        let in_class = matches!(self.decls[scope.index()].kind, DeclKind::Class(_));
        let role = match node.kind {
            NodeKind::Constructor => FunctionRole::Constructor,
            NodeKind::Destructor => FunctionRole::Destructor,
            NodeKind::ConversionFunction => FunctionRole::Conversion,
            _ if is_operator_name(&node.name) => FunctionRole::Operator,
            _ if in_class => FunctionRole::Method,
            _ => FunctionRole::Free,
        };

        let mut params = Vec::new();
        let mut is_variadic = node.flag("variadic");
        for child in node.children.iter().filter(|c| c.kind == NodeKind::Parameter) {
            let spelling = child.type_spelling.as_deref().unwrap_or("").trim();
            if spelling == "..." {
                is_variadic = true;
                continue;
            }
            params.push(Parameter {
                name: (!child.name.is_empty()).then(|| child.name.clone()),
                ty: TypeRef::parse(spelling),
                default: child.attr("default").map(Expr::parse),
            });
        }

        let return_type = match role {
            FunctionRole::Constructor | FunctionRole::Destructor => None,
            _ => Some(TypeRef::parse(node.type_spelling.as_deref().unwrap_or("void"))),
        };
        let is_deleted = node.flag("deleted");
        let function = FunctionDecl {
            role,
            params,
            return_type,
            is_const: node.flag("const"),
            is_static: node.flag("static"),
            is_virtual: node.flag("virtual") || node.flag("pure"),
            is_pure: node.flag("pure"),
            is_explicit: node.flag("explicit"),
            is_deleted,
            is_variadic,
            overrides_base: node.flag("override"),
            template_params: template_params(node),
        };

        // A deleted member is unusable from bindings, which is what private means there.
        let access = if is_deleted {
            Access::Private
        } else {
            state.member_access(node)
        };
        let header = self.header(node, scope, node.name.clone(), access);
        let id = self.add(scope, header, DeclKind::Function(function));
        state.children.push(id);
    }

    fn visit_variable(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
    ) -> Result<(), ModelError> {
        let inline = self.visit_inline_tag(node, scope, state, None)?;
        let ty = match (&inline, node.type_spelling.as_deref()) {
            (Some(tag), None) => TypeRef::Named(self.decls[tag.index()].name.clone()),
            (Some(tag), Some(spelling)) if is_anonymous_spelling(spelling) => {
                respell_anonymous(spelling, &self.decls[tag.index()].name)
            }
            (None, Some(spelling)) if is_anonymous_spelling(spelling) => {
                match state.last_anonymous {
                    Some(tag) => respell_anonymous(spelling, &self.decls[tag.index()].name),
                    None => TypeRef::parse(spelling),
                }
            }
            (_, Some(spelling)) => TypeRef::parse(spelling),
            (None, None) => TypeRef::Unparsed(String::new()),
        };

        let is_static = node.flag("static");
        let variable = VariableDecl {
            ty,
            is_static,
            is_extern: node.flag("extern"),
            is_field: node.kind == NodeKind::Field && !is_static,
        };
        let access = state.member_access(node);
        let header = self.header(node, scope, node.name.clone(), access);
        let id = self.add(scope, header, DeclKind::Variable(variable));
        state.children.push(id);
        Ok(())
    }

    /// Build an aggregate or enum defined inside a variable or typedef declaration.
    fn visit_inline_tag(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
        alias: Option<&str>,
    ) -> Result<Option<DeclId>, ModelError> {
        let Some(tag) = node
            .children
            .iter()
            .find(|c| c.kind.is_aggregate() || c.kind == NodeKind::Enum)
        else {
            return Ok(None);
        };
        let id = if tag.kind == NodeKind::Enum {
            self.visit_enum(tag, scope, state, alias)
        } else {
            self.visit_aggregate(tag, scope, state, alias)?
        };
        Ok(Some(id))
    }

    fn visit_typedef(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
    ) -> Result<(), ModelError> {
        let spelling = node.type_spelling.as_deref();
        let bare = spelling.is_none_or(|s| !s.contains('*') && !s.contains('&') && !s.contains('['));

        let inline_anonymous = node
            .children
            .iter()
            .any(|c| (c.kind.is_aggregate() || c.kind == NodeKind::Enum) && is_anonymous_name(&c.name));
        let alias = (inline_anonymous && bare).then_some(node.name.as_str());
        let inline = self.visit_inline_tag(node, scope, state, alias)?;
        if alias.is_some() {
            debug!(alias = %node.name, "typedef names its anonymous definition");
            return Ok(());
        }

        let target = match (inline, spelling) {
            (Some(tag), Some(s)) if is_anonymous_spelling(s) => {
                respell_anonymous(s, &self.decls[tag.index()].name)
            }
            (Some(tag), None) => TypeRef::Named(self.decls[tag.index()].name.clone()),
            (None, Some(s)) if is_anonymous_spelling(s) => match state.last_anonymous {
                Some(tag)
                    if bare && self.decls[tag.index()].name_origin == NameOrigin::Synthetic =>
                {
                    self.rename_to_alias(tag, &node.name);
                    return Ok(());
                }
                Some(tag) => respell_anonymous(s, &self.decls[tag.index()].name),
                None => TypeRef::parse(s),
            },
            (_, Some(s)) => TypeRef::parse(s),
            (None, None) => TypeRef::Unparsed(String::new()),
        };

        if matches!(&target, TypeRef::Named(tag) if *tag == node.name) {
            self.self_named_typedef(node, scope, state)?;
            return Ok(());
        }

        let typedef = TypedefDecl {
            target,
            resolution: TypedefResolution::Pending,
            is_alias_declaration: node.kind == NodeKind::TypeAlias,
        };
        let access = state.member_access(node);
        let header = self.header(node, scope, node.name.clone(), access);
        let id = self.add(scope, header, DeclKind::Typedef(typedef));
        state.children.push(id);
        Ok(())
    }

    /// `typedef struct Foo Foo;` adds nothing over the tag itself. It still
    /// declares the tag when nothing in scope has yet.
    fn self_named_typedef(
        &mut self,
        node: &AstNode,
        scope: DeclId,
        state: &mut ScopeState,
    ) -> Result<(), ModelError> {
        if state.tags.contains_key(&node.name) {
            debug!(name = %node.name, "dropping typedef that repeats its tag");
            return Ok(());
        }
        let spelling = node.type_spelling.as_deref().unwrap_or("").trim_start();
        let kind = match spelling.split_whitespace().next() {
            Some("struct") => NodeKind::Struct,
            Some("union") => NodeKind::Union,
            Some("class") => NodeKind::Class,
            Some("enum") => {
                let tag = AstNode::new(NodeKind::Enum, node.name.clone())
                    .with_flag("forward")
                    .with_range(node.range);
                self.visit_enum(&tag, scope, state, None);
                return Ok(());
            }
            _ => {
                debug!(name = %node.name, "dropping typedef that names itself");
                return Ok(());
            }
        };
        let tag = AstNode::new(kind, node.name.clone())
            .with_flag("forward")
            .with_range(node.range);
        debug!(name = %node.name, "typedef declares its tag");
        self.visit_aggregate(&tag, scope, state, None)?;
        Ok(())
    }

    fn rename_to_alias(&mut self, id: DeclId, alias: &str) {
        debug!(alias, "typedef names preceding anonymous declaration");
        let parent = self.decls[id.index()].parent.unwrap_or(DeclId::ROOT);
        let qualified = self.qualify(parent, alias);
        let decl = &mut self.decls[id.index()];
        decl.name = alias.to_string();
        decl.qualified_name = qualified;
        decl.name_origin = NameOrigin::TypedefAlias;
    }

    fn visit_unexposed(&mut self, node: &AstNode, scope: DeclId, state: &mut ScopeState) {
        let text = node.attr("text").unwrap_or(&node.name).trim();
        if let Some((alias, enum_name)) = parse_declare_flags(text) {
            let target = TypeRef::Template {
                head: "QFlags".to_string(),
                args: vec![TemplateArg::Type(TypeRef::Named(enum_name))],
            };
            let access = state.member_access(node);
            let header = self.header(node, scope, alias, access);
            let typedef = TypedefDecl {
                target,
                resolution: TypedefResolution::Pending,
                is_alias_declaration: false,
            };
            let id = self.add(scope, header, DeclKind::Typedef(typedef));
            state.children.push(id);
            return;
        }
        let macro_name = text.split(['(', ' ', ';']).next().unwrap_or("");
        if text.is_empty() || text == ";" || IGNORED_MACROS.contains(&macro_name) {
            debug!(text, "ignoring unexposed macro");
            return;
        }
        self.add_opaque(node, scope, state);
    }

    fn add_opaque(&mut self, node: &AstNode, scope: DeclId, state: &mut ScopeState) {
        let text = node
            .attr("text")
            .map_or_else(|| node.name.clone(), |t| t.trim().to_string());
        let access = state.member_access(node);
        let header = self.header(node, scope, node.name.clone(), access);
        let subject = self.qualify(scope, &node.name);
        self.diagnostics.warn(
            if subject.is_empty() { text.clone() } else { subject },
            DiagnosticCode::OpaqueConstruct,
            format!("unsupported {} kept as opaque text", node.kind),
        );
        let id = self.add(
            scope,
            header,
            DeclKind::Opaque(OpaqueDecl {
                node_kind: node.kind,
                text,
            }),
        );
        state.children.push(id);
    }

    // -----------------------------------------------------------------------
    // Whole-model passes
    // -----------------------------------------------------------------------

    fn finish(mut self) -> Result<Model, ModelError> {
        self.check_synthetic_names()?;
        self.requalify(DeclId::ROOT);

        let mut index: std::collections::BTreeMap<String, Vec<DeclId>> =
            std::collections::BTreeMap::new();
        for decl in self.decls.iter().skip(1) {
            index
                .entry(decl.qualified_name.clone())
                .or_default()
                .push(decl.id);
        }

        self.compute_enum_values();
        let enum_spellings = self.enum_spellings();

        let mut model = Model {
            decls: self.decls,
            index,
            enum_spellings,
        };
        resolve_typedefs(&mut model, self.diagnostics);
        compute_overrides(&mut model);
        Ok(model)
    }

    fn check_synthetic_names(&self) -> Result<(), ModelError> {
        for scope in &self.decls {
            let children: &[DeclId] = match &scope.kind {
                DeclKind::Namespace(ns) => &ns.children,
                DeclKind::Class(class) => &class.children,
                _ => continue,
            };
            for id in children {
                let decl = &self.decls[id.index()];
                if decl.name_origin != NameOrigin::Synthetic {
                    continue;
                }
                let clash = children.iter().any(|other| {
                    other != id && self.decls[other.index()].name == decl.name
                });
                if clash {
                    return Err(ModelError::SyntheticNameCollision {
                        scope: scope.qualified_name.clone(),
                        name: decl.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Recompute qualified names top-down after typedef renames.
    fn requalify(&mut self, id: DeclId) {
        let children: Vec<DeclId> = match &self.decls[id.index()].kind {
            DeclKind::Namespace(ns) => ns.children.clone(),
            DeclKind::Class(class) => class.children.clone(),
            DeclKind::Enum(e) => e.constants.clone(),
            _ => return,
        };
        for child in children {
            let name = self.decls[child.index()].name.clone();
            self.decls[child.index()].qualified_name = self.qualify(id, &name);
            self.requalify(child);
        }
    }

    fn compute_enum_values(&mut self) {
        let enums: Vec<Vec<DeclId>> = self
            .decls
            .iter()
            .filter_map(|d| d.as_enum().map(|e| e.constants.clone()))
            .collect();
        for constants in enums {
            let mut known: HashMap<String, i64> = HashMap::new();
            let mut previous = Some(-1_i64);
            for id in constants {
                let decl = &self.decls[id.index()];
                let DeclKind::EnumConstant(constant) = &decl.kind else {
                    continue;
                };
                let computed = match &constant.value {
                    Some(expr) => expr.eval_integer(|name| {
                        let last = name.rsplit("::").next().unwrap_or(name);
                        known.get(last).copied()
                    }),
                    None => previous.and_then(|p| p.checked_add(1)),
                };
                if let Some(v) = computed {
                    known.insert(decl.name.clone(), v);
                }
                previous = computed;
                if let DeclKind::EnumConstant(constant) = &mut self.decls[id.index()].kind {
                    constant.computed = computed;
                }
            }
        }
    }

    fn enum_spellings(&self) -> HashMap<String, String> {
        let mut spellings = HashMap::new();
        for decl in &self.decls {
            let Some(e) = decl.as_enum() else {
                continue;
            };
            let scope = decl
                .parent
                .map_or("", |p| self.decls[p.index()].qualified_name.as_str());
            for id in &e.constants {
                let constant = &self.decls[id.index()];
                let full = constant.qualified_name.clone();
                let in_scope = if scope.is_empty() {
                    constant.name.clone()
                } else {
                    format!("{scope}::{}", constant.name)
                };
                if !e.scoped {
                    let spelled = if decl.name_origin == NameOrigin::Synthetic {
                        full.clone()
                    } else {
                        in_scope.clone()
                    };
                    spellings.entry(in_scope).or_insert(spelled);
                }
                spellings.entry(full.clone()).or_insert(full);
            }
        }
        spellings
    }
}

// ---------------------------------------------------------------------------
// Post-passes needing name lookup
// ---------------------------------------------------------------------------

fn resolve_typedefs(model: &mut Model, diagnostics: &mut Diagnostics) {
    let typedefs: Vec<DeclId> = model
        .iter()
        .filter(|d| d.as_typedef().is_some())
        .map(|d| d.id)
        .collect();
    let bound = typedefs.len() + 1;

    let mut results = Vec::with_capacity(typedefs.len());
    for id in &typedefs {
        let decl = model.get(*id);
        let Some(td) = decl.as_typedef() else {
            continue;
        };
        let mut chain = vec![decl.qualified_name.clone()];
        let mut visited = vec![*id];
        let mut ty = td.target.clone();
        let mut scope = decl.parent.unwrap_or(DeclId::ROOT);
        let mut steps = 0;

        let resolution = loop {
            let next = match &ty {
                TypeRef::Named(name) => model.resolve_type_name(scope, name),
                _ => None,
            };
            let Some(next) = next else {
                break TypedefResolution::Resolved { ty, steps };
            };
            let next_decl = model.get(next);
            let Some(next_td) = next_decl.as_typedef() else {
                break TypedefResolution::Resolved { ty, steps };
            };
            chain.push(next_decl.qualified_name.clone());
            if visited.contains(&next) || steps >= bound {
                break TypedefResolution::Cycle { chain };
            }
            visited.push(next);
            ty = next_td.target.clone();
            scope = next_decl.parent.unwrap_or(DeclId::ROOT);
            steps += 1;
        };

        if let TypedefResolution::Cycle { chain } = &resolution {
            diagnostics.error(
                decl.qualified_name.clone(),
                DiagnosticCode::TypedefCycle,
                format!("typedef chain does not terminate: {}", chain.join(" -> ")),
            );
        }
        results.push((*id, resolution));
    }

    for (id, resolution) in results {
        if let DeclKind::Typedef(td) = &mut model.decls[id.index()].kind {
            td.resolution = resolution;
        }
    }
}

fn compute_overrides(model: &mut Model) {
    let mut updates: Vec<(DeclId, bool)> = Vec::new();
    let mut abstract_classes: Vec<DeclId> = Vec::new();

    for decl in model.iter() {
        let Some(class) = decl.as_class() else {
            continue;
        };
        if class
            .children
            .iter()
            .any(|c| model.get(*c).as_function().is_some_and(|f| f.is_pure))
        {
            abstract_classes.push(decl.id);
        }
        for child in &class.children {
            let member = model.get(*child);
            let Some(function) = member.as_function() else {
                continue;
            };
            if function.overrides_base
                || function.is_static
                || function.role != FunctionRole::Method
            {
                continue;
            }
            let mut visited = vec![decl.id];
            if overrides_virtual(model, decl.id, &member.name, function, &mut visited) {
                updates.push((*child, true));
            }
        }
    }

    for (id, value) in updates {
        if let DeclKind::Function(f) = &mut model.decls[id.index()].kind {
            f.overrides_base = value;
        }
    }
    for id in abstract_classes {
        if let DeclKind::Class(c) = &mut model.decls[id.index()].kind {
            c.is_abstract = true;
        }
    }
}

fn overrides_virtual(
    model: &Model,
    class_id: DeclId,
    name: &str,
    function: &FunctionDecl,
    visited: &mut Vec<DeclId>,
) -> bool {
    for base in model.base_classes(class_id) {
        if visited.contains(&base) {
            continue;
        }
        visited.push(base);
        let declares = model.children(base).iter().any(|c| {
            let member = model.get(*c);
            member.name == name
                && member
                    .as_function()
                    .is_some_and(|f| f.is_virtual && f.signature_matches(function))
        });
        if declares || overrides_virtual(model, base, name, function, visited) {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn template_params(node: &AstNode) -> Vec<String> {
    node.children
        .iter()
        .filter_map(|c| match c.kind {
            NodeKind::TemplateTypeParameter => Some(format!("typename {}", c.name)),
            NodeKind::TemplateNonTypeParameter => Some(
                format!("{} {}", c.type_spelling.as_deref().unwrap_or("int"), c.name)
                    .trim()
                    .to_string(),
            ),
            _ => None,
        })
        .collect()
}

fn is_operator_name(name: &str) -> bool {
    name.strip_prefix("operator")
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_'))
}

/// Empty, or libclang's `(anonymous struct at f.h:3:5)` / `(unnamed enum at ...)`.
fn is_anonymous_name(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with('(')
}

fn is_anonymous_spelling(spelling: &str) -> bool {
    spelling.contains("(anonymous") || spelling.contains("(unnamed")
}

/// Replace the anonymous part of a libclang spelling with `name` and parse the rest:
/// `struct (anonymous at f.h:3:9) *` becomes `__struct0 *`.
fn respell_anonymous(spelling: &str, name: &str) -> TypeRef {
    let Some(start) = spelling.find('(') else {
        return TypeRef::parse(spelling);
    };
    let end = spelling[start..]
        .find(')')
        .map_or(spelling.len(), |e| start + e + 1);
    let respelled = format!("{name}{}", &spelling[end..]);
    TypeRef::parse(&respelled)
}

/// `Q_DECLARE_FLAGS(Flags, Enum)` → `("Flags", "Enum")`.
fn parse_declare_flags(text: &str) -> Option<(String, String)> {
    let args = text
        .strip_prefix("Q_DECLARE_FLAGS")?
        .trim()
        .strip_prefix('(')?
        .trim_end_matches(';')
        .trim()
        .strip_suffix(')')?;
    let (alias, enum_name) = args.split_once(',')?;
    Some((alias.trim().to_string(), enum_name.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operator_names() {
        assert!(is_operator_name("operator=="));
        assert!(is_operator_name("operator bool"));
        assert!(!is_operator_name("operatorCount"));
    }

    #[test]
    fn declare_flags_macro() {
        assert_eq!(
            parse_declare_flags("Q_DECLARE_FLAGS(Options, Option)"),
            Some(("Options".to_string(), "Option".to_string()))
        );
        assert_eq!(parse_declare_flags("Q_OBJECT"), None);
    }

    #[test]
    fn anonymous_spelling_is_respelled() {
        assert_eq!(
            respell_anonymous("struct (anonymous struct at x.h:3:9) *", "__struct0").to_string(),
            "__struct0 *"
        );
        assert!(is_anonymous_name("(unnamed enum at x.h:1:1)"));
        assert!(!is_anonymous_name("Named"));
    }
}
