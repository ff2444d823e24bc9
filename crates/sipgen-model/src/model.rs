//! Arena-backed declaration model.
//!
//! Every declaration lives in one `Vec<Decl>` indexed by [`DeclId`]. Scopes own
//! their children as ordered id lists; each declaration points back at its
//! owner through a non-owning `parent` id. The model is immutable once built.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use sipgen_core::{Access, DeclAttributes};

use crate::ast::{NodeKind, SourceRange};
use crate::expr::Expr;
use crate::types::TypeRef;

// ---------------------------------------------------------------------------
// Ids and categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u32);

impl DeclId {
    /// The global scope.
    pub const ROOT: Self = Self(0);

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse declaration category, used by rule kind filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclCategory {
    Namespace,
    Class,
    Enum,
    EnumConstant,
    Function,
    Variable,
    Typedef,
    Opaque,
}

impl DeclCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Enum => "enum",
            Self::EnumConstant => "enum_constant",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Typedef => "typedef",
            Self::Opaque => "opaque",
        }
    }
}

impl fmt::Display for DeclCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a declaration's name came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameOrigin {
    Source,
    /// Positional `__enumN` / `__structN` / `__unionN`.
    Synthetic,
    /// Anonymous entity named by the typedef that wrapped it.
    TypedefAlias,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Decl {
    pub id: DeclId,
    pub name: String,
    pub qualified_name: String,
    pub name_origin: NameOrigin,
    pub parent: Option<DeclId>,
    pub access: Access,
    pub attributes: DeclAttributes,
    /// Declared but never defined in this translation unit.
    pub forward_only: bool,
    pub doc: Option<String>,
    pub range: SourceRange,
    pub kind: DeclKind,
}

impl Decl {
    /// Anonymous in source, whatever name it was given since.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.name_origin != NameOrigin::Source
    }

    #[must_use]
    pub const fn category(&self) -> DeclCategory {
        match &self.kind {
            DeclKind::Namespace(_) => DeclCategory::Namespace,
            DeclKind::Class(_) => DeclCategory::Class,
            DeclKind::Enum(_) => DeclCategory::Enum,
            DeclKind::EnumConstant(_) => DeclCategory::EnumConstant,
            DeclKind::Function(_) => DeclCategory::Function,
            DeclKind::Variable(_) => DeclCategory::Variable,
            DeclKind::Typedef(_) => DeclCategory::Typedef,
            DeclKind::Opaque(_) => DeclCategory::Opaque,
        }
    }

    /// Namespace or class: something other declarations can live in.
    #[must_use]
    pub const fn is_scope(&self) -> bool {
        matches!(self.kind, DeclKind::Namespace(_) | DeclKind::Class(_))
    }

    #[must_use]
    pub const fn as_function(&self) -> Option<&FunctionDecl> {
        match &self.kind {
            DeclKind::Function(f) => Some(f),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            DeclKind::Class(c) => Some(c),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_enum(&self) -> Option<&EnumDecl> {
        match &self.kind {
            DeclKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_typedef(&self) -> Option<&TypedefDecl> {
        match &self.kind {
            DeclKind::Typedef(t) => Some(t),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Namespace(NamespaceDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    EnumConstant(EnumConstantDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
    Typedef(TypedefDecl),
    Opaque(OpaqueDecl),
}

#[derive(Debug, Clone, Default)]
pub struct NamespaceDecl {
    pub children: Vec<DeclId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassFlavor {
    Class,
    Struct,
    Union,
}

impl ClassFlavor {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
        }
    }

    /// Member access before any access specifier.
    #[must_use]
    pub const fn default_access(self) -> Access {
        match self {
            Self::Class => Access::Private,
            Self::Struct | Self::Union => Access::Public,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSpecifier {
    pub ty: TypeRef,
    pub access: Access,
    pub is_virtual: bool,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub flavor: ClassFlavor,
    pub bases: Vec<BaseSpecifier>,
    pub has_body: bool,
    pub template_params: Vec<String>,
    pub children: Vec<DeclId>,
    /// Declares at least one pure virtual member.
    pub is_abstract: bool,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub scoped: bool,
    pub underlying: Option<TypeRef>,
    pub constants: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct EnumConstantDecl {
    pub value: Option<Expr>,
    /// Explicit or implicit integral value, when it can be determined.
    pub computed: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionRole {
    Free,
    Method,
    Constructor,
    Destructor,
    Conversion,
    Operator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: TypeRef,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub role: FunctionRole,
    pub params: Vec<Parameter>,
    /// `None` for constructors and destructors.
    pub return_type: Option<TypeRef>,
    pub is_const: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure: bool,
    pub is_explicit: bool,
    pub is_deleted: bool,
    pub is_variadic: bool,
    /// Overrides a virtual member of some (transitive) base class.
    pub overrides_base: bool,
    pub template_params: Vec<String>,
}

impl FunctionDecl {
    /// Parameter types and constness: the shape overloads differ by.
    #[must_use]
    pub fn signature_matches(&self, other: &Self) -> bool {
        self.is_const == other.is_const
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.ty == b.ty)
    }

    /// `(int, const QString &) const`
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.to_string()).collect();
        let mut out = format!("({})", params.join(", "));
        if self.is_const {
            out.push_str(" const");
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub ty: TypeRef,
    pub is_static: bool,
    pub is_extern: bool,
    /// Non-static data member.
    pub is_field: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedefResolution {
    /// Not yet walked; never observable after building.
    Pending,
    /// Final type after following `steps` typedef hops.
    Resolved { ty: TypeRef, steps: usize },
    /// The chain returned to a typedef already visited.
    Cycle { chain: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct TypedefDecl {
    pub target: TypeRef,
    pub resolution: TypedefResolution,
    /// Spelled `using Name = ...;`.
    pub is_alias_declaration: bool,
}

#[derive(Debug, Clone)]
pub struct OpaqueDecl {
    pub node_kind: NodeKind,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) decls: Vec<Decl>,
    pub(crate) index: BTreeMap<String, Vec<DeclId>>,
    /// Accessible constant spelling (`Scope::C`) to emitted spelling.
    pub(crate) enum_spellings: HashMap<String, String>,
}

impl Model {
    #[must_use]
    pub fn root(&self) -> &Decl {
        &self.decls[DeclId::ROOT.index()]
    }

    #[must_use]
    pub fn get(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.decls.len() <= 1
    }

    /// Owned declarations in source order (enum constants for enums).
    #[must_use]
    pub fn children(&self, id: DeclId) -> &[DeclId] {
        match &self.get(id).kind {
            DeclKind::Namespace(ns) => &ns.children,
            DeclKind::Class(class) => &class.children,
            DeclKind::Enum(e) => &e.constants,
            _ => &[],
        }
    }

    /// Every declaration registered under a fully qualified name.
    #[must_use]
    pub fn lookup(&self, qualified_name: &str) -> &[DeclId] {
        self.index
            .get(qualified_name.trim_start_matches("::"))
            .map_or(&[], Vec::as_slice)
    }

    /// Qualified names in sorted order, for stable iteration.
    pub fn qualified_names(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Functions named `name` directly in `scope`, in declaration order.
    #[must_use]
    pub fn overload_set(&self, scope: DeclId, name: &str) -> Vec<DeclId> {
        self.children(scope)
            .iter()
            .copied()
            .filter(|id| {
                let decl = self.get(*id);
                decl.name == name && matches!(decl.kind, DeclKind::Function(_))
            })
            .collect()
    }

    /// `id` itself when it is a scope, then each enclosing scope up to the root.
    #[must_use]
    pub fn scope_chain(&self, id: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cur) = current {
            if self.get(cur).is_scope() {
                chain.push(cur);
            }
            current = self.get(cur).parent;
        }
        chain
    }

    /// Find the class, enum, or typedef `name` refers to when used inside `scope`.
    ///
    /// Definitions are preferred over forward declarations, and both over
    /// typedefs sharing the name (`typedef struct Foo Foo;`).
    #[must_use]
    pub fn resolve_type_name(&self, scope: DeclId, name: &str) -> Option<DeclId> {
        let name = name.trim_start_matches("::");
        if name.is_empty() {
            return None;
        }
        for s in self.scope_chain(scope) {
            let candidate = if s == DeclId::ROOT {
                name.to_string()
            } else {
                format!("{}::{name}", self.get(s).qualified_name)
            };
            if let Some(found) = self.best_type_decl(self.lookup(&candidate)) {
                return Some(found);
            }
        }
        None
    }

    fn best_type_decl(&self, ids: &[DeclId]) -> Option<DeclId> {
        let rank = |id: &DeclId| {
            let decl = self.get(*id);
            match &decl.kind {
                DeclKind::Class(_) | DeclKind::Enum(_) if !decl.forward_only => Some(0),
                DeclKind::Class(_) | DeclKind::Enum(_) => Some(1),
                DeclKind::Typedef(_) => Some(2),
                _ => None,
            }
        };
        ids.iter()
            .filter_map(|id| rank(id).map(|r| (r, *id)))
            .min_by_key(|(r, id)| (*r, *id))
            .map(|(_, id)| id)
    }

    /// Follow typedefs behind `ty` (used inside `scope`) to the declaration it
    /// finally names, if any.
    #[must_use]
    pub fn resolve_type_decl(&self, scope: DeclId, ty: &TypeRef) -> Option<DeclId> {
        let mut scope = scope;
        let mut current = ty.unqualified().clone();
        for _ in 0..=self.decls.len() {
            let name = match &current {
                TypeRef::Named(name) => name.clone(),
                TypeRef::Template { head, .. } => head.clone(),
                _ => return None,
            };
            let id = self.resolve_type_name(scope, &name)?;
            match &self.get(id).kind {
                DeclKind::Typedef(TypedefDecl {
                    resolution: TypedefResolution::Resolved { ty, .. },
                    ..
                }) if matches!(current, TypeRef::Named(_)) => {
                    current = ty.unqualified().clone();
                    scope = self.get(id).parent.unwrap_or(DeclId::ROOT);
                }
                _ => return Some(id),
            }
        }
        None
    }

    /// Enum or `QFlags` value type, possibly behind typedefs.
    #[must_use]
    pub fn is_enum_like(&self, scope: DeclId, ty: &TypeRef) -> bool {
        if ty.template_head() == Some("QFlags") {
            return true;
        }
        let Some(id) = self.resolve_type_decl(scope, ty) else {
            return false;
        };
        match &self.get(id).kind {
            DeclKind::Enum(_) => true,
            DeclKind::Typedef(t) => match &t.resolution {
                TypedefResolution::Resolved { ty, .. } => ty.template_head() == Some("QFlags"),
                _ => false,
            },
            _ => false,
        }
    }

    /// Pointer type, possibly behind typedefs.
    #[must_use]
    pub fn is_pointer_like(&self, scope: DeclId, ty: &TypeRef) -> bool {
        if ty.is_pointer() {
            return true;
        }
        let Some(name) = ty.head_name() else {
            return false;
        };
        self.resolve_type_name(scope, name)
            .and_then(|id| self.get(id).as_typedef())
            .is_some_and(|t| match &t.resolution {
                TypedefResolution::Resolved { ty, .. } => ty.is_pointer(),
                _ => false,
            })
    }

    /// Emitted spelling of an enumerator referenced as `ident` from inside `scope`.
    ///
    /// Searches outward through enclosing scopes and, for classes, their bases.
    #[must_use]
    pub fn enum_constant_spelling(&self, scope: DeclId, ident: &str) -> Option<&str> {
        let ident = ident.trim_start_matches("::");
        let mut visited = Vec::new();
        for s in self.scope_chain(scope) {
            if let Some(found) = self.enum_constant_in(s, ident, &mut visited) {
                return Some(found);
            }
        }
        None
    }

    fn enum_constant_in(
        &self,
        scope: DeclId,
        ident: &str,
        visited: &mut Vec<DeclId>,
    ) -> Option<&str> {
        if visited.contains(&scope) {
            return None;
        }
        visited.push(scope);
        let key = if scope == DeclId::ROOT {
            ident.to_string()
        } else {
            format!("{}::{ident}", self.get(scope).qualified_name)
        };
        if let Some(found) = self.enum_spellings.get(&key) {
            return Some(found);
        }
        for base in self.base_classes(scope) {
            if let Some(found) = self.enum_constant_in(base, ident, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Class declarations named by `class_id`'s base list, where known.
    #[must_use]
    pub fn base_classes(&self, class_id: DeclId) -> Vec<DeclId> {
        let Some(class) = self.get(class_id).as_class() else {
            return Vec::new();
        };
        let scope = self.get(class_id).parent.unwrap_or(DeclId::ROOT);
        class
            .bases
            .iter()
            .filter_map(|base| self.resolve_type_decl(scope, &base.ty))
            .filter(|id| *id != class_id && self.get(*id).as_class().is_some())
            .collect()
    }
}
