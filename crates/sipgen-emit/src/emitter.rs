//! SIP text rendering of a model plus its rule overlay.
//!
//! Declarations are written in source order, scope by scope. Functions are
//! grouped into their overload set at the position of the first overload.
//! Omitted declarations (rule-suppressed, hidden, private non-special
//! members) leave no trace unless rule tracing is on.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use sipgen_core::{Access, DiagnosticCode, Diagnostics};
use sipgen_model::{
    ClassDecl, ClassFlavor, Decl, DeclId, DeclKind, EnumDecl, FunctionDecl, FunctionRole, Model,
    OpaqueDecl, TypeRef, TypedefDecl, VariableDecl, sip_default_value,
};
use sipgen_rules::{AppliedActions, Overlay};
use tracing::debug;

use crate::error::EmitError;
use crate::options::EmitOptions;

/// Rendered text and the diagnostics raised while rendering.
#[derive(Debug, Clone, Default)]
pub struct Emitted {
    pub text: String,
    pub diagnostics: Diagnostics,
}

/// Render `model` with `overlay` applied.
///
/// # Errors
///
/// Returns [`EmitError::Format`] if writing to the output buffer fails.
pub fn emit(model: &Model, overlay: &Overlay, options: &EmitOptions) -> Result<Emitted, EmitError> {
    let mut emitter = Emitter {
        model,
        overlay,
        options,
        out: String::new(),
        diagnostics: Diagnostics::new(),
    };
    emitter.scope_body(DeclId::ROOT, 0, None)?;
    Ok(Emitted {
        text: emitter.out,
        diagnostics: emitter.diagnostics,
    })
}

enum Omission<'a> {
    Rule(&'a str),
    Hidden,
    Private,
}

struct Emitter<'a> {
    model: &'a Model,
    overlay: &'a Overlay,
    options: &'a EmitOptions,
    out: String,
    diagnostics: Diagnostics,
}

impl<'a> Emitter<'a> {
    // -----------------------------------------------------------------------
    // Output primitives
    // -----------------------------------------------------------------------

    fn line(&mut self, depth: usize, text: impl fmt::Display) -> fmt::Result {
        let width = depth * self.options.indent;
        writeln!(self.out, "{:width$}{text}", "")
    }

    /// Directive blocks (`%MethodCode`, `%TypeHeaderCode`) start in column 0.
    fn verbatim(&mut self, text: &str) {
        self.out.push_str(text);
        if !text.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn markers(&mut self, actions: Option<&AppliedActions>) {
        for marker in actions.into_iter().flat_map(|a| &a.markers) {
            self.verbatim(&marker.value);
        }
    }

    fn type_header_code(&mut self) -> fmt::Result {
        if self.options.header.is_empty() {
            return Ok(());
        }
        let include = self.options.include_path();
        writeln!(self.out, "%TypeHeaderCode\n#include <{include}>\n%End")
    }

    fn name_of(&self, decl: &'a Decl) -> &'a str {
        self.overlay.name_of(decl.id, &decl.name)
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn omission(&self, decl: &Decl) -> Option<Omission<'a>> {
        let actions = self.overlay.get(decl.id);
        if let Some(rule) = actions.and_then(AppliedActions::suppressed_by) {
            return Some(Omission::Rule(rule));
        }
        let forced = actions.is_some_and(AppliedActions::is_forced_visible);
        if decl.attributes.is_hidden() && !forced {
            return Some(Omission::Hidden);
        }
        let special = decl.as_function().is_some_and(|f| {
            matches!(f.role, FunctionRole::Constructor | FunctionRole::Destructor)
        });
        if decl.access == Access::Private && !special {
            return Some(Omission::Private);
        }
        None
    }

    fn scope_body(
        &mut self,
        scope: DeclId,
        depth: usize,
        flavor: Option<ClassFlavor>,
    ) -> Result<(), EmitError> {
        let model = self.model;
        let mut access = flavor.map(ClassFlavor::default_access);
        let mut seen_overloads: HashSet<&str> = HashSet::new();

        for &id in model.children(scope) {
            let decl = model.get(id);
            if decl.as_function().is_some() {
                if !seen_overloads.insert(decl.name.as_str()) {
                    continue;
                }
                for overload in model.overload_set(scope, &decl.name) {
                    self.member(overload, depth, &mut access)?;
                }
            } else {
                self.member(id, depth, &mut access)?;
            }
        }
        Ok(())
    }

    fn member(
        &mut self,
        id: DeclId,
        depth: usize,
        access: &mut Option<Access>,
    ) -> Result<(), EmitError> {
        let model = self.model;
        let decl = model.get(id);

        if let Some(omission) = self.omission(decl) {
            match omission {
                Omission::Rule(rule) => {
                    debug!(decl = %decl.qualified_name, rule, "discarded by rule");
                    if self.options.trace_rules {
                        self.line(
                            depth,
                            format_args!("// Discarded {} (by {rule})", decl.qualified_name),
                        )?;
                    }
                }
                Omission::Hidden => debug!(decl = %decl.qualified_name, "hidden symbol omitted"),
                Omission::Private => debug!(decl = %decl.qualified_name, "private member omitted"),
            }
            return Ok(());
        }

        // SIP has no protected variables.
        let promoted = matches!(decl.kind, DeclKind::Variable(_)) && decl.access == Access::Protected;
        if let Some(current) = access.as_mut() {
            if promoted {
                // The promotion line ends in a `protected:` section.
                *current = Access::Protected;
            } else if *current != decl.access {
                *current = decl.access;
                self.line(depth.saturating_sub(1), format_args!("{}:", decl.access))?;
            }
        }

        let actions = self.overlay.get(id);
        if self.options.trace_rules {
            let rules = actions.map(AppliedActions::modifying_rules).unwrap_or_default();
            if !rules.is_empty() {
                self.line(
                    depth,
                    format_args!("// Modified {} (by {}):", decl.qualified_name, rules.join(", ")),
                )?;
            }
        }

        match &decl.kind {
            DeclKind::Namespace(_) => self.container(decl, None, depth),
            DeclKind::Class(class) => self.container(decl, Some(class), depth),
            DeclKind::Enum(e) => self.enumeration(decl, e, depth),
            DeclKind::Function(f) => self.function(decl, f, depth),
            DeclKind::Variable(v) => self.variable(decl, v, depth, promoted),
            DeclKind::Typedef(t) => self.typedef(decl, t, depth),
            DeclKind::Opaque(o) => Ok(self.opaque(o, depth)?),
            // Written by their enum.
            DeclKind::EnumConstant(_) => Ok(()),
        }
    }

    fn container(
        &mut self,
        decl: &'a Decl,
        class: Option<&'a ClassDecl>,
        depth: usize,
    ) -> Result<(), EmitError> {
        let name = self.name_of(decl);
        let keyword = class.map_or("namespace", |c| c.flavor.keyword());
        let actions = self.overlay.get(decl.id);

        if decl.forward_only {
            self.line(depth, format_args!("{keyword} {name};"))?;
            return Ok(());
        }

        let mut bases = Vec::new();
        let mut annotations: Vec<&str> = Vec::new();
        if let Some(class) = class {
            for (ordinal, base) in class.bases.iter().enumerate() {
                if base.access != Access::Public {
                    continue;
                }
                if base.ty.template_head().is_some()
                    && !mentions_template_param(&base.ty, &class.template_params)
                {
                    let alias = format!("__{name}_base{ordinal}");
                    self.line(depth, format_args!("typedef {} {alias};", base.ty.unqualified()))?;
                    bases.push(alias);
                } else {
                    bases.push(base.ty.unqualified().to_string());
                }
            }
            if class.is_abstract {
                annotations.push("Abstract");
            }
            if !class.template_params.is_empty() {
                self.line(depth, format_args!("template <{}>", class.template_params.join(", ")))?;
            }
        }
        if decl.attributes.deprecated {
            annotations.push("Deprecated");
        }
        annotations.extend(actions.into_iter().flat_map(AppliedActions::annotation_values));

        let mut header = format!("{keyword} {name}");
        if !bases.is_empty() {
            write!(header, " : {}", bases.join(", "))?;
        }
        push_annotations(&mut header, &annotations)?;
        self.line(depth, header)?;
        self.line(depth, "{")?;
        self.type_header_code()?;
        self.markers(actions);
        self.scope_body(decl.id, depth + 1, class.map(|c| c.flavor))?;
        self.line(depth, "};")?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Leaf declarations
    // -----------------------------------------------------------------------

    fn enumeration(&mut self, decl: &'a Decl, e: &EnumDecl, depth: usize) -> Result<(), EmitError> {
        let model = self.model;
        let name = self.name_of(decl);
        if decl.forward_only {
            debug!(name = %decl.qualified_name, "skipping opaque enum declaration");
            return Ok(());
        }
        let keyword = if e.scoped { "enum class" } else { "enum" };
        let annotations: Vec<&str> = self
            .overlay
            .get(decl.id)
            .into_iter()
            .flat_map(AppliedActions::annotation_values)
            .collect();

        let mut header = format!("{keyword} {name}");
        push_annotations(&mut header, &annotations)?;
        header.push_str(" {");
        self.line(depth, header)?;

        let constants: Vec<&str> = e
            .constants
            .iter()
            .filter(|id| !self.overlay.is_suppressed(**id))
            .map(|id| self.name_of(model.get(*id)))
            .collect();
        for (i, constant) in constants.iter().enumerate() {
            let separator = if i + 1 < constants.len() { "," } else { "" };
            self.line(depth + 1, format_args!("{constant}{separator}"))?;
        }
        self.line(depth, "};")?;
        Ok(())
    }

    fn function(&mut self, decl: &'a Decl, f: &FunctionDecl, depth: usize) -> Result<(), EmitError> {
        let model = self.model;
        let actions = self.overlay.get(decl.id);
        let scope = decl.parent.unwrap_or(DeclId::ROOT);

        let mut name = self.name_of(decl).to_string();
        if f.role == FunctionRole::Destructor && !name.starts_with('~') {
            name.insert(0, '~');
        }
        let ret = match f.role {
            FunctionRole::Constructor | FunctionRole::Destructor | FunctionRole::Conversion => None,
            _ => actions
                .and_then(|a| a.type_override.as_ref())
                .map(|o| &o.value)
                .or(f.return_type.as_ref()),
        };

        let unrepresentable = ret
            .into_iter()
            .chain(f.params.iter().map(|p| &p.ty))
            .find(|ty| !sip_representable(ty));
        if let Some(ty) = unrepresentable {
            return self.unrepresentable(decl, ty, depth);
        }

        let mut params = Vec::with_capacity(f.params.len() + 1);
        for (index, param) in f.params.iter().enumerate() {
            let mut text = param
                .name
                .as_deref()
                .map_or_else(|| param.ty.to_string(), |n| param.ty.declare(n));
            let annotations: Vec<&str> = actions
                .map(|a| a.parameter_annotation_values(index).collect())
                .unwrap_or_default();
            push_annotations(&mut text, &annotations)?;
            let default = actions
                .and_then(|a| a.defaults.get(&index))
                .map(|d| d.value.clone())
                .or_else(|| {
                    param
                        .default
                        .as_ref()
                        .map(|expr| sip_default_value(model, scope, &param.ty, expr))
                });
            if let Some(default) = default {
                write!(text, " = {default}")?;
            }
            params.push(text);
        }
        if f.is_variadic {
            params.push("...".to_string());
        }

        let call = format!("{name}({})", params.join(", "));
        let mut text = String::new();
        if f.is_static {
            text.push_str("static ");
        }
        if f.is_virtual {
            text.push_str("virtual ");
        }
        match ret {
            Some(ret) => text.push_str(&ret.declare(&call)),
            None => text.push_str(&call),
        }
        if f.is_const {
            text.push_str(" const");
        }
        if f.is_pure {
            text.push_str(" = 0");
        }
        let mut annotations: Vec<&str> = Vec::new();
        if decl.attributes.deprecated {
            annotations.push("Deprecated");
        }
        annotations.extend(actions.into_iter().flat_map(AppliedActions::annotation_values));
        push_annotations(&mut text, &annotations)?;
        text.push(';');

        if !f.template_params.is_empty() {
            self.line(depth, format_args!("template <{}>", f.template_params.join(", ")))?;
        }
        self.line(depth, text)?;
        self.markers(actions);
        Ok(())
    }

    fn variable(
        &mut self,
        decl: &'a Decl,
        v: &VariableDecl,
        depth: usize,
        promoted: bool,
    ) -> Result<(), EmitError> {
        let actions = self.overlay.get(decl.id);
        let ty = actions
            .and_then(|a| a.type_override.as_ref())
            .map_or(&v.ty, |o| &o.value);
        if !sip_representable(ty) {
            return self.unrepresentable(decl, ty, depth);
        }

        let mut text = String::new();
        if v.is_static {
            text.push_str("static ");
        }
        text.push_str(&ty.declare(self.name_of(decl)));
        let mut annotations: Vec<&str> = Vec::new();
        if decl.attributes.deprecated {
            annotations.push("Deprecated");
        }
        annotations.extend(actions.into_iter().flat_map(AppliedActions::annotation_values));
        push_annotations(&mut text, &annotations)?;

        if promoted {
            self.line(depth, format_args!("public: {text}; protected: // Promoted to public"))?;
        } else {
            self.line(depth, format_args!("{text};"))?;
        }
        Ok(())
    }

    fn typedef(&mut self, decl: &'a Decl, t: &TypedefDecl, depth: usize) -> Result<(), EmitError> {
        let actions = self.overlay.get(decl.id);
        let target = actions
            .and_then(|a| a.type_override.as_ref())
            .map_or(&t.target, |o| &o.value);
        if !sip_representable(target) {
            return self.unrepresentable(decl, target, depth);
        }

        // SIP rejects /Deprecated/ on typedefs.
        let annotations: Vec<&str> = actions
            .into_iter()
            .flat_map(AppliedActions::annotation_values)
            .collect();
        let mut text = format!("typedef {}", target.declare(self.name_of(decl)));
        push_annotations(&mut text, &annotations)?;
        text.push(';');
        self.line(depth, text)?;
        Ok(())
    }

    fn opaque(&mut self, o: &OpaqueDecl, depth: usize) -> fmt::Result {
        let text = o.text.split_whitespace().collect::<Vec<_>>().join(" ");
        self.line(depth, format_args!("// Opaque {}: {text}", o.node_kind.as_str()))
    }

    fn unrepresentable(&mut self, decl: &Decl, ty: &TypeRef, depth: usize) -> Result<(), EmitError> {
        self.diagnostics.warn(
            &decl.qualified_name,
            DiagnosticCode::UnrepresentableType,
            format!("type `{ty}` has no SIP spelling; emitted as a comment"),
        );
        self.line(
            depth,
            format_args!("// Opaque {}: {}", decl.category().as_str(), decl.qualified_name),
        )?;
        Ok(())
    }
}

/// SIP cannot spell pointer-to-member types or functions returning function
/// pointers.
fn sip_representable(ty: &TypeRef) -> bool {
    if !ty.is_representable() {
        return false;
    }
    match ty.unqualified() {
        TypeRef::FunctionPointer { ret, params } => {
            !matches!(ret.unqualified(), TypeRef::FunctionPointer { .. })
                && sip_representable(ret)
                && params.iter().all(sip_representable)
        }
        TypeRef::Pointer(inner) => sip_representable(inner),
        _ => true,
    }
}

/// A base such as `QList<T>` inside `template <typename T>` cannot be aliased
/// outside the template.
fn mentions_template_param(ty: &TypeRef, params: &[String]) -> bool {
    if params.is_empty() {
        return false;
    }
    let names: HashSet<&str> = params
        .iter()
        .filter_map(|p| p.split_whitespace().last())
        .map(|name| name.trim_start_matches('.'))
        .collect();
    ty.to_string()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .any(|word| names.contains(word))
}

fn push_annotations(text: &mut String, annotations: &[&str]) -> fmt::Result {
    if annotations.is_empty() {
        return Ok(());
    }
    write!(text, " /{}/", annotations.join(","))
}
