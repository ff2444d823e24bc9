//! SIP spellings of parameter default values.
//!
//! The source expression is kept as written except where SIP (or the C++ it
//! generates outside the declaring scope) cannot accept it: null-pointer
//! macros, empty brace-init, and enumerators referenced without qualification.

use crate::expr::{Expr, NULL_SPELLINGS};
use crate::model::{DeclId, Model};
use crate::types::TypeRef;

/// Spell `expr`, the default of a parameter of type `ty` declared in `scope`.
#[must_use]
pub fn sip_default_value(model: &Model, scope: DeclId, ty: &TypeRef, expr: &Expr) -> String {
    if expr.is_null_pointer() {
        return "nullptr".to_string();
    }
    if expr.is_empty_braces() {
        return empty_init(model, scope, ty);
    }
    expr.with_call_init()
        .map_identifiers(|name| {
            if NULL_SPELLINGS.contains(&name) {
                return Some("nullptr".to_string());
            }
            model
                .enum_constant_spelling(scope, name)
                .filter(|spelled| *spelled != name)
                .map(str::to_string)
        })
        .to_string()
}

/// Value for `{}` given the parameter type.
fn empty_init(model: &Model, scope: DeclId, ty: &TypeRef) -> String {
    let base = ty.unqualified();
    if model.is_pointer_like(scope, base) {
        return "nullptr".to_string();
    }
    if model.is_enum_like(scope, base) {
        return "0".to_string();
    }
    match base {
        TypeRef::Primitive(p) if p == "bool" => "false".to_string(),
        TypeRef::Primitive(_) => "0".to_string(),
        other => format!("{other}()"),
    }
}
