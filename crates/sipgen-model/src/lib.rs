//! # sipgen-model
//!
//! Semantic model of the C++ declarations in one translation unit.
//!
//! The [`ast`] module defines the normalized tree any front end produces;
//! [`build_model`] walks it once into an arena of [`Decl`]s. Type spellings
//! become structural [`TypeRef`] values and default arguments become
//! [`Expr`] token streams with a canonical printer.

pub mod ast;
pub mod attributes;
pub mod builder;
pub mod defaults;
pub mod error;
pub mod expr;
pub mod model;
pub mod types;

pub use ast::{AstNode, NodeKind, SourceRange};
pub use builder::build_model;
pub use defaults::sip_default_value;
pub use error::ModelError;
pub use expr::{Expr, Token};
pub use model::{
    BaseSpecifier, ClassDecl, ClassFlavor, Decl, DeclCategory, DeclId, DeclKind,
    EnumConstantDecl, EnumDecl, FunctionDecl, FunctionRole, Model, NameOrigin, OpaqueDecl,
    Parameter, TypedefDecl, TypedefResolution, VariableDecl,
};
pub use types::{TemplateArg, TypeRef, strip_template_args};
