use pretty_assertions::assert_eq;
use sipgen_core::{Access, DiagnosticCode, Diagnostics, Severity, SymbolVisibility};
use sipgen_model::{
    AstNode, DeclId, DeclKind, Expr, FunctionRole, Model, ModelError, NameOrigin, NodeKind,
    TypeRef, TypedefResolution, build_model, sip_default_value,
};

// ════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════

fn build(children: Vec<AstNode>) -> (Model, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let model = build_model(&AstNode::translation_unit(children), &mut diagnostics)
        .expect("model should build");
    (model, diagnostics)
}

fn find(model: &Model, qualified: &str) -> DeclId {
    let ids = model.lookup(qualified);
    assert!(
        !ids.is_empty(),
        "no declaration '{qualified}'. Available: {:?}",
        model.qualified_names().collect::<Vec<_>>()
    );
    ids[0]
}

fn child_names(model: &Model, scope: DeclId) -> Vec<String> {
    model
        .children(scope)
        .iter()
        .map(|id| model.get(*id).name.clone())
        .collect()
}

fn class(name: &str) -> AstNode {
    AstNode::new(NodeKind::Class, name)
}

fn anon_enum(constants: &[&str]) -> AstNode {
    AstNode::new(NodeKind::Enum, "").with_children(
        constants
            .iter()
            .map(|c| AstNode::new(NodeKind::EnumConstant, *c)),
    )
}

fn method(name: &str, ret: &str) -> AstNode {
    AstNode::new(NodeKind::Method, name).with_type(ret)
}

fn param(name: &str, ty: &str) -> AstNode {
    AstNode::new(NodeKind::Parameter, name).with_type(ty)
}

fn public() -> AstNode {
    AstNode::new(NodeKind::AccessSpecifier, "public")
}

// ════════════════════════════════════════════════════════════════
// Anonymous naming
// ════════════════════════════════════════════════════════════════

#[test]
fn anonymous_siblings_get_positional_names() {
    let (model, _) = build(vec![class("MyObject").with_children([
        public(),
        anon_enum(&["Val1", "Val2"]),
        AstNode::new(NodeKind::Struct, "").with_child(
            AstNode::new(NodeKind::Field, "x").with_type("int"),
        ),
        anon_enum(&["Other"]),
    ])]);

    let obj = find(&model, "MyObject");
    assert_eq!(child_names(&model, obj), vec!["__enum0", "__struct1", "__enum2"]);
    let first = model.get(find(&model, "MyObject::__enum0"));
    assert_eq!(first.name_origin, NameOrigin::Synthetic);
    assert!(first.is_anonymous());
}

#[test]
fn synthetic_names_are_scoped_per_owner() {
    let (model, _) = build(vec![
        anon_enum(&["A"]),
        class("Outer").with_child(anon_enum(&["B"])),
    ]);
    find(&model, "__enum0");
    find(&model, "Outer::__enum0");
}

#[test]
fn typedef_of_anonymous_enum_takes_alias_name() {
    let (model, _) = build(vec![
        AstNode::new(NodeKind::Typedef, "Color").with_child(anon_enum(&["Red", "Green"])),
        anon_enum(&["Loose"]),
    ]);

    let color = model.get(find(&model, "Color"));
    assert_eq!(color.name_origin, NameOrigin::TypedefAlias);
    assert!(color.as_enum().is_some(), "alias should name the enum itself");
    assert_eq!(model.lookup("Color").len(), 1, "no separate typedef entity");
    // The aliased enum still consumed ordinal 0.
    find(&model, "__enum1");
}

#[test]
fn libclang_style_typedef_attaches_to_preceding_anonymous() {
    let (model, _) = build(vec![
        AstNode::new(NodeKind::Struct, "").with_child(
            AstNode::new(NodeKind::Field, "x").with_type("int"),
        ),
        AstNode::new(NodeKind::Typedef, "Point")
            .with_type("struct (anonymous struct at point.h:1:9)"),
    ]);
    let point = model.get(find(&model, "Point"));
    assert!(point.as_class().is_some());
    assert!(model.lookup("__struct0").is_empty());
    find(&model, "Point::x");
}

#[test]
fn anonymous_struct_member_type_refers_to_synthetic_name() {
    let (model, _) = build(vec![AstNode::new(NodeKind::Struct, "Holder").with_child(
        AstNode::new(NodeKind::Field, "inner").with_child(
            AstNode::new(NodeKind::Struct, "").with_child(
                AstNode::new(NodeKind::Field, "a").with_type("int"),
            ),
        ),
    )]);
    let holder = find(&model, "Holder");
    assert_eq!(child_names(&model, holder), vec!["__struct0", "inner"]);
    let DeclKind::Variable(var) = &model.get(find(&model, "Holder::inner")).kind else {
        panic!("expected variable");
    };
    assert_eq!(var.ty, TypeRef::named("__struct0"));
}

#[test]
fn synthetic_name_collision_is_fatal() {
    let mut diagnostics = Diagnostics::new();
    let tree = AstNode::translation_unit(vec![
        anon_enum(&["A"]),
        AstNode::new(NodeKind::Variable, "__enum0").with_type("int"),
    ]);
    let err = build_model(&tree, &mut diagnostics).unwrap_err();
    assert!(matches!(err, ModelError::SyntheticNameCollision { ref name, .. } if name == "__enum0"));
}

#[test]
fn non_translation_unit_root_is_rejected() {
    let mut diagnostics = Diagnostics::new();
    let err = build_model(&class("X"), &mut diagnostics).unwrap_err();
    assert!(matches!(err, ModelError::InvalidRoot { .. }));
}

// ════════════════════════════════════════════════════════════════
// Forward declarations
// ════════════════════════════════════════════════════════════════

#[test]
fn definition_replaces_forward_in_place() {
    let (model, _) = build(vec![
        class("Later").with_flag("forward"),
        class("Middle"),
        class("Later").with_child(method("run", "void")),
    ]);
    assert_eq!(child_names(&model, DeclId::ROOT), vec!["Later", "Middle"]);
    let later = model.get(find(&model, "Later"));
    assert!(!later.forward_only);
    assert!(later.as_class().is_some_and(|c| c.has_body));
    find(&model, "Later::run");
}

#[test]
fn forward_only_is_recorded() {
    let (model, _) = build(vec![class("FwdDecl").with_flag("forward")]);
    let fwd = model.get(find(&model, "FwdDecl"));
    assert!(fwd.forward_only);
    assert!(fwd.as_class().is_some_and(|c| !c.has_body));
}

#[test]
fn forward_after_definition_is_dropped() {
    let (model, _) = build(vec![class("Done"), class("Done").with_flag("forward")]);
    assert_eq!(model.lookup("Done").len(), 1);
    assert!(!model.get(find(&model, "Done")).forward_only);
}

// ════════════════════════════════════════════════════════════════
// Scopes, access, linkage
// ════════════════════════════════════════════════════════════════

#[test]
fn extern_c_block_is_transparent() {
    let (model, _) = build(vec![AstNode::new(NodeKind::LinkageSpec, "C").with_children([
        AstNode::new(NodeKind::Function, "c_function").with_type("int"),
        AstNode::new(NodeKind::Variable, "c_counter")
            .with_type("int")
            .with_flag("extern"),
    ])]);
    assert_eq!(
        child_names(&model, DeclId::ROOT),
        vec!["c_function", "c_counter"]
    );
    let f = model.get(find(&model, "c_function"));
    assert_eq!(f.as_function().map(|f| f.role), Some(FunctionRole::Free));
}

#[test]
fn access_follows_specifiers_and_class_default() {
    let (model, _) = build(vec![class("Access").with_children([
        method("hiddenByDefault", "void"),
        AstNode::new(NodeKind::AccessSpecifier, "protected"),
        method("prot", "void"),
        public(),
        method("pub", "void"),
    ])]);
    let access = |name: &str| model.get(find(&model, name)).access;
    assert_eq!(access("Access::hiddenByDefault"), Access::Private);
    assert_eq!(access("Access::prot"), Access::Protected);
    assert_eq!(access("Access::pub"), Access::Public);
}

#[test]
fn reopened_namespaces_share_qualified_name() {
    let (model, _) = build(vec![
        AstNode::new(NodeKind::Namespace, "SomeNS").with_child(class("A")),
        AstNode::new(NodeKind::Namespace, "SomeNS").with_child(class("B")),
    ]);
    assert_eq!(model.lookup("SomeNS").len(), 2);
    find(&model, "SomeNS::A");
    find(&model, "SomeNS::B");
}

#[test]
fn friends_and_usings_produce_no_declarations() {
    let (model, diagnostics) = build(vec![class("F").with_children([
        AstNode::new(NodeKind::Friend, "Other"),
        AstNode::new(NodeKind::UsingDeclaration, "Base::f"),
    ])]);
    assert!(model.children(find(&model, "F")).is_empty());
    assert!(diagnostics.is_empty());
}

#[test]
fn overload_set_keeps_declaration_order() {
    let (model, _) = build(vec![class("MyObject").with_children([
        public(),
        method("addThree", "int").with_child(param("v", "int")),
        method("other", "void"),
        method("addThree", "QList<int>").with_child(param("v", "QList<int>")),
        method("addThree", "QString").with_children([
            param("a", "const QString &"),
            param("b", "const QString &"),
        ]),
    ])]);
    let scope = find(&model, "MyObject");
    let set = model.overload_set(scope, "addThree");
    let sigs: Vec<String> = set
        .iter()
        .filter_map(|id| model.get(*id).as_function().map(|f| f.signature()))
        .collect();
    assert_eq!(
        sigs,
        vec![
            "(int)",
            "(QList<int>)",
            "(const QString &, const QString &)"
        ]
    );
    assert_eq!(model.lookup("MyObject::addThree").len(), 3);
}

// ════════════════════════════════════════════════════════════════
// Attributes and opaque nodes
// ════════════════════════════════════════════════════════════════

#[test]
fn attribute_macros_collapse() {
    let (model, diagnostics) = build(vec![
        class("Exported").with_child(AstNode::new(NodeKind::Attribute, "MYLIB_EXPORT")),
        class("Internal").with_child(AstNode::new(NodeKind::Attribute, "MYLIB_NO_EXPORT")),
        AstNode::new(NodeKind::Function, "old")
            .with_type("void")
            .with_child(AstNode::new(NodeKind::Attribute, "MYLIB_DEPRECATED")),
        AstNode::new(NodeKind::Function, "odd")
            .with_type("void")
            .with_child(AstNode::new(NodeKind::Attribute, "MY_STRANGE_MACRO")),
    ]);
    let attrs = |n: &str| model.get(find(&model, n)).attributes;
    assert_eq!(attrs("Exported").visibility, SymbolVisibility::Export);
    assert!(attrs("Internal").is_hidden());
    assert!(attrs("old").deprecated);

    assert_eq!(diagnostics.len(), 1);
    let record = &diagnostics.records()[0];
    assert_eq!(record.subject, "odd");
    assert_eq!(record.code, DiagnosticCode::UnknownAttribute);
    assert_eq!(record.severity, Severity::Warning);
}

#[test]
fn unexposed_node_becomes_opaque_with_warning() {
    let (model, diagnostics) = build(vec![
        AstNode::new(NodeKind::Unexposed, "").with_attr("text", "MYSTERY_MACRO(x, y)"),
        class("After"),
    ]);
    let root_children = model.children(DeclId::ROOT);
    assert_eq!(root_children.len(), 2);
    let DeclKind::Opaque(opaque) = &model.get(root_children[0]).kind else {
        panic!("expected opaque placeholder");
    };
    assert_eq!(opaque.text, "MYSTERY_MACRO(x, y)");
    assert_eq!(diagnostics.count(Severity::Warning), 1);
    assert_eq!(diagnostics.records()[0].code, DiagnosticCode::OpaqueConstruct);
}

#[test]
fn known_qt_macros_are_skipped_and_declare_flags_becomes_typedef() {
    let (model, diagnostics) = build(vec![class("MyObject").with_children([
        AstNode::new(NodeKind::Unexposed, "").with_attr("text", "Q_OBJECT"),
        public(),
        AstNode::new(NodeKind::Enum, "LocalEnum")
            .with_child(AstNode::new(NodeKind::EnumConstant, "Val1")),
        AstNode::new(NodeKind::Unexposed, "")
            .with_attr("text", "Q_DECLARE_FLAGS(LocalEnums, LocalEnum)"),
    ])]);
    assert!(diagnostics.is_empty());
    let td = model.get(find(&model, "MyObject::LocalEnums"));
    let typedef = td.as_typedef().expect("typedef");
    assert_eq!(typedef.target.to_string(), "QFlags<LocalEnum>");
}

// ════════════════════════════════════════════════════════════════
// Enums
// ════════════════════════════════════════════════════════════════

#[test]
fn enum_values_continue_from_explicit() {
    let (model, _) = build(vec![AstNode::new(NodeKind::Enum, "E").with_children([
        AstNode::new(NodeKind::EnumConstant, "A"),
        AstNode::new(NodeKind::EnumConstant, "B").with_attr("value", "0x10"),
        AstNode::new(NodeKind::EnumConstant, "C"),
        AstNode::new(NodeKind::EnumConstant, "D").with_attr("value", "B | C"),
        AstNode::new(NodeKind::EnumConstant, "F").with_attr("value", "external()"),
        AstNode::new(NodeKind::EnumConstant, "G"),
    ])]);
    let value = |n: &str| match &model.get(find(&model, n)).kind {
        DeclKind::EnumConstant(c) => c.computed,
        _ => panic!("not a constant"),
    };
    assert_eq!(value("E::A"), Some(0));
    assert_eq!(value("E::B"), Some(16));
    assert_eq!(value("E::C"), Some(17));
    assert_eq!(value("E::D"), Some(17));
    assert_eq!(value("E::F"), None);
    assert_eq!(value("E::G"), None);
}

// ════════════════════════════════════════════════════════════════
// Typedef resolution
// ════════════════════════════════════════════════════════════════

#[test]
fn typedef_chain_resolves_in_chain_length_steps() {
    let (model, diagnostics) = build(vec![
        AstNode::new(NodeKind::Typedef, "A").with_type("int"),
        AstNode::new(NodeKind::Typedef, "B").with_type("A"),
        AstNode::new(NodeKind::Typedef, "C").with_type("B"),
    ]);
    assert!(diagnostics.is_empty());
    let resolution = &model.get(find(&model, "C")).as_typedef().unwrap().resolution;
    assert_eq!(
        resolution,
        &TypedefResolution::Resolved {
            ty: TypeRef::primitive("int"),
            steps: 2,
        }
    );
}

#[test]
fn typedef_cycle_is_an_error_not_a_hang() {
    let (model, diagnostics) = build(vec![
        AstNode::new(NodeKind::Typedef, "Loop1").with_type("Loop2"),
        AstNode::new(NodeKind::Typedef, "Loop2").with_type("Loop1"),
        AstNode::new(NodeKind::Typedef, "Self").with_type("Self"),
        AstNode::new(NodeKind::Typedef, "Fine").with_type("double"),
    ]);
    assert_eq!(diagnostics.count(Severity::Error), 3);
    assert!(
        diagnostics
            .iter()
            .all(|d| d.code == DiagnosticCode::TypedefCycle)
    );
    let loop1 = &model.get(find(&model, "Loop1")).as_typedef().unwrap().resolution;
    assert_eq!(
        loop1,
        &TypedefResolution::Cycle {
            chain: vec!["Loop1".into(), "Loop2".into(), "Loop1".into()],
        }
    );
    assert!(matches!(
        model.get(find(&model, "Fine")).as_typedef().unwrap().resolution,
        TypedefResolution::Resolved { .. }
    ));
}

#[test]
fn struct_tag_typedef_is_not_a_cycle() {
    let (model, diagnostics) = build(vec![
        AstNode::new(NodeKind::Struct, "Node"),
        AstNode::new(NodeKind::Typedef, "Node").with_type("struct Node"),
    ]);
    assert!(diagnostics.is_empty());
    assert_eq!(model.lookup("Node").len(), 1, "the typedef adds nothing");
    assert!(model.get(find(&model, "Node")).as_class().is_some());
}

#[test]
fn self_named_typedef_declares_its_tag_ahead_of_the_definition() {
    let (model, _) = build(vec![
        AstNode::new(NodeKind::Typedef, "Handle").with_type("struct Handle"),
        class("Middle"),
        AstNode::new(NodeKind::Struct, "Handle")
            .with_child(AstNode::new(NodeKind::Field, "fd").with_type("int")),
    ]);
    assert_eq!(child_names(&model, DeclId::ROOT), vec!["Handle", "Middle"]);
    let handle = model.get(find(&model, "Handle"));
    assert!(!handle.forward_only);
    assert!(handle.as_class().is_some_and(|c| c.has_body));
    find(&model, "Handle::fd");
}

#[test]
fn later_declarators_reuse_the_aliased_anonymous_struct() {
    let (model, diagnostics) = build(vec![
        AstNode::new(NodeKind::Typedef, "S").with_child(
            AstNode::new(NodeKind::Struct, "")
                .with_child(AstNode::new(NodeKind::Field, "a").with_type("int")),
        ),
        AstNode::new(NodeKind::Typedef, "PS").with_type("struct (anonymous) *"),
        AstNode::new(NodeKind::Typedef, "Alias").with_type("struct (anonymous)"),
    ]);
    assert!(diagnostics.is_empty());
    assert_eq!(model.get(find(&model, "S")).name_origin, NameOrigin::TypedefAlias);
    let ps = model.get(find(&model, "PS")).as_typedef().unwrap();
    assert_eq!(ps.target, TypeRef::parse("S *"));
    let alias = model.get(find(&model, "Alias")).as_typedef().unwrap();
    assert_eq!(alias.target, TypeRef::named("S"));
}

// ════════════════════════════════════════════════════════════════
// Inheritance
// ════════════════════════════════════════════════════════════════

#[test]
fn overrides_and_abstract_are_computed() {
    let (model, _) = build(vec![
        class("Shape").with_children([
            public(),
            method("area", "double").with_flag("const").with_flag("pure"),
            method("name", "QString").with_flag("const").with_flag("virtual"),
        ]),
        class("Square").with_children([
            AstNode::new(NodeKind::BaseSpecifier, "")
                .with_type("Shape")
                .with_attr("access", "public"),
            public(),
            method("area", "double").with_flag("const"),
            method("name", "QString"),
            method("side", "double").with_flag("const"),
        ]),
    ]);
    let shape = model.get(find(&model, "Shape")).as_class().unwrap();
    assert!(shape.is_abstract);
    let square = model.get(find(&model, "Square")).as_class().unwrap();
    assert!(!square.is_abstract);

    let overrides = |n: &str| {
        model
            .get(find(&model, n))
            .as_function()
            .unwrap()
            .overrides_base
    };
    assert!(overrides("Square::area"));
    assert!(!overrides("Square::name"), "constness differs");
    assert!(!overrides("Square::side"));
}

#[test]
fn cyclic_bases_do_not_loop() {
    let (model, _) = build(vec![
        class("A").with_children([
            AstNode::new(NodeKind::BaseSpecifier, "").with_type("B"),
            method("f", "void"),
        ]),
        class("B").with_children([
            AstNode::new(NodeKind::BaseSpecifier, "").with_type("A"),
            method("g", "void"),
        ]),
    ]);
    assert!(!model.get(find(&model, "A::f")).as_function().unwrap().overrides_base);
}

// ════════════════════════════════════════════════════════════════
// Default values
// ════════════════════════════════════════════════════════════════

fn default_of(model: &Model, function: &str, index: usize) -> String {
    let decl = model.get(find(model, function));
    let f = decl.as_function().unwrap();
    let p = &f.params[index];
    sip_default_value(
        model,
        decl.parent.unwrap_or(DeclId::ROOT),
        &p.ty,
        p.default.as_ref().unwrap(),
    )
}

#[test]
fn default_referencing_anonymous_enum_uses_synthetic_name() {
    let (model, _) = build(vec![class("MyObject").with_children([
        public(),
        anon_enum(&["Val1", "Val2"]),
        method("pick", "void").with_child(param("v", "int").with_attr("default", "Val2")),
    ])]);
    assert_eq!(default_of(&model, "MyObject::pick", 0), "MyObject::__enum0::Val2");
}

#[test]
fn default_referencing_named_enum_is_scope_qualified() {
    let (model, _) = build(vec![AstNode::new(NodeKind::Namespace, "Outer").with_child(
        class("Widget").with_children([
            public(),
            AstNode::new(NodeKind::Enum, "Mode").with_children([
                AstNode::new(NodeKind::EnumConstant, "Fast"),
                AstNode::new(NodeKind::EnumConstant, "Slow"),
            ]),
            AstNode::new(NodeKind::Enum, "Scoped")
                .with_flag("scoped")
                .with_child(AstNode::new(NodeKind::EnumConstant, "On")),
            method("set", "void").with_children([
                param("m", "Mode").with_attr("default", "Fast|Slow"),
                param("s", "Scoped").with_attr("default", "Scoped::On"),
            ]),
        ]),
    )]);
    assert_eq!(
        default_of(&model, "Outer::Widget::set", 0),
        "Outer::Widget::Fast | Outer::Widget::Slow"
    );
    assert_eq!(
        default_of(&model, "Outer::Widget::set", 1),
        "Outer::Widget::Scoped::On"
    );
}

#[test]
fn null_and_empty_defaults_are_respelled() {
    let (model, _) = build(vec![
        AstNode::new(NodeKind::Enum, "Flag")
            .with_child(AstNode::new(NodeKind::EnumConstant, "None")),
        AstNode::new(NodeKind::Function, "f")
            .with_type("void")
            .with_children([
                param("a", "QObject *").with_attr("default", "Q_NULLPTR"),
                param("b", "QObject *").with_attr("default", "{}"),
                param("c", "Flag").with_attr("default", "{}"),
                param("d", "const QString &").with_attr("default", "{}"),
                param("e", "bool").with_attr("default", "{}"),
                param("g", "int").with_attr("default", "0"),
                param("h", "QFlags<Flag>").with_attr("default", "{}"),
                param("i", "const QList<int> &").with_attr("default", "QList<int>()"),
                param("j", "QSize").with_attr("default", "QSize{}"),
            ]),
    ]);
    let spelled: Vec<String> = (0..9).map(|i| default_of(&model, "f", i)).collect();
    assert_eq!(
        spelled,
        vec![
            "nullptr",
            "nullptr",
            "0",
            "QString()",
            "false",
            "0",
            "0",
            "QList<int>()",
            "QSize()",
        ]
    );
}

#[test]
fn default_expression_keeps_parentheses() {
    let expr = Expr::parse("( 2*(3+4) )");
    let (model, _) = build(vec![]);
    assert_eq!(
        sip_default_value(&model, DeclId::ROOT, &TypeRef::primitive("int"), &expr),
        "(2 * (3 + 4))"
    );
}
