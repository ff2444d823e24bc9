use std::path::PathBuf;

use pretty_assertions::assert_eq;
use sipgen_core::Diagnostics;
use sipgen_model::{AstNode, DeclKind, NodeKind, build_model};
use sipgen_parser::{ParserError, parse_file, parse_header};

// ════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════

fn fixture() -> AstNode {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/widget.h");
    parse_file(&path).expect("fixture should parse")
}

fn collect<'a>(node: &'a AstNode, out: &mut Vec<&'a AstNode>) {
    out.push(node);
    for child in &node.children {
        collect(child, out);
    }
}

fn find<'a>(root: &'a AstNode, kind: NodeKind, name: &str) -> &'a AstNode {
    let mut all = Vec::new();
    collect(root, &mut all);
    let found = all.iter().find(|n| n.kind == kind && n.name == name);
    assert!(
        found.is_some(),
        "no {kind} named '{name}'. Available: {:?}",
        all.iter()
            .map(|n| format!("{} {}", n.kind, n.name))
            .collect::<Vec<_>>()
    );
    found.unwrap()
}

fn members(node: &AstNode) -> Vec<(NodeKind, String)> {
    node.children
        .iter()
        .filter(|c| !matches!(c.kind, NodeKind::BaseSpecifier | NodeKind::Attribute))
        .map(|c| (c.kind, c.name.clone()))
        .collect()
}

fn params(node: &AstNode) -> Vec<(String, String)> {
    node.children
        .iter()
        .filter(|c| c.kind == NodeKind::Parameter)
        .map(|c| (c.name.clone(), c.type_spelling.clone().unwrap_or_default()))
        .collect()
}

// ════════════════════════════════════════════════════════════════
// Fixture header
// ════════════════════════════════════════════════════════════════

#[test]
fn top_level_scopes() {
    let unit = fixture();
    assert_eq!(unit.kind, NodeKind::TranslationUnit);
    let kinds: Vec<_> = unit.children.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Namespace, NodeKind::LinkageSpec]);
    assert_eq!(unit.children[0].name, "ui");
}

#[test]
fn class_members_keep_source_order() {
    let unit = fixture();
    let widget = find(&unit, NodeKind::Class, "Widget");
    let s = String::from;
    assert_eq!(
        members(widget),
        vec![
            (NodeKind::Unexposed, s("")),
            (NodeKind::AccessSpecifier, s("public")),
            (NodeKind::Enum, s("Option")),
            (NodeKind::Unexposed, s("")),
            (NodeKind::Constructor, s("Widget")),
            (NodeKind::Destructor, s("~Widget")),
            (NodeKind::Method, s("title")),
            (NodeKind::Method, s("setTitle")),
            (NodeKind::Method, s("paint")),
            (NodeKind::Method, s("create")),
            (NodeKind::AccessSpecifier, s("public")),
            (NodeKind::Method, s("titleChanged")),
            (NodeKind::AccessSpecifier, s("protected")),
            (NodeKind::Field, s("m_margin")),
            (NodeKind::AccessSpecifier, s("private")),
            (NodeKind::Constructor, s("Widget")),
            (NodeKind::Field, s("m_scale")),
        ]
    );
}

#[test]
fn qt_statement_macros_become_unexposed_text() {
    let unit = fixture();
    let widget = find(&unit, NodeKind::Class, "Widget");
    let texts: Vec<_> = widget
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Unexposed)
        .filter_map(|c| c.attr("text"))
        .collect();
    assert_eq!(texts, vec!["Q_OBJECT", "Q_DECLARE_FLAGS(Options, Option)"]);
}

#[test]
fn export_macro_and_base_class() {
    let unit = fixture();
    let widget = find(&unit, NodeKind::Class, "Widget");

    let attributes: Vec<_> = widget
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Attribute)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(attributes, vec!["WIDGETS_EXPORT"]);

    let base = find(widget, NodeKind::BaseSpecifier, "");
    assert_eq!(base.type_spelling.as_deref(), Some("QObject"));
    assert_eq!(base.attr("access"), Some("public"));
    assert!(!base.flag("virtual"));
    assert!(!widget.flag("forward"));
}

#[test]
fn method_signatures_and_qualifiers() {
    let unit = fixture();

    let title = find(&unit, NodeKind::Method, "title");
    assert_eq!(title.type_spelling.as_deref(), Some("const QString &"));
    assert!(title.flag("const"));
    assert_eq!(title.attr("doc"), Some("The widget's title."));

    let set_title = find(&unit, NodeKind::Method, "setTitle");
    assert_eq!(set_title.type_spelling.as_deref(), Some("void"));
    assert_eq!(
        params(set_title),
        vec![("title".to_string(), "const QString &".to_string())]
    );

    let paint = find(&unit, NodeKind::Method, "paint");
    assert!(paint.flag("virtual"));
    assert!(paint.flag("pure"));
    assert_eq!(
        params(paint),
        vec![
            ("x".to_string(), "int".to_string()),
            ("y".to_string(), "int".to_string()),
        ]
    );

    let create = find(&unit, NodeKind::Method, "create");
    assert!(create.flag("static"));
    assert_eq!(create.type_spelling.as_deref(), Some("Widget *"));
}

#[test]
fn constructors_and_destructor() {
    let unit = fixture();
    let widget = find(&unit, NodeKind::Class, "Widget");
    let ctors: Vec<_> = widget
        .children
        .iter()
        .filter(|c| c.kind == NodeKind::Constructor)
        .collect();
    assert_eq!(ctors.len(), 2);

    assert!(ctors[0].flag("explicit"));
    assert_eq!(ctors[0].type_spelling, None);
    let parent = &ctors[0].children[0];
    assert_eq!(parent.name, "parent");
    assert_eq!(parent.type_spelling.as_deref(), Some("QObject *"));
    assert_eq!(parent.attr("default"), Some("nullptr"));

    assert!(ctors[1].flag("deleted"));
    assert_eq!(
        params(ctors[1]),
        vec![(String::new(), "const Widget &".to_string())]
    );

    let dtor = find(widget, NodeKind::Destructor, "~Widget");
    assert!(dtor.flag("override"));
}

#[test]
fn scoped_enum_with_values_and_doc() {
    let unit = fixture();
    let alignment = find(&unit, NodeKind::Enum, "Alignment");
    assert!(alignment.flag("scoped"));
    assert_eq!(alignment.type_spelling.as_deref(), Some("int"));
    assert_eq!(
        alignment.attr("doc"),
        Some("Alignment of content inside a widget.")
    );

    let constants: Vec<_> = alignment
        .children
        .iter()
        .map(|c| (c.name.as_str(), c.attr("value")))
        .collect();
    assert_eq!(
        constants,
        vec![("Left", Some("0")), ("Center", None), ("Right", Some("4"))]
    );

    let option = find(&unit, NodeKind::Enum, "Option");
    assert!(!option.flag("scoped"));
    assert_eq!(option.children.len(), 2);
}

#[test]
fn typedefs_and_aliases() {
    let unit = fixture();

    let point = find(&unit, NodeKind::Typedef, "Point");
    assert_eq!(point.type_spelling, None);
    let tag = &point.children[0];
    assert_eq!(tag.kind, NodeKind::Struct);
    assert_eq!(tag.name, "");
    assert_eq!(
        members(tag),
        vec![
            (NodeKind::Field, "x".to_string()),
            (NodeKind::Field, "y".to_string()),
        ]
    );

    let callback = find(&unit, NodeKind::Typedef, "Callback");
    assert_eq!(
        callback.type_spelling.as_deref(),
        Some("void (*)(int, void *)")
    );

    let list = find(&unit, NodeKind::TypeAlias, "WidgetList");
    assert_eq!(list.type_spelling.as_deref(), Some("QList<Widget *>"));
}

#[test]
fn extern_c_block_functions() {
    let unit = fixture();
    let linkage = &unit.children[1];
    let version = find(linkage, NodeKind::Function, "widgets_version");
    assert_eq!(version.type_spelling.as_deref(), Some("int"));
    assert!(params(version).is_empty());
}

#[test]
fn source_ranges_are_one_based_lines() {
    let unit = fixture();
    let alignment = find(&unit, NodeKind::Enum, "Alignment");
    assert_eq!(alignment.range.start_line, 11);
    assert_eq!(alignment.range.start_column, 1);
}

#[test]
fn fixture_builds_a_model() {
    let unit = fixture();
    let mut diagnostics = Diagnostics::new();
    let model = build_model(&unit, &mut diagnostics).expect("model should build");

    let widget = model.get(model.lookup("ui::Widget")[0]);
    let DeclKind::Class(class) = &widget.kind else {
        panic!("ui::Widget should be a class");
    };
    assert!(class.is_abstract);
    assert_eq!(class.bases.len(), 1);

    assert!(!model.lookup("ui::Widget::Options").is_empty());
    assert!(!model.lookup("ui::Point").is_empty());
    assert!(!model.lookup("widgets_version").is_empty());
}

// ════════════════════════════════════════════════════════════════
// Snippets
// ════════════════════════════════════════════════════════════════

#[test]
fn nested_namespace_specifier_expands() {
    let unit = parse_header("namespace a::b { void f(); }").unwrap();
    let outer = &unit.children[0];
    assert_eq!((outer.kind, outer.name.as_str()), (NodeKind::Namespace, "a"));
    let inner = &outer.children[0];
    assert_eq!((inner.kind, inner.name.as_str()), (NodeKind::Namespace, "b"));
    assert_eq!(members(inner), vec![(NodeKind::Function, "f".to_string())]);
}

#[test]
fn conditional_follows_first_branch() {
    let source = "#ifdef FEATURE\nvoid enabled();\n#else\nvoid disabled();\n#endif\n";
    let unit = parse_header(source).unwrap();
    assert_eq!(members(&unit), vec![(NodeKind::Function, "enabled".to_string())]);
}

#[test]
fn class_template_parameters() {
    let source = "template <typename T, int N>\nclass Array {\npublic:\n    T at(int i) const;\n};\n";
    let unit = parse_header(source).unwrap();
    let array = find(&unit, NodeKind::Class, "Array");

    let ty = find(array, NodeKind::TemplateTypeParameter, "T");
    assert_eq!(ty.type_spelling, None);
    let value = find(array, NodeKind::TemplateNonTypeParameter, "N");
    assert_eq!(value.type_spelling.as_deref(), Some("int"));

    let at = find(array, NodeKind::Method, "at");
    assert_eq!(at.type_spelling.as_deref(), Some("T"));
    assert!(at.flag("const"));
}

#[test]
fn conversion_operator() {
    let source = "class Handle {\npublic:\n    operator bool() const;\n};\n";
    let unit = parse_header(source).unwrap();
    let conversion = find(&unit, NodeKind::ConversionFunction, "operator bool");
    assert_eq!(conversion.type_spelling.as_deref(), Some("bool"));
    assert!(conversion.flag("const"));
}

#[test]
fn forward_declarations_are_flagged() {
    let unit = parse_header("class Widget;\nenum class Mode : int;\n").unwrap();
    assert!(find(&unit, NodeKind::Class, "Widget").flag("forward"));
    assert!(find(&unit, NodeKind::Enum, "Mode").flag("forward"));
}

#[test]
fn out_of_line_definitions_are_skipped() {
    let unit = parse_header("void Widget::paint() {}\nint Widget::count = 0;\n").unwrap();
    assert!(unit.children.is_empty());
}

#[test]
fn deprecated_macro_attaches_to_function() {
    let unit = parse_header("Q_DECL_DEPRECATED_X(\"use other\") void old();\n").unwrap();
    let old = find(&unit, NodeKind::Function, "old");
    let attribute = find(old, NodeKind::Attribute, "Q_DECL_DEPRECATED_X(\"use other\")");
    assert_eq!(attribute.kind, NodeKind::Attribute);
}

#[test]
fn unrecognizable_source_fails() {
    let err = parse_header("@@@ $$$").unwrap_err();
    assert!(matches!(err, ParserError::ParseFailed { .. }));
}
