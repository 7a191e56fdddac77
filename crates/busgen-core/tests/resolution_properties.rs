//! Resolution and classification properties over hand-built packages

use busgen_core::binding::BindingResolver;
use busgen_core::syntax::{
    Block, Decl, Expr, FieldDecl, FuncDecl, Literal, Param, SourceUnit, Stmt, TypeExpr, TypeSpec,
    ValueSpec,
};
use busgen_core::{exportable_types, is_exportable, ExportRegistry, PackageScope, INTERFACE_METHOD};
use proptest::prelude::*;

fn export_stmt(path: Expr, object: Expr) -> Stmt {
    Stmt::Expr(Expr::call(
        Expr::selector(Expr::ident("service"), "Export"),
        vec![path, object],
    ))
}

fn func(name: &str, stmts: Vec<Stmt>) -> Decl {
    Decl::Func(FuncDecl {
        name: name.into(),
        receiver: None,
        params: Vec::new(),
        results: Vec::new(),
        body: Some(Block { stmts }),
    })
}

fn identification(recv: &str, iface: &str) -> Decl {
    Decl::Func(FuncDecl {
        name: INTERFACE_METHOD.into(),
        receiver: Some(Param::new(Some("v"), TypeExpr::pointer_to(TypeExpr::named(recv)))),
        params: Vec::new(),
        results: vec![Param::new(None, TypeExpr::named("string"))],
        body: Some(Block {
            stmts: vec![Stmt::Return(vec![Expr::Lit(Literal::string(iface))])],
        }),
    })
}

fn exported_struct(name: &str) -> Decl {
    Decl::Type(TypeSpec {
        name: name.into(),
        alias: false,
        ty: TypeExpr::Struct(vec![FieldDecl::new("Name", TypeExpr::named("string"))]),
    })
}

fn unit(path: &str, decls: Vec<Decl>) -> SourceUnit {
    let mut unit = SourceUnit::new(path, "demo");
    unit.decls = decls;
    unit
}

fn object_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[A-Za-z][A-Za-z0-9_]{0,8}", 1..5)
        .prop_map(|parts| format!("/{}", parts.join("/")))
}

fn basic_type_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("bool"),
        Just("string"),
        Just("int"),
        Just("uint32"),
        Just("float64"),
        Just("byte"),
    ]
}

proptest! {
    #[test]
    fn literal_path_resolves_verbatim(path in object_path()) {
        let units = vec![unit("a.go", vec![
            exported_struct("Foo"),
            identification("Foo", "org.x.Foo"),
            func("run", vec![export_stmt(
                Expr::Lit(Literal::string(&path)),
                Expr::address_of(Expr::Composite { ty: TypeExpr::named("Foo") }),
            )]),
        ])];
        let scope = PackageScope::new(&units);
        let registry = ExportRegistry::scan_units(&units);
        let bindings = BindingResolver::new(&scope, &registry).resolve();

        prop_assert_eq!(bindings.len(), 1);
        prop_assert_eq!(bindings[0].export_path.as_deref(), Some(path.as_str()));
        prop_assert!(bindings[0].is_resolved());
    }

    #[test]
    fn constant_path_resolution_is_idempotent(path in object_path(), forward in any::<bool>()) {
        let constant = Decl::Const(ValueSpec {
            names: vec!["FooPath".into()],
            ty: None,
            values: vec![Expr::Lit(Literal::string(&path))],
        });
        let exporter = unit("a.go", vec![
            exported_struct("Foo"),
            identification("Foo", "org.x.Foo"),
            func("run", vec![export_stmt(
                Expr::ident("FooPath"),
                Expr::address_of(Expr::Composite { ty: TypeExpr::named("Foo") }),
            )]),
        ]);
        let constants = unit("b.go", vec![constant]);
        let units = if forward { vec![exporter, constants] } else { vec![constants, exporter] };

        let scope = PackageScope::new(&units);
        let registry = ExportRegistry::scan_units(&units);
        let resolver = BindingResolver::new(&scope, &registry);
        let mut bindings = resolver.resolve();
        let snapshot = bindings.clone();

        prop_assert_eq!(bindings[0].export_path.as_deref(), Some(path.as_str()));
        prop_assert_eq!(bindings[0].path_constant_name.as_deref(), Some("FooPath"));
        prop_assert!(!resolver.refresh(&mut bindings));
        prop_assert_eq!(bindings, snapshot);
    }

    #[test]
    fn basic_types_are_never_exportable(name in "[A-Z][a-z]{1,6}", basic in basic_type_name()) {
        let units = vec![unit("a.go", vec![
            Decl::Type(TypeSpec { name: name.clone(), alias: false, ty: TypeExpr::named(basic) }),
            identification(&name, "org.x.Foo"),
        ])];
        let scope = PackageScope::new(&units);
        let spec = scope.type_spec(&name).expect("declared");

        prop_assert!(!is_exportable(&scope, spec));
        prop_assert_eq!(is_exportable(&scope, spec), is_exportable(&scope, spec));
    }

    #[test]
    fn exportability_is_stable(with_method in any::<bool>()) {
        let mut decls = vec![exported_struct("Foo")];
        if with_method {
            decls.push(identification("Foo", "org.x.Foo"));
        }
        let units = vec![unit("a.go", decls)];
        let scope = PackageScope::new(&units);

        let first: Vec<_> = exportable_types(&scope).iter().map(|s| s.name.clone()).collect();
        let second: Vec<_> = exportable_types(&scope).iter().map(|s| s.name.clone()).collect();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), usize::from(with_method));
    }
}

#[test]
fn test_bindings_serialize_to_json() -> Result<(), Box<dyn std::error::Error>> {
    let units = vec![unit(
        "a.go",
        vec![
            exported_struct("Foo"),
            identification("Foo", "org.x.Foo"),
            func(
                "run",
                vec![export_stmt(
                    Expr::Lit(Literal::string("/org/x/Foo")),
                    Expr::address_of(Expr::Composite {
                        ty: TypeExpr::named("Foo"),
                    }),
                )],
            ),
        ],
    )];
    let scope = PackageScope::new(&units);
    let registry = ExportRegistry::scan_units(&units);
    let bindings = BindingResolver::new(&scope, &registry).resolve();

    let json = serde_json::to_value(&bindings)?;
    assert_eq!(json[0]["object_type_name"], "Foo");
    assert_eq!(json[0]["export_path"], "/org/x/Foo");
    assert_eq!(json[0]["interface_name"], "org.x.Foo");
    Ok(())
}
