//! Binding resolution
//!
//! Every object expression of every export site becomes one [`Binding`]. Three rules fill
//! its fields: the export path, the object identity and the interface name. Each rule only
//! writes fields that are still empty, so the rules are applied in rounds until a round
//! changes nothing. Raw expressions may point at declarations in any file of the package,
//! which is why one round is not always enough.

use crate::classify::INTERFACE_METHOD;
use crate::index::{Declaration, PackageScope};
use crate::scanner::{ExportRegistry, ExportSite, LocalDecl, LocalScope, RawExpr};
use crate::syntax::{Expr, FuncDecl, Stmt, TypeExpr};
use serde::Serialize;
use tracing::{debug, trace};

/// Upper bound on resolution rounds
pub const MAX_RESOLUTION_PASSES: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Binding {
    /// Index of the originating site in the registry
    pub site: usize,
    /// Position of the object among the site's object expressions
    pub object: usize,
    pub object_type_name: Option<String>,
    pub export_path: Option<String>,
    /// Identifier used for the path when it is not a literal
    pub path_constant_name: Option<String>,
    pub interface_name: Option<String>,
    pub source_struct_name: Option<String>,
    pub source_field_name: Option<String>,
}

impl Binding {
    pub fn new(site: usize, object: usize) -> Self {
        Self {
            site,
            object,
            ..Default::default()
        }
    }

    /// Both the object type and the export path are known
    pub fn is_resolved(&self) -> bool {
        self.object_type_name.is_some() && self.export_path.is_some()
    }
}

/// Write `value` into an empty slot. Returns whether the slot changed.
fn fill(slot: &mut Option<String>, value: Option<String>) -> bool {
    match (slot.as_ref(), value) {
        (None, Some(value)) if !value.is_empty() => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

pub struct BindingResolver<'s, 'a> {
    scope: &'s PackageScope<'a>,
    registry: &'s ExportRegistry,
}

impl<'s, 'a> BindingResolver<'s, 'a> {
    pub fn new(scope: &'s PackageScope<'a>, registry: &'s ExportRegistry) -> Self {
        Self { scope, registry }
    }

    /// Empty bindings, one per object expression
    pub fn seed(&self) -> Vec<Binding> {
        self.registry
            .sites
            .iter()
            .enumerate()
            .flat_map(|(site, export)| (0..export.objects.len()).map(move |obj| Binding::new(site, obj)))
            .collect()
    }

    /// Seed and resolve until nothing changes
    pub fn resolve(&self) -> Vec<Binding> {
        let mut bindings = self.seed();
        self.resolve_all(&mut bindings);
        bindings
    }

    /// Apply all rules in rounds until a fixed point or the round limit
    pub fn resolve_all(&self, bindings: &mut [Binding]) -> usize {
        let mut rounds = 0;
        while rounds < MAX_RESOLUTION_PASSES {
            rounds += 1;
            if !self.refresh(bindings) {
                break;
            }
        }
        debug!(
            "resolved {}/{} bindings in {} round(s)",
            bindings.iter().filter(|b| b.is_resolved()).count(),
            bindings.len(),
            rounds
        );
        rounds
    }

    /// One round of every rule over every binding. Returns whether anything changed.
    pub fn refresh(&self, bindings: &mut [Binding]) -> bool {
        let mut changed = false;
        for binding in bindings.iter_mut() {
            changed |= self.resolve_object(binding);
            changed |= self.resolve_path(binding);
            changed |= self.resolve_interface(binding);
        }
        changed
    }

    fn site(&self, binding: &Binding) -> Option<&'s ExportSite> {
        self.registry.sites.get(binding.site)
    }

    pub fn resolve_path(&self, binding: &mut Binding) -> bool {
        let Some(site) = self.site(binding) else {
            return false;
        };
        match &site.path {
            RawExpr::Literal(value) => fill(&mut binding.export_path, Some(value.clone())),
            RawExpr::Ident(name) => {
                let mut changed = fill(&mut binding.path_constant_name, Some(name.clone()));
                if binding.export_path.is_none() {
                    let value = self.string_value(name, &site.locals);
                    trace!("path identifier {} -> {:?}", name, value);
                    changed |= fill(&mut binding.export_path, value);
                }
                changed
            }
            other => {
                trace!("path expression {:?} left unresolved", other);
                false
            }
        }
    }

    pub fn resolve_object(&self, binding: &mut Binding) -> bool {
        let Some(site) = self.site(binding) else {
            return false;
        };
        let Some(raw) = site.objects.get(binding.object) else {
            return false;
        };

        let target = match raw {
            RawExpr::AddressOf(inner) => inner.as_ref(),
            other => other,
        };
        let mut changed = self.object_from(target, &site.locals, binding);

        // The selected field's declared type names the exported object
        if binding.object_type_name.is_none() {
            if let (Some(owner), Some(field)) = (&binding.source_struct_name, &binding.source_field_name) {
                let ty = self.field_type_name(owner, field);
                trace!("field {}.{} -> {:?}", owner, field, ty);
                changed |= fill(&mut binding.object_type_name, ty);
            }
        }
        changed
    }

    fn object_from(&self, raw: &RawExpr, locals: &LocalScope, binding: &mut Binding) -> bool {
        match raw {
            RawExpr::Composite { type_name } => {
                fill(&mut binding.object_type_name, Some(type_name.clone()))
            }
            RawExpr::CallResult { callee } => {
                fill(&mut binding.object_type_name, self.call_result_type(callee, 0))
            }
            RawExpr::Ident(name) => {
                let ty = match locals.get(name) {
                    Some(LocalDecl::Assigned { value, slot }) => self.value_type_name(value, *slot),
                    Some(LocalDecl::Value {
                        value: Some(value), ..
                    }) => self.value_type_name(value, 0),
                    _ => None,
                };
                fill(&mut binding.object_type_name, ty)
            }
            RawExpr::Selector { base, member } => {
                // Only a receiver or parameter declared as a pointer to a named struct
                let owner = match locals.get(base) {
                    Some(LocalDecl::Param(ty)) => ty.pointee_name().map(str::to_string),
                    _ => None,
                };
                if owner.is_none() {
                    trace!("selector base {} is not a pointer-typed parameter", base);
                    return false;
                }
                let mut changed = fill(&mut binding.source_struct_name, owner);
                changed |= fill(&mut binding.source_field_name, Some(member.clone()));
                changed
            }
            RawExpr::AddressOf(_) | RawExpr::Literal(_) | RawExpr::Unrecognized(_) => false,
        }
    }

    /// Type name produced by the expression a local was bound to
    fn value_type_name(&self, value: &Expr, slot: usize) -> Option<String> {
        match value.unparen() {
            Expr::Call { callee, .. } => match callee.unparen() {
                Expr::Ident(name) => self.call_result_type(name, slot),
                _ => None,
            },
            Expr::Composite { ty } => ty.base_name().map(str::to_string),
            Expr::Unary { operand, .. } => match operand.unparen() {
                Expr::Composite { ty } => ty.base_name().map(str::to_string),
                _ => None,
            },
            _ => None,
        }
    }

    /// Declared result type of a package-level function
    fn call_result_type(&self, callee: &str, slot: usize) -> Option<String> {
        let func = self.scope.func(callee)?;
        let result = func.results.get(slot).or_else(|| func.results.first())?;
        result.ty.base_name().map(str::to_string)
    }

    fn field_type_name(&self, owner: &str, field: &str) -> Option<String> {
        let spec = self.scope.type_spec(owner)?;
        let TypeExpr::Struct(fields) = &spec.ty else {
            return None;
        };
        fields
            .iter()
            .find(|decl| decl.field_names().iter().any(|name| name == field))
            .and_then(|decl| decl.ty.base_name())
            .map(str::to_string)
    }

    pub fn resolve_interface(&self, binding: &mut Binding) -> bool {
        if binding.interface_name.is_some() {
            return false;
        }
        let candidates = [&binding.object_type_name, &binding.source_struct_name];
        let value = candidates
            .into_iter()
            .flatten()
            .find_map(|type_name| self.interface_name_of(type_name));
        fill(&mut binding.interface_name, value)
    }

    /// Value returned by the identification method declared on `type_name`
    pub fn interface_name_of(&self, type_name: &str) -> Option<String> {
        self.scope
            .methods_of(type_name)
            .filter(|func| func.name == INTERFACE_METHOD)
            .find_map(|func| self.returned_string(func))
    }

    fn returned_string(&self, func: &FuncDecl) -> Option<String> {
        let body = func.body.as_ref()?;
        body.stmts.iter().enumerate().find_map(|(position, stmt)| {
            let Stmt::Return(results) = stmt else {
                return None;
            };
            match results.first()?.unparen() {
                Expr::Lit(lit) => lit.string_value(),
                Expr::Ident(name) => {
                    let locals = LocalScope::collect(func, position);
                    self.string_value(name, &locals)
                }
                _ => None,
            }
        })
    }

    /// Literal value of an identifier, looking at locals before package declarations
    fn string_value(&self, name: &str, locals: &LocalScope) -> Option<String> {
        if let Some(local) = locals.string_value(name) {
            return local;
        }
        match self.scope.lookup(name)? {
            decl @ (Declaration::Const { .. } | Declaration::Var { .. }) => decl.literal_value(),
            _ => None,
        }
    }
}

/// Resolve every binding of a registry against one package
pub fn resolve(registry: &ExportRegistry, scope: &PackageScope<'_>) -> Vec<Binding> {
    BindingResolver::new(scope, registry).resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{
        Block, Decl, FieldDecl, Literal, Param, SourceUnit, TypeSpec, ValueSpec,
    };
    use pretty_assertions::assert_eq;

    fn string_const(name: &str, value: &str) -> Decl {
        Decl::Const(ValueSpec {
            names: vec![name.into()],
            ty: None,
            values: vec![Expr::Lit(Literal::string(value))],
        })
    }

    fn struct_type(name: &str, fields: Vec<FieldDecl>) -> Decl {
        Decl::Type(TypeSpec {
            name: name.into(),
            alias: false,
            ty: TypeExpr::Struct(fields),
        })
    }

    fn method(recv: &str, name: &str, stmts: Vec<Stmt>) -> Decl {
        Decl::Func(FuncDecl {
            name: name.into(),
            receiver: Some(Param::new(Some("v"), TypeExpr::pointer_to(TypeExpr::named(recv)))),
            params: Vec::new(),
            results: vec![Param::new(None, TypeExpr::named("string"))],
            body: Some(Block { stmts }),
        })
    }

    fn export_in(recv: Option<(&str, &str)>, stmts: Vec<Stmt>) -> Decl {
        Decl::Func(FuncDecl {
            name: "export".into(),
            receiver: recv.map(|(name, ty)| {
                Param::new(Some(name), TypeExpr::pointer_to(TypeExpr::named(ty)))
            }),
            params: Vec::new(),
            results: Vec::new(),
            body: Some(Block { stmts }),
        })
    }

    fn export_call(args: Vec<Expr>) -> Stmt {
        Stmt::Expr(Expr::call(Expr::selector(Expr::ident("svc"), "Export"), args))
    }

    fn resolve_units(units: &[SourceUnit]) -> Vec<Binding> {
        let scope = PackageScope::new(units);
        let registry = ExportRegistry::scan_units(units);
        resolve(&registry, &scope)
    }

    fn unit(path: &str, decls: Vec<Decl>) -> SourceUnit {
        let mut unit = SourceUnit::new(path, "demo");
        unit.decls = decls;
        unit
    }

    #[test]
    fn test_literal_path_is_taken_verbatim() {
        let units = vec![unit(
            "a.go",
            vec![export_in(
                None,
                vec![export_call(vec![
                    Expr::Lit(Literal::string("/org/x/Foo")),
                    Expr::address_of(Expr::Composite {
                        ty: TypeExpr::named("FooImpl"),
                    }),
                ])],
            )],
        )];
        let bindings = resolve_units(&units);

        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].export_path.as_deref(), Some("/org/x/Foo"));
        assert_eq!(bindings[0].object_type_name.as_deref(), Some("FooImpl"));
        assert_eq!(bindings[0].path_constant_name, None);
        assert!(bindings[0].is_resolved());
    }

    #[test]
    fn test_path_constant_declared_in_another_file() {
        let units = vec![
            unit(
                "a.go",
                vec![export_in(
                    None,
                    vec![export_call(vec![
                        Expr::ident("FooPath"),
                        Expr::Composite {
                            ty: TypeExpr::named("Foo"),
                        },
                    ])],
                )],
            ),
            unit("b.go", vec![string_const("FooPath", "/org/x/Bar")]),
        ];
        let bindings = resolve_units(&units);

        assert_eq!(bindings[0].export_path.as_deref(), Some("/org/x/Bar"));
        assert_eq!(bindings[0].path_constant_name.as_deref(), Some("FooPath"));
    }

    #[test]
    fn test_wrapper_field_selector() {
        let units = vec![unit(
            "a.go",
            vec![
                struct_type(
                    "FooWrapper",
                    vec![FieldDecl::new("impl", TypeExpr::pointer_to(TypeExpr::named("fooImpl")))],
                ),
                struct_type("fooImpl", Vec::new()),
                export_in(
                    Some(("wrapper", "FooWrapper")),
                    vec![export_call(vec![
                        Expr::Lit(Literal::string("/org/x/Foo")),
                        Expr::selector(Expr::ident("wrapper"), "impl"),
                    ])],
                ),
            ],
        )];
        let bindings = resolve_units(&units);

        assert_eq!(bindings[0].source_struct_name.as_deref(), Some("FooWrapper"));
        assert_eq!(bindings[0].source_field_name.as_deref(), Some("impl"));
        assert_eq!(bindings[0].object_type_name.as_deref(), Some("fooImpl"));
    }

    #[test]
    fn test_constructor_result_and_interface_name() {
        let units = vec![unit(
            "a.go",
            vec![
                string_const("dbusInterface", "org.x.Manager"),
                struct_type("Manager", Vec::new()),
                Decl::Func(FuncDecl {
                    name: "NewManager".into(),
                    receiver: None,
                    params: Vec::new(),
                    results: vec![
                        Param::new(None, TypeExpr::pointer_to(TypeExpr::named("Manager"))),
                        Param::new(None, TypeExpr::named("error")),
                    ],
                    body: None,
                }),
                method(
                    "Manager",
                    INTERFACE_METHOD,
                    vec![Stmt::Return(vec![Expr::ident("dbusInterface")])],
                ),
                export_in(
                    None,
                    vec![
                        Stmt::Assign {
                            lhs: vec![Expr::ident("m"), Expr::ident("err")],
                            rhs: vec![Expr::call(Expr::ident("NewManager"), Vec::new())],
                            define: true,
                        },
                        export_call(vec![Expr::Lit(Literal::string("/org/x/Manager")), Expr::ident("m")]),
                    ],
                ),
            ],
        )];
        let bindings = resolve_units(&units);

        assert_eq!(bindings[0].object_type_name.as_deref(), Some("Manager"));
        assert_eq!(bindings[0].interface_name.as_deref(), Some("org.x.Manager"));
    }

    #[test]
    fn test_unrecognized_shapes_stay_empty() {
        let units = vec![unit(
            "a.go",
            vec![export_in(
                None,
                vec![export_call(vec![
                    Expr::selector(Expr::ident("pkg"), "Path"),
                    Expr::selector(Expr::selector(Expr::ident("a"), "b"), "c"),
                ])],
            )],
        )];
        let bindings = resolve_units(&units);

        assert_eq!(bindings, vec![Binding::new(0, 0)]);
        assert!(!bindings[0].is_resolved());
    }

    #[test]
    fn test_refresh_is_idempotent_after_fixed_point() {
        let units = vec![unit(
            "a.go",
            vec![
                string_const("FooPath", "/org/x/Bar"),
                export_in(
                    None,
                    vec![export_call(vec![
                        Expr::ident("FooPath"),
                        Expr::Composite {
                            ty: TypeExpr::named("Foo"),
                        },
                    ])],
                ),
            ],
        )];
        let scope = PackageScope::new(&units);
        let registry = ExportRegistry::scan_units(&units);
        let resolver = BindingResolver::new(&scope, &registry);

        let mut bindings = resolver.resolve();
        let snapshot = bindings.clone();
        assert!(!resolver.refresh(&mut bindings));
        assert_eq!(bindings, snapshot);
    }

    #[test]
    fn test_fill_never_overwrites() {
        let mut slot = Some("kept".to_string());
        assert!(!fill(&mut slot, Some("other".into())));
        assert_eq!(slot.as_deref(), Some("kept"));

        let mut empty = None;
        assert!(!fill(&mut empty, Some(String::new())));
        assert!(fill(&mut empty, Some("set".into())));
    }
}
