//! Export-site discovery
//!
//! Finds `x.Export(path, obj...)` calls among the top-level statements of each function
//! body and records the raw path and object expressions together with the local
//! declarations they may refer to.

use crate::syntax::{Expr, FuncDecl, SourceUnit, Stmt, TypeExpr, UnaryOp};
use indexmap::IndexMap;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Member name of the registration call
pub const EXPORT_CALL: &str = "Export";

/// Raw expression at an export site, narrowed to the shapes resolution understands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RawExpr {
    /// String literal, already unquoted
    Literal(String),
    Ident(String),
    /// `base.member` where `base` is a plain identifier
    Selector { base: String, member: String },
    /// `&expr`
    AddressOf(Box<RawExpr>),
    /// `T{...}`
    Composite { type_name: String },
    /// `f(...)` with a plain identifier callee
    CallResult { callee: String },
    /// Anything else, with a short description of the shape
    Unrecognized(String),
}

impl RawExpr {
    pub fn from_expr(expr: &Expr) -> Self {
        match expr.unparen() {
            Expr::Lit(lit) => match lit.string_value() {
                Some(value) => RawExpr::Literal(value),
                None => RawExpr::Unrecognized(format!("{:?} literal", lit.kind)),
            },
            Expr::Ident(name) => RawExpr::Ident(name.clone()),
            Expr::Selector { base, member } => match base.unparen() {
                Expr::Ident(base) => RawExpr::Selector {
                    base: base.clone(),
                    member: member.clone(),
                },
                _ => RawExpr::Unrecognized("nested selector".to_string()),
            },
            Expr::Unary {
                op: UnaryOp::AddressOf,
                operand,
            } => RawExpr::AddressOf(Box::new(RawExpr::from_expr(operand))),
            Expr::Composite { ty } => match ty.base_name() {
                Some(name) if !matches!(ty, TypeExpr::Pointer(_)) => RawExpr::Composite {
                    type_name: name.to_string(),
                },
                _ => RawExpr::Unrecognized("composite literal of unnamed type".to_string()),
            },
            Expr::Call { callee, .. } => match callee.unparen() {
                Expr::Ident(name) => RawExpr::CallResult {
                    callee: name.clone(),
                },
                _ => RawExpr::Unrecognized("call through selector".to_string()),
            },
            Expr::Unary { op, .. } => RawExpr::Unrecognized(format!("{:?} expression", op)),
            Expr::Binary { op, .. } => RawExpr::Unrecognized(format!("binary {} expression", op)),
            Expr::Paren(_) | Expr::Unknown => RawExpr::Unrecognized("expression".to_string()),
        }
    }
}

/// Declaration of a name inside the enclosing function
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LocalDecl {
    /// Receiver, parameter or named result
    Param(TypeExpr),
    /// `a, b := value`; `slot` is the position of the name on the left
    Assigned { value: Expr, slot: usize },
    /// `var`/`const` statement
    Value {
        ty: Option<TypeExpr>,
        value: Option<Expr>,
        constant: bool,
    },
}

/// Names visible at a statement, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalScope {
    names: IndexMap<String, LocalDecl>,
}

impl LocalScope {
    /// Collect the receiver, parameters and the declarations made by the first `upto`
    /// top-level statements of `func`.
    pub fn collect(func: &FuncDecl, upto: usize) -> Self {
        let mut scope = LocalScope::default();
        let signature = func
            .receiver
            .iter()
            .chain(&func.params)
            .chain(&func.results);
        for param in signature {
            if let Some(name) = &param.name {
                let ty = if param.variadic {
                    TypeExpr::slice_of(param.ty.clone())
                } else {
                    param.ty.clone()
                };
                scope.declare(name, LocalDecl::Param(ty));
            }
        }

        let stmts = func.body.iter().flat_map(|body| body.stmts.iter().take(upto));
        for stmt in stmts {
            match stmt {
                Stmt::Assign {
                    lhs,
                    rhs,
                    define: true,
                } => {
                    for (slot, target) in lhs.iter().enumerate() {
                        let Expr::Ident(name) = target else { continue };
                        let value = if rhs.len() == lhs.len() {
                            rhs.get(slot).map(|v| (v.clone(), 0))
                        } else {
                            rhs.first().map(|v| (v.clone(), slot))
                        };
                        if let Some((value, slot)) = value {
                            scope.declare(name, LocalDecl::Assigned { value, slot });
                        }
                    }
                }
                Stmt::Var(spec) | Stmt::Const(spec) => {
                    for (slot, name) in spec.names.iter().enumerate() {
                        scope.declare(
                            name,
                            LocalDecl::Value {
                                ty: spec.ty.clone(),
                                value: spec.value_for(slot).cloned(),
                                constant: matches!(stmt, Stmt::Const(_)),
                            },
                        );
                    }
                }
                _ => {}
            }
        }
        scope
    }

    /// The first declaration of a name wins; later `:=` statements only reassign it
    fn declare(&mut self, name: &str, decl: LocalDecl) {
        if name != "_" {
            self.names.entry(name.to_string()).or_insert(decl);
        }
    }

    pub fn get(&self, name: &str) -> Option<&LocalDecl> {
        self.names.get(name)
    }

    /// String literal bound to a local name.
    ///
    /// `Some(None)` means the name is local but not bound to a literal, so package-level
    /// declarations must not be consulted.
    pub fn string_value(&self, name: &str) -> Option<Option<String>> {
        let decl = self.get(name)?;
        let value = match decl {
            LocalDecl::Assigned { value, slot: 0 } => Some(value),
            LocalDecl::Value {
                value: Some(value), ..
            } => Some(value),
            _ => None,
        };
        Some(value.and_then(|value| match value.unparen() {
            Expr::Lit(lit) => lit.string_value(),
            _ => None,
        }))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One recognized registration call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportSite {
    pub file: PathBuf,
    pub function: String,
    pub path: RawExpr,
    pub objects: Vec<RawExpr>,
    pub locals: LocalScope,
}

/// Every export site of one package, in unit order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportRegistry {
    pub sites: Vec<ExportSite>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, site: ExportSite) {
        self.sites.push(site);
    }

    pub fn extend(&mut self, sites: impl IntoIterator<Item = ExportSite>) {
        self.sites.extend(sites);
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Scan every function of every unit
    pub fn scan_units(units: &[SourceUnit]) -> Self {
        let mut registry = Self::new();
        for unit in units {
            registry.extend(scan_unit(unit));
        }
        debug!("found {} export sites in {} units", registry.len(), units.len());
        registry
    }
}

/// Export sites of one unit, at most one per function
pub fn scan_unit(unit: &SourceUnit) -> Vec<ExportSite> {
    unit.functions()
        .filter_map(|func| scan(func, &unit.path))
        .collect()
}

/// First export call among the top-level statements of `func`
pub fn scan(func: &FuncDecl, file: &std::path::Path) -> Option<ExportSite> {
    let body = func.body.as_ref()?;
    for (position, stmt) in body.stmts.iter().enumerate() {
        let Some(args) = export_call_args(stmt) else {
            continue;
        };
        if args.len() < 2 {
            trace!(
                "{}: export call in {} has {} argument(s), skipping function",
                file.display(),
                func.name,
                args.len()
            );
            return None;
        }

        let site = ExportSite {
            file: file.to_path_buf(),
            function: func.name.clone(),
            path: RawExpr::from_expr(&args[0]),
            objects: args[1..].iter().map(RawExpr::from_expr).collect(),
            locals: LocalScope::collect(func, position),
        };
        trace!(
            "{}: export site in {} with {} object(s)",
            file.display(),
            func.name,
            site.objects.len()
        );
        return Some(site);
    }
    None
}

fn export_call_args(stmt: &Stmt) -> Option<&[Expr]> {
    let calls: Vec<&Expr> = match stmt {
        Stmt::Expr(expr) => vec![expr],
        Stmt::Assign { rhs, .. } => rhs.iter().collect(),
        _ => return None,
    };
    calls.into_iter().find_map(|expr| match expr.unparen() {
        Expr::Call { callee, args } => match callee.unparen() {
            Expr::Selector { member, .. } if member == EXPORT_CALL => Some(args.as_slice()),
            _ => None,
        },
        _ => None,
    })
}
