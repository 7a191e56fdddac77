//! Declaration tables
//!
//! A [`DeclarationIndex`] covers one source unit. Units never merge their tables; a
//! [`PackageScope`] answers package-wide questions by querying each unit's index in path
//! order and taking the first hit.

use crate::syntax::{Decl, Expr, FuncDecl, SourceUnit, TypeExpr, TypeSpec, ValueSpec};
use crate::types::GoType;
use std::collections::HashMap;
use tracing::trace;

/// How far named types are followed when looking for an underlying representation
const MAX_UNDERLYING_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Declaration<'a> {
    Const { spec: &'a ValueSpec, slot: usize },
    Var { spec: &'a ValueSpec, slot: usize },
    Type(&'a TypeSpec),
    Func(&'a FuncDecl),
}

impl<'a> Declaration<'a> {
    /// Initializer expression of a constant or variable
    pub fn initializer(&self) -> Option<&'a Expr> {
        match self {
            Declaration::Const { spec, slot } | Declaration::Var { spec, slot } => {
                spec.value_for(*slot)
            }
            _ => None,
        }
    }

    /// Value of a string-literal initializer
    pub fn literal_value(&self) -> Option<String> {
        match self.initializer()?.unparen() {
            Expr::Lit(lit) => lit.string_value(),
            _ => None,
        }
    }
}

/// Top-level names declared by one source unit
#[derive(Debug)]
pub struct DeclarationIndex<'a> {
    unit: &'a SourceUnit,
    names: HashMap<&'a str, Declaration<'a>>,
}

impl<'a> DeclarationIndex<'a> {
    pub fn build(unit: &'a SourceUnit) -> Self {
        let mut names = HashMap::new();
        let mut declare = |name: &'a str, decl: Declaration<'a>| {
            if name != "_" {
                names.entry(name).or_insert(decl);
            }
        };

        for decl in &unit.decls {
            match decl {
                Decl::Const(spec) => {
                    for (slot, name) in spec.names.iter().enumerate() {
                        declare(name.as_str(), Declaration::Const { spec, slot });
                    }
                }
                Decl::Var(spec) => {
                    for (slot, name) in spec.names.iter().enumerate() {
                        declare(name.as_str(), Declaration::Var { spec, slot });
                    }
                }
                Decl::Type(spec) => declare(spec.name.as_str(), Declaration::Type(spec)),
                // Methods live in their receiver's method set, and init functions are not
                // addressable
                Decl::Func(func) if !func.is_method() && func.name != "init" => {
                    declare(func.name.as_str(), Declaration::Func(func))
                }
                Decl::Func(_) => {}
            }
        }

        trace!("indexed {} names in {}", names.len(), unit.path.display());
        Self { unit, names }
    }

    pub fn unit(&self) -> &'a SourceUnit {
        self.unit
    }

    pub fn get(&self, name: &str) -> Option<Declaration<'a>> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read-only view over every unit of one package
#[derive(Debug)]
pub struct PackageScope<'a> {
    units: &'a [SourceUnit],
    indexes: Vec<DeclarationIndex<'a>>,
}

impl<'a> PackageScope<'a> {
    pub fn new(units: &'a [SourceUnit]) -> Self {
        Self {
            units,
            indexes: units.iter().map(DeclarationIndex::build).collect(),
        }
    }

    pub fn units(&self) -> &'a [SourceUnit] {
        self.units
    }

    pub fn indexes(&self) -> &[DeclarationIndex<'a>] {
        &self.indexes
    }

    pub fn lookup(&self, name: &str) -> Option<Declaration<'a>> {
        self.indexes.iter().find_map(|index| index.get(name))
    }

    pub fn type_spec(&self, name: &str) -> Option<&'a TypeSpec> {
        match self.lookup(name)? {
            Declaration::Type(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn func(&self, name: &str) -> Option<&'a FuncDecl> {
        match self.lookup(name)? {
            Declaration::Func(func) => Some(func),
            _ => None,
        }
    }

    /// String value of a package-level constant or variable
    pub fn string_value(&self, name: &str) -> Option<String> {
        match self.lookup(name)? {
            decl @ (Declaration::Const { .. } | Declaration::Var { .. }) => decl.literal_value(),
            _ => None,
        }
    }

    pub fn declares_type(&self, name: &str) -> bool {
        self.type_spec(name).is_some()
    }

    /// Type declarations in unit order, then source order
    pub fn type_specs(&self) -> impl Iterator<Item = &'a TypeSpec> + 'a {
        self.units.iter().flat_map(|unit| {
            unit.decls.iter().filter_map(|decl| match decl {
                Decl::Type(spec) => Some(spec),
                _ => None,
            })
        })
    }

    /// Methods whose receiver base type is `type_name`, in unit order
    pub fn methods_of<'s>(&'s self, type_name: &'s str) -> impl Iterator<Item = &'a FuncDecl> + 's {
        self.units
            .iter()
            .flat_map(SourceUnit::functions)
            .filter(move |func| func.receiver_type_name() == Some(type_name))
    }

    pub fn resolve_type(&self, expr: &TypeExpr) -> GoType {
        GoType::resolve(expr, &|name: &str| self.declares_type(name))
    }

    /// Underlying representation of a type expression, following local named types
    pub fn underlying(&self, expr: &TypeExpr) -> GoType {
        let mut current = expr;
        for _ in 0..MAX_UNDERLYING_DEPTH {
            match current {
                TypeExpr::Name(name) => match self.type_spec(name) {
                    Some(spec) => current = &spec.ty,
                    None => return self.resolve_type(current),
                },
                _ => return self.resolve_type(current),
            }
        }
        trace!("gave up following named types at depth {}", MAX_UNDERLYING_DEPTH);
        GoType::Invalid
    }
}
