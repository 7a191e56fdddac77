//! Exportability and member classification
//!
//! A type is exportable when it is an exported struct type whose pointer has the
//! identification method `GetInterfaceName() string`. The check is a direct structural
//! query over the package's method declarations; nothing else needs to type-check.

use crate::error::{CoreError, Result};
use crate::index::PackageScope;
use crate::syntax::{is_exported, FuncDecl, Param, TypeSpec};
use crate::types::{BasicKind, GoType, TypeShape};
use serde::Serialize;
use tracing::{debug, trace};

/// Method that names the remote interface of an exported object
pub const INTERFACE_METHOD: &str = "GetInterfaceName";
/// Field holding the signal definitions
pub const SIGNALS_FIELD: &str = "signals";
/// Field reserved for method metadata
pub const METHODS_FIELD: &str = "methods";

/// Whether `spec` describes a type that may be exported
pub fn is_exportable(scope: &PackageScope<'_>, spec: &TypeSpec) -> bool {
    if spec.alias || !is_exported(&spec.name) {
        return false;
    }
    if !matches!(scope.underlying(&spec.ty), GoType::Struct(_)) {
        return false;
    }
    scope
        .methods_of(&spec.name)
        .any(|func| is_identification_method(scope, func))
}

fn is_identification_method(scope: &PackageScope<'_>, func: &FuncDecl) -> bool {
    if func.name != INTERFACE_METHOD || !func.params.is_empty() || func.results.len() != 1 {
        return false;
    }
    matches!(
        scope.underlying(&func.results[0].ty),
        GoType::Basic(BasicKind::String)
    )
}

/// Exportable type declarations of a package, in declaration order
pub fn exportable_types<'a>(scope: &PackageScope<'a>) -> Vec<&'a TypeSpec> {
    let types: Vec<_> = scope
        .type_specs()
        .filter(|spec| is_exportable(scope, spec))
        .collect();
    debug!("{} exportable type(s)", types.len());
    types
}

/// Parameter, result or signal argument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arg {
    pub name: Option<String>,
    pub ty: GoType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub ty: GoType,
    pub shape: TypeShape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    pub name: String,
    pub params: Vec<Arg>,
    /// Decoded outputs; `error` results are carried by the call itself
    pub results: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub name: String,
    /// Payload fields, in declaration order
    pub args: Vec<Arg>,
}

/// Remote-facing members of one exportable type, in first-discovered order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedType {
    pub type_name: String,
    pub properties: Vec<Property>,
    pub methods: Vec<Method>,
    pub signals: Vec<Signal>,
}

impl ClassifiedType {
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty() && self.methods.is_empty() && self.signals.is_empty()
    }
}

/// Classify an exportable type by name
pub fn classify_named(scope: &PackageScope<'_>, type_name: &str) -> Result<ClassifiedType> {
    let spec = scope
        .type_spec(type_name)
        .ok_or_else(|| CoreError::UnknownType(type_name.to_string()))?;
    if !is_exportable(scope, spec) {
        return Err(CoreError::NotExportable(type_name.to_string()));
    }
    Ok(classify(scope, spec))
}

/// Partition fields and methods of `spec` into properties, signals and methods
pub fn classify(scope: &PackageScope<'_>, spec: &TypeSpec) -> ClassifiedType {
    let mut classified = ClassifiedType {
        type_name: spec.name.clone(),
        properties: Vec::new(),
        methods: Vec::new(),
        signals: Vec::new(),
    };

    if let GoType::Struct(fields) = scope.underlying(&spec.ty) {
        for field in fields {
            if field.name == SIGNALS_FIELD {
                classified.signals.extend(signals_of(&field.ty));
            } else if is_exported(&field.name) && field.name != METHODS_FIELD {
                if field.ty.is_malformed() {
                    trace!("{}.{}: dropping property of type {}", spec.name, field.name, field.ty);
                    continue;
                }
                classified.properties.push(Property {
                    shape: field.ty.shape(),
                    name: field.name,
                    ty: field.ty,
                });
            }
        }
    }

    for func in scope.methods_of(&spec.name) {
        if !is_exported(&func.name) || func.name == INTERFACE_METHOD {
            continue;
        }
        // A name declared twice keeps its first declaration
        if classified.methods.iter().any(|m| m.name == func.name) {
            continue;
        }
        classified.methods.push(Method {
            name: func.name.clone(),
            params: usable_args(scope, &func.params),
            results: usable_args(scope, &func.results)
                .into_iter()
                .filter(|arg| !arg.ty.is_error())
                .collect(),
        });
    }

    debug!(
        "classified {}: {} properties, {} methods, {} signals",
        classified.type_name,
        classified.properties.len(),
        classified.methods.len(),
        classified.signals.len()
    );
    classified
}

fn usable_args(scope: &PackageScope<'_>, params: &[Param]) -> Vec<Arg> {
    params
        .iter()
        .map(|param| {
            let ty = scope.resolve_type(&param.ty);
            Arg {
                name: param.name.clone(),
                ty: if param.variadic {
                    GoType::Slice(Box::new(ty))
                } else {
                    ty
                },
            }
        })
        .filter(|arg| !arg.ty.is_malformed())
        .collect()
}

/// Signals declared by the reserved field, which must point to an anonymous struct
/// whose fields are struct-typed payloads
fn signals_of(ty: &GoType) -> Vec<Signal> {
    let GoType::Pointer(inner) = ty else {
        trace!("signal field of type {} is not a pointer", ty);
        return Vec::new();
    };
    let GoType::Struct(members) = inner.as_ref() else {
        trace!("signal field points to {}, not a struct", inner);
        return Vec::new();
    };
    members
        .iter()
        .filter_map(|member| match &member.ty {
            GoType::Struct(payload) => Some(Signal {
                name: member.name.clone(),
                args: payload
                    .iter()
                    .filter(|field| !field.ty.is_malformed())
                    .map(|field| Arg {
                        name: Some(field.name.clone()),
                        ty: field.ty.clone(),
                    })
                    .collect(),
            }),
            other => {
                trace!("signal {} has non-struct payload {}", member.name, other);
                None
            }
        })
        .collect()
}
