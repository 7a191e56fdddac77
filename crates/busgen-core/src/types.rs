//! Resolved Go types
//!
//! [`GoType`] is what a [`TypeExpr`] means inside one package: predeclared names become
//! [`GoType::Basic`], names declared by the package become [`GoType::Named`], and names that
//! come from imports stay opaque. Only part of the dependency graph is ever loaded, so an
//! opaque type is never an error here; it just counts as a failed resolution wherever a
//! well-formed type is required.

use crate::syntax::{ChanDir, InterfaceElem, Param, TypeExpr};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Error,
    Any,
}

impl BasicKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "bool" => BasicKind::Bool,
            "string" => BasicKind::String,
            "int" => BasicKind::Int,
            "int8" => BasicKind::Int8,
            "int16" => BasicKind::Int16,
            "int32" | "rune" => BasicKind::Int32,
            "int64" => BasicKind::Int64,
            "uint" => BasicKind::Uint,
            "uint8" | "byte" => BasicKind::Uint8,
            "uint16" => BasicKind::Uint16,
            "uint32" => BasicKind::Uint32,
            "uint64" => BasicKind::Uint64,
            "uintptr" => BasicKind::Uintptr,
            "float32" => BasicKind::Float32,
            "float64" => BasicKind::Float64,
            "complex64" => BasicKind::Complex64,
            "complex128" => BasicKind::Complex128,
            "error" => BasicKind::Error,
            "any" => BasicKind::Any,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "byte",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::Error => "error",
            BasicKind::Any => "any",
        }
    }
}

/// Scalar kinds that have a typed property accessor on the proxy side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarKind {
    Byte,
    Bool,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Double,
    String,
}

impl ScalarKind {
    pub fn from_basic(kind: BasicKind) -> Option<Self> {
        Some(match kind {
            BasicKind::Uint8 => ScalarKind::Byte,
            BasicKind::Bool => ScalarKind::Bool,
            BasicKind::Int16 => ScalarKind::Int16,
            BasicKind::Uint16 => ScalarKind::Uint16,
            BasicKind::Int32 => ScalarKind::Int32,
            BasicKind::Uint32 => ScalarKind::Uint32,
            BasicKind::Int64 => ScalarKind::Int64,
            BasicKind::Uint64 => ScalarKind::Uint64,
            BasicKind::Float64 => ScalarKind::Double,
            BasicKind::String => ScalarKind::String,
            _ => return None,
        })
    }

    /// Accessor suffix, e.g. `Uint32` in `PropUint32`
    pub fn accessor_name(self) -> &'static str {
        match self {
            ScalarKind::Byte => "Byte",
            ScalarKind::Bool => "Bool",
            ScalarKind::Int16 => "Int16",
            ScalarKind::Uint16 => "Uint16",
            ScalarKind::Int32 => "Int32",
            ScalarKind::Uint32 => "Uint32",
            ScalarKind::Int64 => "Int64",
            ScalarKind::Uint64 => "Uint64",
            ScalarKind::Double => "Double",
            ScalarKind::String => "String",
        }
    }
}

/// Structural description of a member's type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeShape {
    Scalar(ScalarKind),
    ScalarSlice(ScalarKind),
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoVar {
    pub name: Option<String>,
    pub ty: GoType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoField {
    pub name: String,
    pub ty: GoType,
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GoType {
    Basic(BasicKind),
    /// Declared in the analyzed package
    Named(String),
    /// Declared by an imported package that is not loaded
    Opaque { package: String, name: String },
    Pointer(Box<GoType>),
    Slice(Box<GoType>),
    Array { len: String, elem: Box<GoType> },
    Map { key: Box<GoType>, value: Box<GoType> },
    Chan { dir: ChanDir, elem: Box<GoType> },
    Func { params: Vec<GoVar>, results: Vec<GoVar>, variadic: bool },
    Struct(Vec<GoField>),
    Interface { methods: Vec<String> },
    Invalid,
}

impl GoType {
    /// Resolve a type expression; `declared` answers whether a bare name is a type declared
    /// by the package being analyzed.
    pub fn resolve(expr: &TypeExpr, declared: &dyn Fn(&str) -> bool) -> GoType {
        match expr {
            TypeExpr::Name(name) => {
                if declared(name) {
                    GoType::Named(name.clone())
                } else if let Some(kind) = BasicKind::from_name(name) {
                    GoType::Basic(kind)
                } else {
                    GoType::Invalid
                }
            }
            TypeExpr::Qualified { package, name } => GoType::Opaque {
                package: package.clone(),
                name: name.clone(),
            },
            TypeExpr::Pointer(inner) => GoType::Pointer(Box::new(Self::resolve(inner, declared))),
            TypeExpr::Slice(inner) => GoType::Slice(Box::new(Self::resolve(inner, declared))),
            TypeExpr::Array { len, elem } => GoType::Array {
                len: len.clone(),
                elem: Box::new(Self::resolve(elem, declared)),
            },
            TypeExpr::Map { key, value } => GoType::Map {
                key: Box::new(Self::resolve(key, declared)),
                value: Box::new(Self::resolve(value, declared)),
            },
            TypeExpr::Chan { dir, elem } => GoType::Chan {
                dir: dir.clone(),
                elem: Box::new(Self::resolve(elem, declared)),
            },
            TypeExpr::Func { params, results } => GoType::Func {
                params: resolve_params(params, declared),
                results: resolve_params(results, declared),
                variadic: params.last().is_some_and(|p| p.variadic),
            },
            TypeExpr::Struct(fields) => GoType::Struct(
                fields
                    .iter()
                    .flat_map(|field| {
                        let ty = Self::resolve(&field.ty, declared);
                        let embedded = field.names.is_empty();
                        field.field_names().into_iter().map(move |name| GoField {
                            name,
                            ty: ty.clone(),
                            embedded,
                        })
                    })
                    .collect(),
            ),
            TypeExpr::Interface(elems) => GoType::Interface {
                methods: elems
                    .iter()
                    .filter_map(|elem| match elem {
                        InterfaceElem::Method { name, .. } => Some(name.clone()),
                        InterfaceElem::Embedded(_) => None,
                    })
                    .collect(),
            },
            // Instantiated generics are not modelled
            TypeExpr::Generic { .. } | TypeExpr::Bad => GoType::Invalid,
        }
    }

    /// True when resolution failed anywhere inside this type
    pub fn is_malformed(&self) -> bool {
        match self {
            GoType::Invalid | GoType::Opaque { .. } => true,
            GoType::Basic(_) | GoType::Named(_) | GoType::Interface { .. } => false,
            GoType::Pointer(inner) | GoType::Slice(inner) => inner.is_malformed(),
            GoType::Array { elem, .. } | GoType::Chan { elem, .. } => elem.is_malformed(),
            GoType::Map { key, value } => key.is_malformed() || value.is_malformed(),
            GoType::Func { params, results, .. } => {
                params.iter().chain(results).any(|v| v.ty.is_malformed())
            }
            GoType::Struct(fields) => fields.iter().any(|f| f.ty.is_malformed()),
        }
    }

    pub fn shape(&self) -> TypeShape {
        match self {
            GoType::Basic(kind) => ScalarKind::from_basic(*kind)
                .map(TypeShape::Scalar)
                .unwrap_or(TypeShape::Other),
            GoType::Slice(elem) => match elem.as_ref() {
                GoType::Basic(kind) => ScalarKind::from_basic(*kind)
                    .map(TypeShape::ScalarSlice)
                    .unwrap_or(TypeShape::Other),
                _ => TypeShape::Other,
            },
            _ => TypeShape::Other,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GoType::Basic(BasicKind::Error))
    }
}

fn resolve_params(params: &[Param], declared: &dyn Fn(&str) -> bool) -> Vec<GoVar> {
    params
        .iter()
        .map(|param| {
            let ty = GoType::resolve(&param.ty, declared);
            GoVar {
                name: param.name.clone(),
                ty: if param.variadic {
                    GoType::Slice(Box::new(ty))
                } else {
                    ty
                },
            }
        })
        .collect()
}

fn write_vars(f: &mut fmt::Formatter<'_>, vars: &[GoVar], variadic: bool) -> fmt::Result {
    for (i, var) in vars.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        if let Some(name) = &var.name {
            write!(f, "{} ", name)?;
        }
        match (&var.ty, variadic && i + 1 == vars.len()) {
            (GoType::Slice(elem), true) => write!(f, "...{}", elem)?,
            (ty, _) => write!(f, "{}", ty)?,
        }
    }
    Ok(())
}

/// Renders Go source syntax
impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Basic(kind) => write!(f, "{}", kind.name()),
            GoType::Named(name) => write!(f, "{}", name),
            GoType::Opaque { package, name } => write!(f, "{}.{}", package, name),
            GoType::Pointer(inner) => write!(f, "*{}", inner),
            GoType::Slice(inner) => write!(f, "[]{}", inner),
            GoType::Array { len, elem } => write!(f, "[{}]{}", len, elem),
            GoType::Map { key, value } => write!(f, "map[{}]{}", key, value),
            GoType::Chan { dir, elem } => match dir {
                ChanDir::Both => write!(f, "chan {}", elem),
                ChanDir::Send => write!(f, "chan<- {}", elem),
                ChanDir::Recv => write!(f, "<-chan {}", elem),
            },
            GoType::Func {
                params,
                results,
                variadic,
            } => {
                write!(f, "func(")?;
                write_vars(f, params, *variadic)?;
                write!(f, ")")?;
                match results.as_slice() {
                    [] => Ok(()),
                    [single] if single.name.is_none() => write!(f, " {}", single.ty),
                    _ => {
                        write!(f, " (")?;
                        write_vars(f, results, false)?;
                        write!(f, ")")
                    }
                }
            }
            GoType::Struct(fields) => {
                write!(f, "struct {{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    if field.embedded {
                        write!(f, " {}", field.ty)?;
                    } else {
                        write!(f, " {} {}", field.name, field.ty)?;
                    }
                }
                if fields.is_empty() {
                    write!(f, "}}")
                } else {
                    write!(f, " }}")
                }
            }
            GoType::Interface { methods } if methods.is_empty() => write!(f, "interface{{}}"),
            GoType::Interface { .. } => write!(f, "interface{{ /* methods */ }}"),
            GoType::Invalid => write!(f, "invalid type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::FieldDecl;

    fn nothing_declared(_: &str) -> bool {
        false
    }

    #[test]
    fn test_resolve_basic_and_named() {
        let declared = |name: &str| name == "Flags";
        assert_eq!(
            GoType::resolve(&TypeExpr::named("uint32"), &declared),
            GoType::Basic(BasicKind::Uint32)
        );
        assert_eq!(
            GoType::resolve(&TypeExpr::named("Flags"), &declared),
            GoType::Named("Flags".into())
        );
        assert_eq!(
            GoType::resolve(&TypeExpr::named("Missing"), &declared),
            GoType::Invalid
        );
    }

    #[test]
    fn test_imported_types_are_malformed() {
        let ty = GoType::resolve(
            &TypeExpr::slice_of(TypeExpr::Qualified {
                package: "dbus".into(),
                name: "ObjectPath".into(),
            }),
            &nothing_declared,
        );
        assert!(ty.is_malformed());
        assert_eq!(ty.to_string(), "[]dbus.ObjectPath");
    }

    #[test]
    fn test_shapes() {
        let string = GoType::resolve(&TypeExpr::named("string"), &nothing_declared);
        assert_eq!(string.shape(), TypeShape::Scalar(ScalarKind::String));

        let bytes = GoType::resolve(&TypeExpr::slice_of(TypeExpr::named("byte")), &nothing_declared);
        assert_eq!(bytes.shape(), TypeShape::ScalarSlice(ScalarKind::Byte));

        let ints = GoType::resolve(&TypeExpr::slice_of(TypeExpr::named("int")), &nothing_declared);
        assert_eq!(ints.shape(), TypeShape::Other);

        let double = GoType::resolve(&TypeExpr::named("float64"), &nothing_declared);
        assert_eq!(double.shape(), TypeShape::Scalar(ScalarKind::Double));
    }

    #[test]
    fn test_render_anonymous_struct() {
        let ty = GoType::resolve(
            &TypeExpr::Struct(vec![
                FieldDecl::new("name", TypeExpr::named("string")),
                FieldDecl::new("value", TypeExpr::named("uint32")),
            ]),
            &nothing_declared,
        );
        assert_eq!(ty.to_string(), "struct { name string; value uint32 }");
        assert_eq!(GoType::Struct(Vec::new()).to_string(), "struct {}");
    }

    #[test]
    fn test_render_map_and_func() {
        let ty = GoType::Map {
            key: Box::new(GoType::Basic(BasicKind::String)),
            value: Box::new(GoType::Func {
                params: vec![GoVar {
                    name: None,
                    ty: GoType::Basic(BasicKind::Int),
                }],
                results: vec![GoVar {
                    name: None,
                    ty: GoType::Basic(BasicKind::Error),
                }],
                variadic: false,
            }),
        };
        assert_eq!(ty.to_string(), "map[string]func(int) error");
    }
}
