//! Syntax model for the subset of Go that export analysis needs
//!
//! The tree is deliberately shallow: declarations and types are modelled in full, function
//! bodies only down to their top-level statements, and any expression form the analysis
//! never inspects collapses into [`Expr::Unknown`].

use serde::Serialize;
use std::path::PathBuf;

/// One parsed source file
#[derive(Debug, Clone, Serialize)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

impl SourceUnit {
    pub fn new(path: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            package: package.into(),
            imports: Vec::new(),
            decls: Vec::new(),
        }
    }

    /// All function and method declarations in source order
    pub fn functions(&self) -> impl Iterator<Item = &FuncDecl> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Func(func) => Some(func),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSpec {
    pub alias: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Decl {
    Const(ValueSpec),
    Var(ValueSpec),
    Type(TypeSpec),
    Func(FuncDecl),
}

/// `const`/`var` specification; grouped declarations produce one spec per line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueSpec {
    pub names: Vec<String>,
    pub ty: Option<TypeExpr>,
    pub values: Vec<Expr>,
}

impl ValueSpec {
    /// Initializer paired with the name at `slot`.
    ///
    /// A single initializer is shared by every name, which covers `var a, b = f()`.
    pub fn value_for(&self, slot: usize) -> Option<&Expr> {
        if self.values.len() == 1 {
            self.values.first()
        } else {
            self.values.get(slot)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSpec {
    pub name: String,
    /// `type A = B`
    pub alias: bool,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<Param>,
    pub params: Vec<Param>,
    pub results: Vec<Param>,
    pub body: Option<Block>,
}

impl FuncDecl {
    /// Base type name of the receiver, with any pointer stripped
    pub fn receiver_type_name(&self) -> Option<&str> {
        self.receiver.as_ref().and_then(|recv| recv.ty.base_name())
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: TypeExpr,
    pub variadic: bool,
}

impl Param {
    pub fn new(name: Option<&str>, ty: TypeExpr) -> Self {
        Self {
            name: name.map(str::to_string),
            ty,
            variadic: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        lhs: Vec<Expr>,
        rhs: Vec<Expr>,
        /// `:=` rather than `=` or an op-assignment
        define: bool,
    },
    Var(ValueSpec),
    Const(ValueSpec),
    Return(Vec<Expr>),
    /// Compound statements whose contents are not analyzed
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Literal {
    pub kind: LitKind,
    /// Source spelling, quotes included
    pub raw: String,
}

impl Literal {
    pub fn string(value: &str) -> Self {
        Self {
            kind: LitKind::String,
            raw: format!("{:?}", value),
        }
    }

    /// Value of a string literal with quotes removed and escapes interpreted
    pub fn string_value(&self) -> Option<String> {
        if self.kind != LitKind::String {
            return None;
        }
        unquote(&self.raw)
    }
}

/// Interpret a Go string literal. Raw strings are taken as written, minus carriage returns.
///
/// `\x` and octal escapes produce single bytes, so the decoded bytes must form valid UTF-8.
pub fn unquote(raw: &str) -> Option<String> {
    if let Some(inner) = raw.strip_prefix('`').and_then(|r| r.strip_suffix('`')) {
        return Some(inner.replace('\r', ""));
    }
    let inner = raw.strip_prefix('"')?.strip_suffix('"')?;
    let mut out: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            push_char(&mut out, c);
            continue;
        }
        match chars.next()? {
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            'r' => out.push(b'\r'),
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0C),
            'v' => out.push(0x0B),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            'u' => {
                let hex: String = chars.by_ref().take(4).collect();
                push_char(&mut out, char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            'U' => {
                let hex: String = chars.by_ref().take(8).collect();
                push_char(&mut out, char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?);
            }
            d @ '0'..='7' => {
                let rest: String = chars.by_ref().take(2).collect();
                let octal = format!("{}{}", d, rest);
                out.push(u8::from_str_radix(&octal, 8).ok()?);
            }
            _ => return None,
        }
    }
    String::from_utf8(out).ok()
}

fn push_char(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    AddressOf,
    Deref,
    Neg,
    Plus,
    Not,
    Complement,
    Receive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Lit(Literal),
    Ident(String),
    Selector {
        base: Box<Expr>,
        member: String,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `T{...}`; element lists are not retained
    Composite {
        ty: TypeExpr,
    },
    Paren(Box<Expr>),
    Unknown,
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_string())
    }

    pub fn selector(base: Expr, member: &str) -> Self {
        Expr::Selector {
            base: Box::new(base),
            member: member.to_string(),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn address_of(operand: Expr) -> Self {
        Expr::Unary {
            op: UnaryOp::AddressOf,
            operand: Box::new(operand),
        }
    }

    /// Strip redundant parentheses
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(inner) = expr {
            expr = inner;
        }
        expr
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeExpr {
    Name(String),
    /// `pkg.Name`
    Qualified { package: String, name: String },
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func { params: Vec<Param>, results: Vec<Param> },
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
    /// `Name[Args]`; analysis treats instantiations as the generic base
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
    /// Placeholder produced by error recovery
    Bad,
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Name(name.to_string())
    }

    pub fn pointer_to(inner: TypeExpr) -> Self {
        TypeExpr::Pointer(Box::new(inner))
    }

    pub fn slice_of(inner: TypeExpr) -> Self {
        TypeExpr::Slice(Box::new(inner))
    }

    /// Local type name behind at most one pointer, as used for receivers and
    /// constructor results
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Name(name) => Some(name),
            TypeExpr::Pointer(inner) => match inner.as_ref() {
                TypeExpr::Name(name) => Some(name),
                TypeExpr::Generic { base, .. } => base.base_name(),
                _ => None,
            },
            TypeExpr::Generic { base, .. } => base.base_name(),
            _ => None,
        }
    }

    /// Local type name behind exactly one pointer
    pub fn pointee_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Pointer(inner) => match inner.as_ref() {
                TypeExpr::Name(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDecl {
    /// Empty for embedded fields
    pub names: Vec<String>,
    pub ty: TypeExpr,
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        Self {
            names: vec![name.to_string()],
            ty,
            tag: None,
        }
    }

    /// Declared names, or the implicit name of an embedded field
    pub fn field_names(&self) -> Vec<String> {
        if !self.names.is_empty() {
            return self.names.clone();
        }
        let mut ty = &self.ty;
        if let TypeExpr::Pointer(inner) = ty {
            ty = inner;
        }
        match ty {
            TypeExpr::Name(name) => vec![name.clone()],
            TypeExpr::Qualified { name, .. } => vec![name.clone()],
            TypeExpr::Generic { base, .. } => match base.as_ref() {
                TypeExpr::Name(name) | TypeExpr::Qualified { name, .. } => vec![name.clone()],
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum InterfaceElem {
    Method {
        name: String,
        params: Vec<Param>,
        results: Vec<Param>,
    },
    Embedded(TypeExpr),
}

/// Go's exported-identifier rule
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_interpreted_and_raw() {
        assert_eq!(unquote("\"/org/x/Foo\"").as_deref(), Some("/org/x/Foo"));
        assert_eq!(unquote("`a\\nb`").as_deref(), Some("a\\nb"));
        assert_eq!(unquote("\"a\\tb\\x41\\u00e9\"").as_deref(), Some("a\tbAé"));
        assert_eq!(unquote("\"bad\\q\""), None);
        assert_eq!(unquote("'c'"), None);
    }

    #[test]
    fn test_unquote_byte_escapes_decode_as_utf8() {
        assert_eq!(unquote("\"caf\\xc3\\xa9\"").as_deref(), Some("café"));
        assert_eq!(unquote("\"caf\\303\\251\"").as_deref(), Some("café"));
        assert_eq!(unquote("\"\\xff\""), None);
    }

    #[test]
    fn test_embedded_field_names() {
        let embedded = FieldDecl {
            names: Vec::new(),
            ty: TypeExpr::pointer_to(TypeExpr::Qualified {
                package: "proxy".into(),
                name: "Object".into(),
            }),
            tag: None,
        };
        assert_eq!(embedded.field_names(), vec!["Object".to_string()]);
    }

    #[test]
    fn test_exported_names() {
        assert!(is_exported("Name"));
        assert!(!is_exported("name"));
        assert!(!is_exported("_Name"));
        assert!(!is_exported(""));
    }
}
