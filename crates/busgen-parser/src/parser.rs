//! Recursive-descent parser for Go source files
//!
//! Declarations and types are parsed in full. Function bodies are parsed one top-level
//! statement at a time: simple statements, `var`/`const` and `return` are kept, while
//! compound statements are skipped as balanced token runs and become [`Stmt::Other`].
//!
//! Errors are recovered at two levels. A statement that fails to parse is skipped up to the
//! next statement boundary of its block. A declaration that fails to parse is skipped up to
//! the next declaration keyword that starts a line. Both record a [`Diagnostic`].

use crate::error::{Diagnostic, SyntaxError, SyntaxResult};
use crate::token::{Token, TT};
use busgen_core::syntax::{
    Block, ChanDir, Decl, Expr, FieldDecl, FuncDecl, ImportSpec, InterfaceElem, LitKind, Literal,
    Param, SourceUnit, Stmt, TypeExpr, TypeSpec, UnaryOp, ValueSpec,
};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Syntax of one file plus the errors that were recovered from
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub unit: SourceUnit,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parameter list entry before names and types are paired up
enum ParamEntry {
    /// A lone identifier: a name in a named list, a type otherwise
    Bare(String),
    Named {
        name: String,
        ty: TypeExpr,
        variadic: bool,
    },
    Unnamed {
        ty: TypeExpr,
        variadic: bool,
    },
}

pub struct Parser {
    tokens: Vec<Token>,
    next: usize,
    path: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(path: impl Into<PathBuf>, mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.typ) != Some(TT::EOF) {
            tokens.push(Token {
                typ: TT::EOF,
                loc: tokens.last().map(|t| t.loc).unwrap_or_default(),
                text: String::new(),
            });
        }
        Self {
            tokens,
            next: 0,
            path: path.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Token buffer

    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.next + n).min(last)]
    }

    fn peek(&self) -> &Token {
        self.peek_nth(0)
    }

    fn peek_typ(&self) -> TT {
        self.peek().typ
    }

    fn consume(&mut self) -> Token {
        let token = self.peek().clone();
        if token.typ != TT::EOF {
            self.next += 1;
        }
        token
    }

    fn consume_if(&mut self, typ: TT) -> bool {
        if self.peek_typ() == typ {
            self.consume();
            true
        } else {
            false
        }
    }

    fn error(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        let found = match token.typ {
            TT::EOF => "end of file".to_string(),
            TT::AutoSemicolon => "newline".to_string(),
            _ => format!("{:?}", token.text),
        };
        SyntaxError::new(token.loc, format!("expected {}, found {}", expected, found))
    }

    fn require(&mut self, typ: TT, expected: &str) -> SyntaxResult<Token> {
        if self.peek_typ() == typ {
            Ok(self.consume())
        } else {
            Err(self.error(expected))
        }
    }

    fn require_ident(&mut self) -> SyntaxResult<String> {
        Ok(self.require(TT::Ident, "identifier")?.text)
    }

    fn skip_semicolons(&mut self) {
        while self.peek_typ().is_semicolon() {
            self.consume();
        }
    }

    /// A statement ends at a semicolon or right before a closing delimiter
    fn end_statement(&mut self) -> SyntaxResult<()> {
        match self.peek_typ() {
            typ if typ.is_semicolon() => {
                self.consume();
                Ok(())
            }
            TT::ParenClose | TT::BraceClose | TT::EOF => Ok(()),
            _ => Err(self.error("end of statement")),
        }
    }

    fn diagnose(&mut self, error: SyntaxError) {
        trace!("{}:{}: recovered: {}", self.path.display(), error.loc, error.message);
        self.diagnostics.push(Diagnostic {
            file: self.path.clone(),
            loc: error.loc,
            message: error.message,
        });
    }

    /// Skip a balanced `open ... close` run, delimiters included
    fn skip_balanced(&mut self, open: TT, close: TT) -> SyntaxResult<()> {
        let start = self.require(open, "opening delimiter")?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek_typ() {
                TT::EOF => return Err(SyntaxError::new(start.loc, "unbalanced delimiter")),
                typ if typ == open => depth += 1,
                typ if typ == close => depth -= 1,
                _ => {}
            }
            self.consume();
        }
        Ok(())
    }

    /// Skip to the end of the current statement without interpreting it. Stops before the
    /// brace that closes the enclosing block.
    fn skip_statement(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek_typ() {
                TT::EOF => return,
                TT::ParenOpen | TT::BracketOpen | TT::BraceOpen => depth += 1,
                TT::BraceClose if depth == 0 => return,
                TT::ParenClose | TT::BracketClose | TT::BraceClose => {
                    depth = depth.saturating_sub(1);
                }
                typ if typ.is_semicolon() && depth == 0 => {
                    self.consume();
                    return;
                }
                _ => {}
            }
            self.consume();
        }
    }

    // Source file

    pub fn parse_file(mut self) -> SyntaxResult<ParsedFile> {
        self.skip_semicolons();
        self.require(TT::Package, "package clause")?;
        let package = self.require_ident()?;
        self.end_statement()?;

        let mut unit = SourceUnit::new(self.path.clone(), package);
        loop {
            self.skip_semicolons();
            if self.peek_typ() == TT::EOF {
                break;
            }
            let start = self.next;
            let parsed = if self.peek_typ() == TT::Import {
                self.import_decl().map(|imports| unit.imports.extend(imports))
            } else {
                self.top_level_decl().map(|decls| unit.decls.extend(decls))
            };
            if let Err(error) = parsed {
                self.diagnose(error);
                self.synchronize(start);
            }
        }

        trace!(
            "{}: parsed {} declarations, {} diagnostics",
            self.path.display(),
            unit.decls.len(),
            self.diagnostics.len()
        );
        Ok(ParsedFile {
            unit,
            diagnostics: self.diagnostics,
        })
    }

    /// Advance to the next declaration keyword that starts a line, past `start`
    fn synchronize(&mut self, start: usize) {
        if self.next == start {
            self.consume();
        }
        while self.peek_typ() != TT::EOF {
            let token = self.peek();
            let line_start = self.next == 0 || self.tokens[self.next - 1].typ.is_semicolon();
            if token.typ.starts_declaration() && token.loc.column == 1 && line_start {
                return;
            }
            self.consume();
        }
    }

    fn import_decl(&mut self) -> SyntaxResult<Vec<ImportSpec>> {
        self.require(TT::Import, "import")?;
        let mut imports = Vec::new();
        if self.consume_if(TT::ParenOpen) {
            loop {
                self.skip_semicolons();
                if self.consume_if(TT::ParenClose) {
                    break;
                }
                imports.push(self.import_spec()?);
                self.end_statement()?;
            }
        } else {
            imports.push(self.import_spec()?);
        }
        self.end_statement()?;
        Ok(imports)
    }

    fn import_spec(&mut self) -> SyntaxResult<ImportSpec> {
        let alias = match self.peek_typ() {
            TT::Ident | TT::Dot => Some(self.consume().text),
            _ => None,
        };
        let raw = self.require(TT::LiteralString, "import path")?;
        let path = busgen_core::syntax::unquote(&raw.text)
            .ok_or_else(|| SyntaxError::new(raw.loc, "malformed import path"))?;
        Ok(ImportSpec { alias, path })
    }

    fn top_level_decl(&mut self) -> SyntaxResult<Vec<Decl>> {
        match self.peek_typ() {
            TT::Const => Ok(self.value_decl(TT::Const)?.into_iter().map(Decl::Const).collect()),
            TT::Var => Ok(self.value_decl(TT::Var)?.into_iter().map(Decl::Var).collect()),
            TT::Type => Ok(self.type_decl()?.into_iter().map(Decl::Type).collect()),
            TT::Func => Ok(vec![Decl::Func(self.func_decl()?)]),
            _ => Err(self.error("declaration")),
        }
    }

    // Declarations

    fn value_decl(&mut self, keyword: TT) -> SyntaxResult<Vec<ValueSpec>> {
        self.require(keyword, "declaration keyword")?;
        let mut specs = Vec::new();
        if self.consume_if(TT::ParenOpen) {
            loop {
                self.skip_semicolons();
                if self.consume_if(TT::ParenClose) {
                    break;
                }
                specs.push(self.value_spec()?);
                self.end_statement()?;
            }
        } else {
            specs.push(self.value_spec()?);
        }
        self.end_statement()?;
        Ok(specs)
    }

    fn value_spec(&mut self) -> SyntaxResult<ValueSpec> {
        let names = self.ident_list()?;
        let ty = match self.peek_typ() {
            TT::Equals | TT::ParenClose | TT::Semicolon | TT::AutoSemicolon => None,
            _ => Some(self.parse_type()?),
        };
        let values = if self.consume_if(TT::Equals) {
            self.expr_list()?
        } else {
            Vec::new()
        };
        Ok(ValueSpec { names, ty, values })
    }

    fn type_decl(&mut self) -> SyntaxResult<Vec<TypeSpec>> {
        self.require(TT::Type, "type")?;
        let mut specs = Vec::new();
        if self.consume_if(TT::ParenOpen) {
            loop {
                self.skip_semicolons();
                if self.consume_if(TT::ParenClose) {
                    break;
                }
                specs.push(self.type_spec()?);
                self.end_statement()?;
            }
        } else {
            specs.push(self.type_spec()?);
        }
        self.end_statement()?;
        Ok(specs)
    }

    fn type_spec(&mut self) -> SyntaxResult<TypeSpec> {
        let name = self.require_ident()?;
        // `type List[T any]` declares parameters; `type Buf [N]byte` is an array
        if self.peek_typ() == TT::BracketOpen
            && self.peek_nth(1).typ == TT::Ident
            && self.peek_nth(2).typ != TT::BracketClose
        {
            self.skip_balanced(TT::BracketOpen, TT::BracketClose)?;
        }
        let alias = self.consume_if(TT::Equals);
        let ty = self.parse_type()?;
        Ok(TypeSpec { name, alias, ty })
    }

    fn func_decl(&mut self) -> SyntaxResult<FuncDecl> {
        self.require(TT::Func, "func")?;
        let receiver = if self.peek_typ() == TT::ParenOpen {
            let mut params = self.parameters()?;
            if params.len() != 1 {
                return Err(self.error("exactly one receiver"));
            }
            params.pop()
        } else {
            None
        };
        let name = self.require_ident()?;
        if self.peek_typ() == TT::BracketOpen {
            self.skip_balanced(TT::BracketOpen, TT::BracketClose)?;
        }
        let (params, results) = self.signature()?;
        let body = if self.peek_typ() == TT::BraceOpen {
            Some(self.block()?)
        } else {
            None
        };
        self.end_statement()?;
        Ok(FuncDecl {
            name,
            receiver,
            params,
            results,
            body,
        })
    }

    fn ident_list(&mut self) -> SyntaxResult<Vec<String>> {
        let mut names = vec![self.require_ident()?];
        while self.consume_if(TT::Comma) {
            names.push(self.require_ident()?);
        }
        Ok(names)
    }

    fn signature(&mut self) -> SyntaxResult<(Vec<Param>, Vec<Param>)> {
        let params = self.parameters()?;
        let results = if self.peek_typ() == TT::ParenOpen {
            self.parameters()?
        } else if starts_type(self.peek_typ()) {
            vec![Param::new(None, self.parse_type()?)]
        } else {
            Vec::new()
        };
        Ok((params, results))
    }

    fn parameters(&mut self) -> SyntaxResult<Vec<Param>> {
        self.require(TT::ParenOpen, "(")?;
        let mut entries = Vec::new();
        while self.peek_typ() != TT::ParenClose {
            entries.push(self.param_entry()?);
            if !self.consume_if(TT::Comma) {
                break;
            }
        }
        self.require(TT::ParenClose, ")")?;

        let named = entries.iter().any(|e| matches!(e, ParamEntry::Named { .. }));
        let mut params = Vec::with_capacity(entries.len());
        if !named {
            for entry in entries {
                params.push(match entry {
                    ParamEntry::Bare(name) => Param::new(None, TypeExpr::Name(name)),
                    ParamEntry::Unnamed { ty, variadic } | ParamEntry::Named { ty, variadic, .. } => {
                        Param { name: None, ty, variadic }
                    }
                });
            }
            return Ok(params);
        }

        // `a, b int` shares one type between several names
        let mut pending: Vec<String> = Vec::new();
        for entry in entries {
            match entry {
                ParamEntry::Bare(name) => pending.push(name),
                ParamEntry::Named { name, ty, variadic } => {
                    for shared in pending.drain(..) {
                        params.push(Param {
                            name: Some(shared),
                            ty: ty.clone(),
                            variadic,
                        });
                    }
                    params.push(Param {
                        name: Some(name),
                        ty,
                        variadic,
                    });
                }
                ParamEntry::Unnamed { .. } => {
                    return Err(self.error("parameter name"));
                }
            }
        }
        if !pending.is_empty() {
            return Err(self.error("parameter type"));
        }
        Ok(params)
    }

    fn param_entry(&mut self) -> SyntaxResult<ParamEntry> {
        match self.peek_typ() {
            TT::Ellipsis => {
                self.consume();
                Ok(ParamEntry::Unnamed {
                    ty: self.parse_type()?,
                    variadic: true,
                })
            }
            TT::Ident => match self.peek_nth(1).typ {
                TT::Comma | TT::ParenClose => Ok(ParamEntry::Bare(self.consume().text)),
                TT::Dot => Ok(ParamEntry::Unnamed {
                    ty: self.parse_type()?,
                    variadic: false,
                }),
                next if next == TT::Ellipsis || starts_type(next) || next == TT::ParenOpen => {
                    let name = self.consume().text;
                    let variadic = self.consume_if(TT::Ellipsis);
                    Ok(ParamEntry::Named {
                        name,
                        ty: self.parse_type()?,
                        variadic,
                    })
                }
                _ => Err(self.error("parameter")),
            },
            _ => Ok(ParamEntry::Unnamed {
                ty: self.parse_type()?,
                variadic: false,
            }),
        }
    }

    // Types

    pub fn parse_type(&mut self) -> SyntaxResult<TypeExpr> {
        match self.peek_typ() {
            TT::Ident => {
                let name = self.consume().text;
                let base = if self.consume_if(TT::Dot) {
                    TypeExpr::Qualified {
                        package: name,
                        name: self.require_ident()?,
                    }
                } else {
                    TypeExpr::Name(name)
                };
                if self.consume_if(TT::BracketOpen) {
                    let mut args = vec![self.parse_type()?];
                    while self.consume_if(TT::Comma) {
                        if self.peek_typ() == TT::BracketClose {
                            break;
                        }
                        args.push(self.parse_type()?);
                    }
                    self.require(TT::BracketClose, "]")?;
                    return Ok(TypeExpr::Generic {
                        base: Box::new(base),
                        args,
                    });
                }
                Ok(base)
            }
            TT::Asterisk => {
                self.consume();
                Ok(TypeExpr::pointer_to(self.parse_type()?))
            }
            TT::BracketOpen => {
                self.consume();
                if self.consume_if(TT::BracketClose) {
                    return Ok(TypeExpr::slice_of(self.parse_type()?));
                }
                let len = self.array_length()?;
                Ok(TypeExpr::Array {
                    len,
                    elem: Box::new(self.parse_type()?),
                })
            }
            TT::Map => {
                self.consume();
                self.require(TT::BracketOpen, "[")?;
                let key = self.parse_type()?;
                self.require(TT::BracketClose, "]")?;
                Ok(TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(self.parse_type()?),
                })
            }
            TT::Chan => {
                self.consume();
                let dir = if self.consume_if(TT::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                Ok(TypeExpr::Chan {
                    dir,
                    elem: Box::new(self.parse_type()?),
                })
            }
            TT::Arrow => {
                self.consume();
                self.require(TT::Chan, "chan")?;
                Ok(TypeExpr::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(self.parse_type()?),
                })
            }
            TT::Func => {
                self.consume();
                let (params, results) = self.signature()?;
                Ok(TypeExpr::Func { params, results })
            }
            TT::Struct => self.struct_type(),
            TT::Interface => self.interface_type(),
            TT::ParenOpen => {
                self.consume();
                let ty = self.parse_type()?;
                self.require(TT::ParenClose, ")")?;
                Ok(ty)
            }
            _ => Err(self.error("type")),
        }
    }

    /// Source text of an array length, up to and including the closing bracket
    fn array_length(&mut self) -> SyntaxResult<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        loop {
            let token = self.consume();
            match token.typ {
                TT::EOF => return Err(SyntaxError::new(token.loc, "unterminated array length")),
                TT::BracketOpen => depth += 1,
                TT::BracketClose if depth == 0 => return Ok(text),
                TT::BracketClose => depth -= 1,
                _ => {}
            }
            text.push_str(&token.text);
        }
    }

    fn struct_type(&mut self) -> SyntaxResult<TypeExpr> {
        self.require(TT::Struct, "struct")?;
        self.require(TT::BraceOpen, "{")?;
        let mut fields = Vec::new();
        loop {
            self.skip_semicolons();
            if self.consume_if(TT::BraceClose) {
                break;
            }
            fields.push(self.field_decl()?);
            self.end_statement()?;
        }
        Ok(TypeExpr::Struct(fields))
    }

    fn field_decl(&mut self) -> SyntaxResult<FieldDecl> {
        let embedded = match self.peek_typ() {
            TT::Asterisk => true,
            TT::Ident => {
                let next = self.peek_nth(1).typ;
                next.is_semicolon() || matches!(next, TT::BraceClose | TT::LiteralString | TT::Dot)
            }
            _ => false,
        };
        let (names, ty) = if embedded {
            (Vec::new(), self.parse_type()?)
        } else {
            let names = self.ident_list()?;
            (names, self.parse_type()?)
        };
        let tag = match self.peek_typ() {
            TT::LiteralString => Some(self.consume().text),
            _ => None,
        };
        Ok(FieldDecl { names, ty, tag })
    }

    fn interface_type(&mut self) -> SyntaxResult<TypeExpr> {
        self.require(TT::Interface, "interface")?;
        self.require(TT::BraceOpen, "{")?;
        let mut elems = Vec::new();
        loop {
            self.skip_semicolons();
            if self.consume_if(TT::BraceClose) {
                break;
            }
            if self.peek_typ() == TT::Ident && self.peek_nth(1).typ == TT::ParenOpen {
                let name = self.consume().text;
                let (params, results) = self.signature()?;
                elems.push(InterfaceElem::Method {
                    name,
                    params,
                    results,
                });
            } else {
                // Embedded interface or type-set union; only the first term is kept
                self.consume_if(TT::Tilde);
                let ty = self.parse_type()?;
                while self.consume_if(TT::Bar) {
                    self.consume_if(TT::Tilde);
                    self.parse_type()?;
                }
                elems.push(InterfaceElem::Embedded(ty));
            }
            self.end_statement()?;
        }
        Ok(TypeExpr::Interface(elems))
    }

    // Statements

    fn block(&mut self) -> SyntaxResult<Block> {
        self.require(TT::BraceOpen, "{")?;
        let mut stmts = Vec::new();
        loop {
            self.skip_semicolons();
            match self.peek_typ() {
                TT::BraceClose => {
                    self.consume();
                    return Ok(Block { stmts });
                }
                TT::EOF => return Err(self.error("}")),
                _ => {}
            }
            let start = self.next;
            if let Err(error) = self.statement(&mut stmts) {
                self.diagnose(error);
                self.next = start;
                self.skip_statement();
                if self.next == start {
                    self.consume();
                }
                stmts.push(Stmt::Other);
            }
        }
    }

    fn statement(&mut self, out: &mut Vec<Stmt>) -> SyntaxResult<()> {
        match self.peek_typ() {
            TT::Var => out.extend(self.value_decl(TT::Var)?.into_iter().map(Stmt::Var)),
            TT::Const => out.extend(self.value_decl(TT::Const)?.into_iter().map(Stmt::Const)),
            TT::Return => {
                self.consume();
                let results = match self.peek_typ() {
                    typ if typ.is_semicolon() => Vec::new(),
                    TT::BraceClose => Vec::new(),
                    _ => self.expr_list()?,
                };
                self.end_statement()?;
                out.push(Stmt::Return(results));
            }
            TT::If | TT::For | TT::Switch | TT::Select => {
                self.skip_compound()?;
                out.push(Stmt::Other);
            }
            TT::Go
            | TT::Defer
            | TT::Goto
            | TT::Break
            | TT::Continue
            | TT::Fallthrough
            | TT::Type
            | TT::BraceOpen => {
                self.skip_statement();
                out.push(Stmt::Other);
            }
            TT::Ident if self.peek_nth(1).typ == TT::Colon => {
                // The label belongs to the statement that follows it
                self.consume();
                self.consume();
                self.skip_semicolons();
                if self.peek_typ() == TT::BraceClose {
                    out.push(Stmt::Other);
                } else {
                    self.statement(out)?;
                }
            }
            _ => out.push(self.simple_statement()?),
        }
        Ok(())
    }

    /// Skip `if`, `for`, `switch` and `select`, whose headers may hold explicit semicolons,
    /// together with any `else` chain
    fn skip_compound(&mut self) -> SyntaxResult<()> {
        loop {
            self.consume();
            let mut depth = 0usize;
            loop {
                match self.peek_typ() {
                    TT::EOF => return Err(self.error("block")),
                    TT::BraceOpen if depth == 0 => break,
                    TT::ParenOpen | TT::BracketOpen | TT::BraceOpen => depth += 1,
                    TT::ParenClose | TT::BracketClose | TT::BraceClose => {
                        depth = depth.saturating_sub(1)
                    }
                    _ => {}
                }
                self.consume();
            }
            self.skip_balanced(TT::BraceOpen, TT::BraceClose)?;
            if !self.consume_if(TT::Else) {
                break;
            }
            if self.peek_typ() != TT::If {
                self.skip_balanced(TT::BraceOpen, TT::BraceClose)?;
                break;
            }
        }
        self.end_statement()
    }

    fn simple_statement(&mut self) -> SyntaxResult<Stmt> {
        let mut lhs = self.expr_list()?;
        let stmt = match self.peek_typ() {
            TT::ColonEquals | TT::Equals | TT::OpAssign => {
                let define = self.consume().typ == TT::ColonEquals;
                let rhs = self.expr_list()?;
                Stmt::Assign { lhs, rhs, define }
            }
            TT::PlusPlus | TT::MinusMinus => {
                self.consume();
                Stmt::Other
            }
            TT::Arrow => {
                self.consume();
                self.expr()?;
                Stmt::Other
            }
            _ if lhs.len() == 1 => Stmt::Expr(lhs.remove(0)),
            _ => return Err(self.error("assignment")),
        };
        self.end_statement()?;
        Ok(stmt)
    }

    // Expressions

    fn expr_list(&mut self) -> SyntaxResult<Vec<Expr>> {
        let mut exprs = vec![self.expr()?];
        while self.consume_if(TT::Comma) {
            exprs.push(self.expr()?);
        }
        Ok(exprs)
    }

    pub fn expr(&mut self) -> SyntaxResult<Expr> {
        self.binary(1)
    }

    fn binary(&mut self, min_precedence: u8) -> SyntaxResult<Expr> {
        let mut lhs = self.unary()?;
        while let Some(precedence) = self.peek_typ().precedence() {
            if precedence < min_precedence {
                break;
            }
            let op = self.consume().text;
            let rhs = self.binary(precedence + 1)?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> SyntaxResult<Expr> {
        let op = match self.peek_typ() {
            TT::Ampersand => UnaryOp::AddressOf,
            TT::Asterisk => UnaryOp::Deref,
            TT::Minus => UnaryOp::Neg,
            TT::Plus => UnaryOp::Plus,
            TT::Exclamation => UnaryOp::Not,
            TT::Caret => UnaryOp::Complement,
            TT::Arrow if self.peek_nth(1).typ != TT::Chan => UnaryOp::Receive,
            _ => return self.primary(),
        };
        self.consume();
        Ok(Expr::Unary {
            op,
            operand: Box::new(self.unary()?),
        })
    }

    fn primary(&mut self) -> SyntaxResult<Expr> {
        let mut expr = self.operand()?;
        loop {
            match self.peek_typ() {
                TT::Dot => {
                    self.consume();
                    if self.consume_if(TT::ParenOpen) {
                        // Type assertion or type switch guard
                        if !self.consume_if(TT::Type) {
                            self.parse_type()?;
                        }
                        self.require(TT::ParenClose, ")")?;
                        expr = Expr::Unknown;
                    } else {
                        expr = Expr::Selector {
                            base: Box::new(expr),
                            member: self.require_ident()?,
                        };
                    }
                }
                TT::ParenOpen => {
                    let args = self.call_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                TT::BracketOpen => {
                    // Index, slice or explicit instantiation
                    self.skip_balanced(TT::BracketOpen, TT::BracketClose)?;
                    expr = Expr::Unknown;
                }
                TT::BraceOpen => match composite_type(&expr) {
                    Some(ty) => {
                        self.skip_balanced(TT::BraceOpen, TT::BraceClose)?;
                        expr = Expr::Composite { ty };
                    }
                    None => break,
                },
                _ => break,
            }
        }
        Ok(expr)
    }

    fn operand(&mut self) -> SyntaxResult<Expr> {
        let kind = match self.peek_typ() {
            TT::LiteralInt => Some(LitKind::Int),
            TT::LiteralFloat => Some(LitKind::Float),
            TT::LiteralImag => Some(LitKind::Imag),
            TT::LiteralChar => Some(LitKind::Char),
            TT::LiteralString => Some(LitKind::String),
            _ => None,
        };
        if let Some(kind) = kind {
            let raw = self.consume().text;
            return Ok(Expr::Lit(Literal { kind, raw }));
        }

        match self.peek_typ() {
            TT::Ident => Ok(Expr::Ident(self.consume().text)),
            TT::ParenOpen => {
                self.consume();
                let inner = self.expr()?;
                self.require(TT::ParenClose, ")")?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            TT::Func => {
                self.consume();
                self.signature()?;
                if self.peek_typ() == TT::BraceOpen {
                    self.skip_balanced(TT::BraceOpen, TT::BraceClose)?;
                }
                Ok(Expr::Unknown)
            }
            TT::BracketOpen | TT::Map | TT::Struct | TT::Chan | TT::Interface | TT::Arrow => {
                let ty = self.parse_type()?;
                if self.peek_typ() == TT::BraceOpen {
                    self.skip_balanced(TT::BraceOpen, TT::BraceClose)?;
                    return Ok(Expr::Composite { ty });
                }
                Ok(Expr::Unknown)
            }
            _ => Err(self.error("expression")),
        }
    }

    fn call_args(&mut self) -> SyntaxResult<Vec<Expr>> {
        self.require(TT::ParenOpen, "(")?;
        let mut args = Vec::new();
        while self.peek_typ() != TT::ParenClose {
            args.push(self.expr()?);
            self.consume_if(TT::Ellipsis);
            if !self.consume_if(TT::Comma) {
                break;
            }
        }
        self.require(TT::ParenClose, ")")?;
        Ok(args)
    }
}

fn starts_type(typ: TT) -> bool {
    matches!(
        typ,
        TT::Ident
            | TT::Asterisk
            | TT::BracketOpen
            | TT::Map
            | TT::Chan
            | TT::Func
            | TT::Struct
            | TT::Interface
            | TT::Arrow
    )
}

/// Type named by the operand of a composite literal
fn composite_type(expr: &Expr) -> Option<TypeExpr> {
    match expr {
        Expr::Ident(name) => Some(TypeExpr::Name(name.clone())),
        Expr::Selector { base, member } => match base.as_ref() {
            Expr::Ident(package) => Some(TypeExpr::Qualified {
                package: package.clone(),
                name: member.clone(),
            }),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> ParsedFile {
        let tokens = tokenize(source).expect("lexes");
        Parser::new("test.go", tokens).parse_file().expect("parses")
    }

    fn parse_expr(source: &str) -> Expr {
        let tokens = tokenize(source).expect("lexes");
        Parser::new("test.go", tokens).expr().expect("parses")
    }

    fn parse_type(source: &str) -> TypeExpr {
        let tokens = tokenize(source).expect("lexes");
        Parser::new("test.go", tokens).parse_type().expect("parses")
    }

    #[test]
    fn test_package_and_imports() {
        let file = parse("package demo\n\nimport \"fmt\"\nimport (\n\tdbus \"github.com/godbus/dbus\"\n\t. \"strings\"\n)\n");
        assert_eq!(file.unit.package, "demo");
        assert_eq!(
            file.unit.imports,
            vec![
                ImportSpec {
                    alias: None,
                    path: "fmt".into()
                },
                ImportSpec {
                    alias: Some("dbus".into()),
                    path: "github.com/godbus/dbus".into()
                },
                ImportSpec {
                    alias: Some(".".into()),
                    path: "strings".into()
                },
            ]
        );
        assert!(file.diagnostics.is_empty());
    }

    #[test]
    fn test_grouped_values() {
        let file = parse("package demo\nconst (\n\tA = \"a\"\n\tB, C = \"b\", \"c\"\n)\nvar x, y int\n");
        assert_eq!(file.unit.decls.len(), 3);
        let Decl::Const(spec) = &file.unit.decls[1] else {
            panic!("expected const");
        };
        assert_eq!(spec.names, vec!["B".to_string(), "C".to_string()]);
        assert_eq!(spec.values.len(), 2);
        let Decl::Var(spec) = &file.unit.decls[2] else {
            panic!("expected var");
        };
        assert_eq!(spec.ty, Some(TypeExpr::named("int")));
        assert!(spec.values.is_empty());
    }

    #[test]
    fn test_struct_fields() {
        let file = parse(
            "package demo\ntype Foo struct {\n\t*Base\n\tproxy.Object\n\tName, Alias string `json:\"name\"`\n\tdata [4]byte\n\tsignals *struct {\n\t\tChanged struct{ value uint32 }\n\t}\n}\n",
        );
        let Decl::Type(spec) = &file.unit.decls[0] else {
            panic!("expected type");
        };
        let TypeExpr::Struct(fields) = &spec.ty else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 5);
        assert!(fields[0].names.is_empty());
        assert_eq!(fields[1].field_names(), vec!["Object".to_string()]);
        assert_eq!(fields[2].names, vec!["Name".to_string(), "Alias".to_string()]);
        assert_eq!(fields[2].tag.as_deref(), Some("`json:\"name\"`"));
        assert_eq!(
            fields[3].ty,
            TypeExpr::Array {
                len: "4".into(),
                elem: Box::new(TypeExpr::named("byte"))
            }
        );
        assert!(matches!(&fields[4].ty, TypeExpr::Pointer(inner) if matches!(inner.as_ref(), TypeExpr::Struct(_))));
    }

    #[test]
    fn test_parameter_grouping() {
        let file = parse(
            "package demo\nfunc (v *Foo) Set(a, b int, names ...string) (ok bool, err error) {}\nfunc f(int, string) error\n",
        );
        let Decl::Func(set) = &file.unit.decls[0] else {
            panic!("expected func");
        };
        assert_eq!(set.receiver_type_name(), Some("Foo"));
        let params: Vec<_> = set
            .params
            .iter()
            .map(|p| (p.name.as_deref(), p.variadic))
            .collect();
        assert_eq!(
            params,
            vec![(Some("a"), false), (Some("b"), false), (Some("names"), true)]
        );
        assert_eq!(set.results.len(), 2);

        let Decl::Func(f) = &file.unit.decls[1] else {
            panic!("expected func");
        };
        assert!(f.params.iter().all(|p| p.name.is_none()));
        assert_eq!(f.results, vec![Param::new(None, TypeExpr::named("error"))]);
        assert!(f.body.is_none());
    }

    #[test]
    fn test_body_keeps_top_level_statements() {
        let file = parse(
            "package demo\nfunc run() error {\n\tm := NewManager()\n\tif m == nil {\n\t\treturn nil\n\t}\n\tvar path = \"/org/x\"\n\terr := service.Export(path, m)\n\tfor i := 0; i < 3; i++ {\n\t}\n\treturn err\n}\n",
        );
        let Decl::Func(run) = &file.unit.decls[0] else {
            panic!("expected func");
        };
        let stmts = &run.body.as_ref().expect("body").stmts;
        assert_eq!(stmts.len(), 6);
        assert!(matches!(&stmts[0], Stmt::Assign { define: true, .. }));
        assert_eq!(stmts[1], Stmt::Other);
        assert!(matches!(&stmts[2], Stmt::Var(_)));
        let Stmt::Assign { rhs, .. } = &stmts[3] else {
            panic!("expected assignment");
        };
        assert!(matches!(&rhs[0], Expr::Call { args, .. } if args.len() == 2));
        assert_eq!(stmts[4], Stmt::Other);
        assert_eq!(stmts[5], Stmt::Return(vec![Expr::ident("err")]));
    }

    #[test]
    fn test_expressions() {
        assert_eq!(
            parse_expr("&fooImpl{name: \"x\"}"),
            Expr::address_of(Expr::Composite {
                ty: TypeExpr::named("fooImpl")
            })
        );
        assert_eq!(
            parse_expr("m.impl"),
            Expr::selector(Expr::ident("m"), "impl")
        );
        assert!(matches!(
            parse_expr("a + b*c"),
            Expr::Binary { op, rhs, .. } if op == "+" && matches!(rhs.as_ref(), Expr::Binary { .. })
        ));
        assert!(matches!(
            parse_expr("x.(*Foo).Bar"),
            Expr::Selector { base, .. } if *base == Expr::Unknown
        ));
        assert!(matches!(
            parse_expr("[]string{\"a\"}"),
            Expr::Composite { ty: TypeExpr::Slice(_) }
        ));
        assert_eq!(
            parse_expr("func() { x := 1 }"),
            Expr::Unknown
        );
    }

    #[test]
    fn test_types() {
        assert_eq!(
            parse_type("map[string]func(int) error"),
            TypeExpr::Map {
                key: Box::new(TypeExpr::named("string")),
                value: Box::new(TypeExpr::Func {
                    params: vec![Param::new(None, TypeExpr::named("int"))],
                    results: vec![Param::new(None, TypeExpr::named("error"))],
                }),
            }
        );
        assert_eq!(
            parse_type("<-chan dbus.Sender"),
            TypeExpr::Chan {
                dir: ChanDir::Recv,
                elem: Box::new(TypeExpr::Qualified {
                    package: "dbus".into(),
                    name: "Sender".into()
                }),
            }
        );
        assert!(matches!(parse_type("List[int]"), TypeExpr::Generic { .. }));
    }

    #[test]
    fn test_recovers_from_bad_declaration() {
        let file = parse(
            "package demo\nconst A = \"a\"\nfunc broken( {\n}\ntype Foo struct{}\nconst B = \"b\"\n",
        );
        assert_eq!(file.diagnostics.len(), 1);
        let names: Vec<_> = file
            .unit
            .decls
            .iter()
            .map(|decl| match decl {
                Decl::Const(spec) => spec.names[0].clone(),
                Decl::Type(spec) => spec.name.clone(),
                Decl::Var(_) | Decl::Func(_) => String::new(),
            })
            .collect();
        assert_eq!(names, vec!["A".to_string(), "Foo".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_recovers_from_bad_statement() {
        let file = parse("package demo\nfunc run() {\n\tx := )\n\ty := 2\n}\n");
        assert_eq!(file.diagnostics.len(), 1);
        let Decl::Func(run) = &file.unit.decls[0] else {
            panic!("expected func");
        };
        let stmts = &run.body.as_ref().expect("body").stmts;
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], Stmt::Other);
    }

    #[test]
    fn test_missing_package_clause_fails() {
        let tokens = tokenize("func f() {}\n").expect("lexes");
        assert!(Parser::new("test.go", tokens).parse_file().is_err());
    }
}
