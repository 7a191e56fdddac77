use serde::Serialize;
use std::fmt;

/// Line and column of a token's first character, both 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TT {
    EOF,

    Ident,
    LiteralInt,
    LiteralFloat,
    LiteralImag,
    LiteralChar,
    LiteralString,

    // Keywords
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,

    // Punctuation
    Semicolon,
    /// Inserted at a line end rather than written
    AutoSemicolon,
    Comma,
    Dot,
    Ellipsis,
    Colon,
    ColonEquals,
    Equals,
    /// `+=`, `<<=` and the rest; the token text holds the operator
    OpAssign,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,

    // Operators
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Ampersand,
    Bar,
    Caret,
    Tilde,
    Exclamation,
    ChevronLeftChevronLeft,
    ChevronRightChevronRight,
    AmpersandCaret,
    AmpersandAmpersand,
    BarBar,
    Arrow,
    PlusPlus,
    MinusMinus,
    EqualsEquals,
    ExclamationEquals,
    ChevronLeft,
    ChevronLeftEquals,
    ChevronRight,
    ChevronRightEquals,
}

impl TT {
    pub fn keyword(word: &str) -> Option<TT> {
        Some(match word {
            "break" => TT::Break,
            "case" => TT::Case,
            "chan" => TT::Chan,
            "const" => TT::Const,
            "continue" => TT::Continue,
            "default" => TT::Default,
            "defer" => TT::Defer,
            "else" => TT::Else,
            "fallthrough" => TT::Fallthrough,
            "for" => TT::For,
            "func" => TT::Func,
            "go" => TT::Go,
            "goto" => TT::Goto,
            "if" => TT::If,
            "import" => TT::Import,
            "interface" => TT::Interface,
            "map" => TT::Map,
            "package" => TT::Package,
            "range" => TT::Range,
            "return" => TT::Return,
            "select" => TT::Select,
            "struct" => TT::Struct,
            "switch" => TT::Switch,
            "type" => TT::Type,
            "var" => TT::Var,
            _ => return None,
        })
    }

    pub fn is_semicolon(self) -> bool {
        matches!(self, TT::Semicolon | TT::AutoSemicolon)
    }

    /// A newline directly after this token ends the statement
    pub fn ends_statement(self) -> bool {
        matches!(
            self,
            TT::Ident
                | TT::LiteralInt
                | TT::LiteralFloat
                | TT::LiteralImag
                | TT::LiteralChar
                | TT::LiteralString
                | TT::Break
                | TT::Continue
                | TT::Fallthrough
                | TT::Return
                | TT::PlusPlus
                | TT::MinusMinus
                | TT::ParenClose
                | TT::BracketClose
                | TT::BraceClose
        )
    }

    /// Keywords that open a top-level declaration
    pub fn starts_declaration(self) -> bool {
        matches!(self, TT::Const | TT::Var | TT::Type | TT::Func | TT::Import)
    }

    /// Binding power of a binary operator
    pub fn precedence(self) -> Option<u8> {
        Some(match self {
            TT::BarBar => 1,
            TT::AmpersandAmpersand => 2,
            TT::EqualsEquals
            | TT::ExclamationEquals
            | TT::ChevronLeft
            | TT::ChevronLeftEquals
            | TT::ChevronRight
            | TT::ChevronRightEquals => 3,
            TT::Plus | TT::Minus | TT::Bar | TT::Caret => 4,
            TT::Asterisk
            | TT::Slash
            | TT::Percent
            | TT::ChevronLeftChevronLeft
            | TT::ChevronRightChevronRight
            | TT::Ampersand
            | TT::AmpersandCaret => 5,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub typ: TT,
    pub loc: Loc,
    /// Source text; empty for inserted semicolons and end of input
    pub text: String,
}
