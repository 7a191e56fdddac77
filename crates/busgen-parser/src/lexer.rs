//! Go tokenizer
//!
//! Produces the whole token stream up front, with semicolons inserted at line ends the way
//! Go defines them. Comments are dropped. A newline inside a block comment
//! counts as a line end.

use crate::error::{SyntaxError, SyntaxResult};
use crate::token::{Loc, Token, TT};

/// Longest operators first so that prefixes never shadow them
const OPERATORS: &[(&str, TT)] = &[
    ("<<=", TT::OpAssign),
    (">>=", TT::OpAssign),
    ("&^=", TT::OpAssign),
    ("...", TT::Ellipsis),
    ("&&", TT::AmpersandAmpersand),
    ("||", TT::BarBar),
    ("<-", TT::Arrow),
    ("++", TT::PlusPlus),
    ("--", TT::MinusMinus),
    ("==", TT::EqualsEquals),
    ("!=", TT::ExclamationEquals),
    ("<=", TT::ChevronLeftEquals),
    (">=", TT::ChevronRightEquals),
    (":=", TT::ColonEquals),
    ("<<", TT::ChevronLeftChevronLeft),
    (">>", TT::ChevronRightChevronRight),
    ("&^", TT::AmpersandCaret),
    ("+=", TT::OpAssign),
    ("-=", TT::OpAssign),
    ("*=", TT::OpAssign),
    ("/=", TT::OpAssign),
    ("%=", TT::OpAssign),
    ("&=", TT::OpAssign),
    ("|=", TT::OpAssign),
    ("^=", TT::OpAssign),
    ("+", TT::Plus),
    ("-", TT::Minus),
    ("*", TT::Asterisk),
    ("/", TT::Slash),
    ("%", TT::Percent),
    ("&", TT::Ampersand),
    ("|", TT::Bar),
    ("^", TT::Caret),
    ("~", TT::Tilde),
    ("!", TT::Exclamation),
    ("<", TT::ChevronLeft),
    (">", TT::ChevronRight),
    ("=", TT::Equals),
    (":", TT::Colon),
    (",", TT::Comma),
    (";", TT::Semicolon),
    (".", TT::Dot),
    ("(", TT::ParenOpen),
    (")", TT::ParenClose),
    ("[", TT::BracketOpen),
    ("]", TT::BracketClose),
    ("{", TT::BraceOpen),
    ("}", TT::BraceClose),
];

pub struct Lexer {
    chars: Vec<char>,
    next: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            next: 0,
            line: 1,
            column: 1,
        }
    }

    fn loc(&self) -> Loc {
        Loc {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.next + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.next += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    pub fn tokenize(mut self) -> SyntaxResult<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let line_end_loc = self.loc();
            let crossed_newline = self.skip_trivia()?;
            let at_end = self.peek().is_none();
            if crossed_newline || at_end {
                if let Some(last) = tokens.last() {
                    if last.typ.ends_statement() {
                        tokens.push(Token {
                            typ: TT::AutoSemicolon,
                            loc: line_end_loc,
                            text: String::new(),
                        });
                    }
                }
            }
            if at_end {
                tokens.push(Token {
                    typ: TT::EOF,
                    loc: self.loc(),
                    text: String::new(),
                });
                return Ok(tokens);
            }
            tokens.push(self.token()?);
        }
    }

    /// Skip whitespace and comments. Returns whether a line end was crossed.
    fn skip_trivia(&mut self) -> SyntaxResult<bool> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some('\n') => {
                    newline = true;
                    self.bump();
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.loc();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(SyntaxError::new(start, "comment not terminated")),
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some('\n') => newline = true,
                            Some(_) => {}
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    fn token(&mut self) -> SyntaxResult<Token> {
        let loc = self.loc();
        let Some(c) = self.peek() else {
            return Err(SyntaxError::new(loc, "unexpected end of input"));
        };

        if c.is_alphabetic() || c == '_' {
            let mut text = String::new();
            while let Some(c) = self.peek().filter(|c| c.is_alphanumeric() || *c == '_') {
                text.push(c);
                self.bump();
            }
            let typ = TT::keyword(&text).unwrap_or(TT::Ident);
            return Ok(Token { typ, loc, text });
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return Ok(self.number(loc));
        }

        match c {
            '"' => return self.interpreted_string(loc),
            '`' => return self.raw_string(loc),
            '\'' => return self.rune(loc),
            _ => {}
        }

        for (op, typ) in OPERATORS {
            if self.starts_with(op) {
                for _ in 0..op.chars().count() {
                    self.bump();
                }
                return Ok(Token {
                    typ: *typ,
                    loc,
                    text: op.to_string(),
                });
            }
        }

        Err(SyntaxError::new(loc, format!("unexpected character {:?}", c)))
    }

    fn number(&mut self, loc: Loc) -> Token {
        let hex = self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X'));
        let mut text = String::new();
        let mut float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
                let exponent = if hex {
                    matches!(c, 'p' | 'P')
                } else {
                    matches!(c, 'e' | 'E')
                };
                if exponent {
                    float = true;
                    if let Some(sign) = self.peek().filter(|s| matches!(s, '+' | '-')) {
                        text.push(sign);
                        self.bump();
                    }
                }
            } else if c == '.' && !float && !text.contains('.') {
                float = true;
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let typ = if text.ends_with('i') {
            TT::LiteralImag
        } else if float {
            TT::LiteralFloat
        } else {
            TT::LiteralInt
        };
        Token { typ, loc, text }
    }

    fn interpreted_string(&mut self, loc: Loc) -> SyntaxResult<Token> {
        self.quoted(loc, '"', TT::LiteralString, "string literal not terminated")
    }

    fn rune(&mut self, loc: Loc) -> SyntaxResult<Token> {
        self.quoted(loc, '\'', TT::LiteralChar, "rune literal not terminated")
    }

    fn quoted(&mut self, loc: Loc, quote: char, typ: TT, unterminated: &str) -> SyntaxResult<Token> {
        let mut text = String::new();
        if let Some(open) = self.bump() {
            text.push(open);
        }
        loop {
            match self.peek() {
                None | Some('\n') => return Err(SyntaxError::new(loc, unterminated)),
                Some('\\') => {
                    text.push('\\');
                    self.bump();
                    match self.bump() {
                        Some(escaped) if escaped != '\n' => text.push(escaped),
                        _ => return Err(SyntaxError::new(loc, unterminated)),
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                    if c == quote {
                        return Ok(Token { typ, loc, text });
                    }
                }
            }
        }
    }

    fn raw_string(&mut self, loc: Loc) -> SyntaxResult<Token> {
        let mut text = String::new();
        if let Some(open) = self.bump() {
            text.push(open);
        }
        loop {
            match self.bump() {
                None => return Err(SyntaxError::new(loc, "raw string literal not terminated")),
                Some('`') => {
                    text.push('`');
                    return Ok(Token {
                        typ: TT::LiteralString,
                        loc,
                        text,
                    });
                }
                Some(c) => text.push(c),
            }
        }
    }
}

/// Tokenize a whole source file
pub fn tokenize(source: &str) -> SyntaxResult<Vec<Token>> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn types(source: &str) -> Vec<TT> {
        tokenize(source)
            .expect("lexes")
            .into_iter()
            .map(|t| t.typ)
            .collect()
    }

    #[test]
    fn test_semicolon_insertion() {
        assert_eq!(
            types("x := f()\nreturn\n}\n"),
            vec![
                TT::Ident,
                TT::ColonEquals,
                TT::Ident,
                TT::ParenOpen,
                TT::ParenClose,
                TT::AutoSemicolon,
                TT::Return,
                TT::AutoSemicolon,
                TT::BraceClose,
                TT::AutoSemicolon,
                TT::EOF,
            ]
        );
        // No insertion after an operator or an opening brace
        assert_eq!(
            types("a +\nb {\n"),
            vec![
                TT::Ident,
                TT::Plus,
                TT::Ident,
                TT::BraceOpen,
                TT::EOF
            ]
        );
    }

    #[test]
    fn test_comments_and_line_ends() {
        assert_eq!(
            types("a // trailing\nb /* one\ntwo */ c"),
            vec![
                TT::Ident,
                TT::AutoSemicolon,
                TT::Ident,
                TT::AutoSemicolon,
                TT::Ident,
                TT::AutoSemicolon,
                TT::EOF,
            ]
        );
    }

    #[test]
    fn test_literals() {
        let tokens = tokenize(r#"42 0x1F 1.5e-3 .5 2i 'a' '\'' "a\"b" `raw\n`"#).expect("lexes");
        let kinds: Vec<_> = tokens.iter().map(|t| (t.typ, t.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TT::LiteralInt, "42"),
                (TT::LiteralInt, "0x1F"),
                (TT::LiteralFloat, "1.5e-3"),
                (TT::LiteralFloat, ".5"),
                (TT::LiteralImag, "2i"),
                (TT::LiteralChar, "'a'"),
                (TT::LiteralChar, "'\\''"),
                (TT::LiteralString, "\"a\\\"b\""),
                (TT::LiteralString, "`raw\\n`"),
                (TT::AutoSemicolon, ""),
                (TT::EOF, ""),
            ]
        );
    }

    #[test]
    fn test_longest_operator_wins() {
        assert_eq!(
            types("a <<= b &^ c <- d ..."),
            vec![
                TT::Ident,
                TT::OpAssign,
                TT::Ident,
                TT::AmpersandCaret,
                TT::Ident,
                TT::Arrow,
                TT::Ident,
                TT::Ellipsis,
                TT::EOF,
            ]
        );
    }

    #[test]
    fn test_locations() {
        let tokens = tokenize("package a\n\nfunc  f").expect("lexes");
        assert_eq!(tokens[0].loc, Loc { line: 1, column: 1 });
        assert_eq!(tokens[3].typ, TT::Func);
        assert_eq!(tokens[3].loc, Loc { line: 3, column: 1 });
        assert_eq!(tokens[4].loc, Loc { line: 3, column: 7 });
    }

    #[test]
    fn test_unterminated_literals_fail() {
        let err = tokenize("x := \"abc\ny").expect_err("unterminated");
        assert_eq!(err.loc, Loc { line: 1, column: 6 });
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("`open").is_err());
        assert!(tokenize("a $ b").is_err());
    }
}
