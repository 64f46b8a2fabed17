//! Token model shared by the lexer and the parser.

use crate::types::PrimitiveType;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Return,
    Let,
    Fn,
    Extern,
    /// A primitive type keyword; the type is carried in `Token::literal_type`
    BuiltinType,

    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Ident,

    // Symbols
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }
    Semicolon,  // ;
    Colon,      // :
    Arrow,      // ->
    Equals,     // =
    EqualEqual, // ==
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Ellipsis,   // ...
    Comma,      // ,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Return => "'return'",
            TokenKind::Let => "'let'",
            TokenKind::Fn => "'fn'",
            TokenKind::Extern => "'extern'",
            TokenKind::BuiltinType => "a type",
            TokenKind::IntLiteral => "an integer literal",
            TokenKind::FloatLiteral => "a float literal",
            TokenKind::StringLiteral => "a string literal",
            TokenKind::Ident => "an identifier",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::Arrow => "'->'",
            TokenKind::Equals => "'='",
            TokenKind::EqualEqual => "'=='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Ellipsis => "'...'",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of input",
        };
        write!(f, "{}", s)
    }
}

/// Token structure
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u64,
    pub literal_type: Option<PrimitiveType>,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: u64) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            literal_type: None,
        }
    }

    pub fn typed(kind: TokenKind, lexeme: impl Into<String>, line: u64, ty: PrimitiveType) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            literal_type: Some(ty),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}
