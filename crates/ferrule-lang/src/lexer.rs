//! Lexer
//!
//! Turns source text into the flat token stream consumed by the parser.
//! The stream always ends with a single `Eof` token.

use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};
use crate::types::PrimitiveType;

pub struct Lexer<'a> {
    chars: std::str::Chars<'a>,
    current: Option<char>,
    line: u64,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer from source code
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Lexer {
            chars,
            current,
            line: 1,
        }
    }

    /// Tokenize the whole input. The first lexical error is reported to `sink`
    /// and returned.
    pub fn tokenize(mut self, sink: &mut dyn DiagnosticSink) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = match self.next_token() {
                Ok(token) => token,
                Err(err) => {
                    sink.report(Severity::Error, &err.message(), err.line());
                    return Err(err);
                }
            };
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let line = self.line;

        let Some(c) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, "", line));
        };

        let token = match c {
            '(' => Token::new(TokenKind::LParen, "(", line),
            ')' => Token::new(TokenKind::RParen, ")", line),
            '{' => Token::new(TokenKind::LBrace, "{", line),
            '}' => Token::new(TokenKind::RBrace, "}", line),
            ';' => Token::new(TokenKind::Semicolon, ";", line),
            ':' => Token::new(TokenKind::Colon, ":", line),
            ',' => Token::new(TokenKind::Comma, ",", line),
            '+' => Token::new(TokenKind::Plus, "+", line),
            '*' => Token::new(TokenKind::Star, "*", line),
            '/' => Token::new(TokenKind::Slash, "/", line),
            '%' => Token::new(TokenKind::Percent, "%", line),
            '-' => {
                if self.eat('>') {
                    Token::new(TokenKind::Arrow, "->", line)
                } else {
                    Token::new(TokenKind::Minus, "-", line)
                }
            }
            '=' => {
                if self.eat('=') {
                    Token::new(TokenKind::EqualEqual, "==", line)
                } else {
                    Token::new(TokenKind::Equals, "=", line)
                }
            }
            '.' => {
                if self.eat('.') && self.eat('.') {
                    Token::new(TokenKind::Ellipsis, "...", line)
                } else {
                    return Err(Error::lexical("invalid symbol '.'", line));
                }
            }
            '"' => self.read_string(line)?,
            c if c.is_ascii_digit() => self.read_number(c, line)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_word(c, line),
            c => {
                return Err(Error::lexical(
                    format!("unexpected character '{}'", c.escape_default()),
                    line,
                ));
            }
        };
        Ok(token)
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let prev = self.current;
        if prev == Some('\n') {
            self.line += 1;
        }
        self.current = self.chars.next();
        prev
    }

    fn peek_char(&self) -> Option<char> {
        self.current
    }

    fn peek_char2(&self) -> Option<char> {
        self.chars.clone().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.current == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match (self.peek_char(), self.peek_char2()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let start = self.line;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.peek_char() == Some('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(Error::lexical("unterminated block comment", start));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_word(&mut self, first: char, line: u64) -> Token {
        let mut word = String::new();
        word.push(first);
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let kind = match word.as_str() {
            "return" => TokenKind::Return,
            "let" => TokenKind::Let,
            "fn" => TokenKind::Fn,
            "extern" => TokenKind::Extern,
            _ => match PrimitiveType::from_keyword(&word) {
                Some(ty) => return Token::typed(TokenKind::BuiltinType, word, line, ty),
                None => TokenKind::Ident,
            },
        };
        Token::new(kind, word, line)
    }

    /// Integer or float literal; a `.` must be followed by at least one digit.
    fn read_number(&mut self, first: char, line: u64) -> Result<Token> {
        let mut text = String::new();
        text.push(first);
        self.read_digits(&mut text);

        if self.peek_char() != Some('.') || self.peek_char2() == Some('.') {
            return Ok(Token::new(TokenKind::IntLiteral, text, line));
        }
        self.advance();
        text.push('.');
        if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            return Err(Error::lexical(
                format!("float literal '{}' needs a digit after '.'", text),
                line,
            ));
        }
        self.read_digits(&mut text);
        Ok(Token::new(TokenKind::FloatLiteral, text, line))
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// String literal on a single line. The lexeme holds the decoded contents.
    fn read_string(&mut self, line: u64) -> Result<Token> {
        let mut contents = String::new();
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some(c) if c != '\n' => {
                            return Err(Error::lexical(
                                format!("unknown escape sequence '\\{}'", c.escape_default()),
                                line,
                            ));
                        }
                        _ => return Err(Error::lexical("unterminated string literal", line)),
                    };
                    contents.push(escaped);
                }
                Some('\n') | None => {
                    return Err(Error::lexical("unterminated string literal", line));
                }
                Some(c) => contents.push(c),
            }
        }
        Ok(Token::typed(
            TokenKind::StringLiteral,
            contents,
            line,
            PrimitiveType::Str,
        ))
    }
}
