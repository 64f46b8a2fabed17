//! Parser
//!
//! Recursive descent for declarations and statements, operator precedence
//! (shunting-yard) for expressions. The first error aborts the parse.

use crate::ast::*;
use crate::diagnostics::{DiagnosticSink, Severity};
use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};
use crate::types::PrimitiveType;

/// Where an expression ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExprContext {
    /// Terminated by `;`, which is consumed.
    Statement,
    /// Terminated by `,` or by a `)` that closes the enclosing call; neither is consumed.
    Argument,
}

/// Entry on the operator stack.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Paren(u64),
    Binary(ArithmeticOperator, u64),
}

pub struct Parser<'t, 's> {
    tokens: &'t [Token],
    pos: usize,
    sink: &'s mut dyn DiagnosticSink,
}

impl<'t, 's> Parser<'t, 's> {
    /// Create a parser over a token stream that ends with `Eof`.
    pub fn new(tokens: &'t [Token], sink: &'s mut dyn DiagnosticSink) -> Self {
        Parser {
            tokens,
            pos: 0,
            sink,
        }
    }

    /// Parse the whole token stream.
    pub fn parse_program(&mut self) -> Result<Program> {
        match self.tokens.last() {
            Some(last) if last.is(TokenKind::Eof) => {}
            last => {
                let line = last.map_or(0, |t| t.line);
                return self.fail("token stream does not end with an end marker", line);
            }
        }

        let mut program = Program::default();
        loop {
            let token = self.peek(0);
            match token.kind {
                TokenKind::Fn => program.functions.push(self.parse_function()?),
                TokenKind::Let => program.globals.push(self.parse_global()?),
                TokenKind::Eof => break,
                _ => {
                    return self.fail(
                        format!("expected a declaration, found {}", describe(token)),
                        token.line,
                    );
                }
            }
        }
        log::debug!(
            "parsed {} globals and {} functions",
            program.globals.len(),
            program.functions.len()
        );
        Ok(program)
    }

    fn fail<T>(&mut self, message: impl Into<String>, line: u64) -> Result<T> {
        let err = Error::syntax(message, line);
        self.sink.report(Severity::Error, &err.message(), line);
        Err(err)
    }

    // ======================================
    // Cursor
    // ======================================

    /// Look ahead `n` tokens; positions past the end yield the `Eof` token.
    fn peek(&self, n: usize) -> &'t Token {
        let tokens = self.tokens;
        let index = (self.pos + n).min(tokens.len() - 1);
        &tokens[index]
    }

    /// The most recently consumed token, used to place errors after it.
    fn previous(&self) -> &'t Token {
        let tokens = self.tokens;
        &tokens[self.pos.saturating_sub(1)]
    }

    fn advance(&mut self) -> &'t Token {
        let token = self.peek(0);
        if !token.is(TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek(0).is(kind)
    }

    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token kind, error if not found
    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<&'t Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let found = self.peek(0);
        let line = if found.is(TokenKind::Eof) {
            self.previous().line
        } else {
            found.line
        };
        self.fail(
            format!("expected {} {}, found {}", kind, context, describe(found)),
            line,
        )
    }

    // ======================================
    // Declarations
    // ======================================

    /// `fn [extern] NAME ( PARAMS ) -> TYPE ( ; | { ... } )`
    fn parse_function(&mut self) -> Result<FunctionDecl> {
        let line = self.expect(TokenKind::Fn, "to start a function")?.line;
        let is_external = self.match_token(TokenKind::Extern);
        let name = self
            .expect(TokenKind::Ident, "as the function name")?
            .lexeme
            .clone();
        self.expect(TokenKind::LParen, "after the function name")?;
        let params = self.parse_params()?;
        self.expect(TokenKind::Arrow, "before the return type")?;
        let return_type = self.parse_type()?;

        let body = if self.match_token(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::LBrace) {
            Some(self.parse_compound()?)
        } else {
            let found = self.peek(0);
            return self.fail(
                format!(
                    "expected ';' or a body after the signature of '{}', found {}",
                    name,
                    describe(found)
                ),
                found.line,
            );
        };

        Ok(FunctionDecl {
            name,
            is_external,
            params,
            return_type,
            body,
            line,
        })
    }

    /// Parameter list after `(`, including the closing `)`.
    fn parse_params(&mut self) -> Result<Vec<ParamDecl>> {
        let mut params = Vec::new();
        if self.match_token(TokenKind::RParen) {
            return Ok(params);
        }

        loop {
            if self.match_token(TokenKind::Ellipsis) {
                params.push(ParamDecl::variadic());
                self.expect(TokenKind::RParen, "after '...', which must be the last parameter")?;
                return Ok(params);
            }

            let name = self
                .expect(TokenKind::Ident, "as a parameter name")?
                .lexeme
                .clone();
            self.expect(TokenKind::Colon, "after the parameter name")?;
            let ty = self.parse_type()?;
            params.push(ParamDecl::named(name, ty));

            if self.match_token(TokenKind::Comma) {
                continue;
            }
            self.expect(TokenKind::RParen, "to close the parameter list")?;
            return Ok(params);
        }
    }

    /// A builtin type keyword with an optional `*` suffix.
    fn parse_type(&mut self) -> Result<PrimitiveType> {
        let token = self.expect(TokenKind::BuiltinType, "as a type")?;
        let Some(base) = token.literal_type else {
            return self.fail(format!("'{}' does not name a type", token.lexeme), token.line);
        };
        if !self.match_token(TokenKind::Star) {
            return Ok(base);
        }
        match base.pointer_of() {
            PrimitiveType::Invalid => {
                self.fail(format!("pointer to invalid type {}", base), token.line)
            }
            ptr => Ok(ptr),
        }
    }

    /// `let NAME : TYPE = EXPR ;` at the top level
    fn parse_global(&mut self) -> Result<GlobalDecl> {
        let (name, ty, initializer, line) = self.parse_binding()?;
        Ok(GlobalDecl {
            name,
            ty,
            initializer,
            line,
        })
    }

    /// Shared shape of global and local declarations.
    fn parse_binding(&mut self) -> Result<(String, PrimitiveType, Expr, u64)> {
        let line = self.expect(TokenKind::Let, "to start a declaration")?.line;
        let name = self
            .expect(TokenKind::Ident, "as the declared name")?
            .lexeme
            .clone();
        self.expect(TokenKind::Colon, "after the declared name")?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Equals, "before the initializer")?;
        let initializer = self.parse_expr(ExprContext::Statement)?;
        Ok((name, ty, initializer, line))
    }

    // ======================================
    // Statements
    // ======================================

    fn parse_compound(&mut self) -> Result<CompoundStmt> {
        self.expect(TokenKind::LBrace, "to open a block")?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                let line = self.previous().line;
                return self.fail("unterminated block, expected '}'", line);
            }
            stmts.push(self.parse_stmt()?);
        }
        self.advance();
        Ok(CompoundStmt { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let token = self.peek(0);
        match token.kind {
            TokenKind::Return => {
                self.advance();
                let value = self.parse_expr(ExprContext::Statement)?;
                Ok(Stmt::Return(ReturnStmt {
                    value,
                    line: token.line,
                }))
            }
            TokenKind::Let => {
                let (name, ty, initializer, line) = self.parse_binding()?;
                Ok(Stmt::LocalDecl(LocalDecl {
                    name,
                    ty,
                    initializer,
                    line,
                }))
            }
            TokenKind::Ident => match self.peek(1).kind {
                TokenKind::LParen => {
                    let call = self.parse_call()?;
                    self.expect(TokenKind::Semicolon, "after the call")?;
                    Ok(Stmt::Call(call))
                }
                TokenKind::Equals => self.fail(
                    format!("assignment to '{}' is not implemented", token.lexeme),
                    token.line,
                ),
                _ => self.fail(
                    format!("unexpected statement starting with '{}'", token.lexeme),
                    token.line,
                ),
            },
            TokenKind::LBrace => Ok(Stmt::Compound(self.parse_compound()?)),
            _ => self.fail(
                format!("unexpected statement starting with {}", describe(token)),
                token.line,
            ),
        }
    }

    // ======================================
    // Expressions
    // ======================================

    /// `NAME ( ARGS )`; the closing `)` is consumed.
    fn parse_call(&mut self) -> Result<Call> {
        let name = self.expect(TokenKind::Ident, "as the callee")?;
        self.expect(TokenKind::LParen, "after the callee")?;

        let mut args = Vec::new();
        if !self.match_token(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr(ExprContext::Argument)?);
                if self.match_token(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, "after the call arguments")?;
                break;
            }
        }

        Ok(Call {
            callee: name.lexeme.clone(),
            args,
            line: name.line,
        })
    }

    /// Shunting-yard over two stacks local to this invocation, so call
    /// arguments can recurse into it freely.
    fn parse_expr(&mut self, context: ExprContext) -> Result<Expr> {
        let mut operands: Vec<Expr> = Vec::new();
        let mut operators: Vec<Pending> = Vec::new();
        let mut open_parens = 0usize;
        let start_line = self.peek(0).line;

        loop {
            let token = self.peek(0);
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Semicolon if context == ExprContext::Statement => break,
                TokenKind::Comma if context == ExprContext::Argument => break,
                TokenKind::RParen if context == ExprContext::Argument && open_parens == 0 => {
                    break;
                }
                TokenKind::IntLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral => {
                    self.advance();
                    let ty = token.literal_type.unwrap_or(match token.kind {
                        TokenKind::IntLiteral => PrimitiveType::I32,
                        TokenKind::FloatLiteral => PrimitiveType::F64,
                        _ => PrimitiveType::Str,
                    });
                    operands.push(Expr::literal(ty, token.lexeme.clone()));
                }
                TokenKind::Ident => {
                    if self.peek(1).is(TokenKind::LParen) {
                        operands.push(Expr::Call(self.parse_call()?));
                    } else {
                        self.advance();
                        operands.push(Expr::ident(token.lexeme.clone()));
                    }
                }
                TokenKind::LParen => {
                    self.advance();
                    operators.push(Pending::Paren(token.line));
                    open_parens += 1;
                }
                TokenKind::RParen => {
                    self.advance();
                    loop {
                        match operators.pop() {
                            Some(Pending::Paren(_)) => break,
                            Some(Pending::Binary(op, line)) => {
                                self.reduce(&mut operands, op, line)?
                            }
                            None => return self.fail("unmatched parenthesis ')'", token.line),
                        }
                    }
                    open_parens = open_parens.saturating_sub(1);
                }
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent => {
                    self.advance();
                    let incoming = binary_operator(token.kind);
                    while let Some(&Pending::Binary(top, line)) = operators.last() {
                        let reduce_first = incoming.precedence() < top.precedence()
                            || (incoming.precedence() == top.precedence()
                                && incoming.is_left_associative());
                        if !reduce_first {
                            break;
                        }
                        operators.pop();
                        self.reduce(&mut operands, top, line)?;
                    }
                    operators.push(Pending::Binary(incoming, token.line));
                }
                _ => {
                    return self.fail(
                        format!("unexpected {} in expression", describe(token)),
                        token.line,
                    );
                }
            }
        }

        while let Some(pending) = operators.pop() {
            match pending {
                Pending::Binary(op, line) => self.reduce(&mut operands, op, line)?,
                Pending::Paren(line) => return self.fail("unmatched parenthesis '('", line),
            }
        }

        let expr = match operands.len() {
            1 => operands.pop(),
            _ => None,
        };
        let Some(expr) = expr else {
            return if operands.is_empty() {
                self.fail("expected an expression", start_line)
            } else {
                self.fail("mismatched operands and operators", start_line)
            };
        };

        if context == ExprContext::Statement {
            self.expect(TokenKind::Semicolon, "after the expression")?;
        }
        Ok(expr)
    }

    /// Pop two operands (right first) and push the combined node.
    fn reduce(&mut self, operands: &mut Vec<Expr>, op: ArithmeticOperator, line: u64) -> Result<()> {
        let (Some(rhs), Some(lhs)) = (operands.pop(), operands.pop()) else {
            return self.fail(format!("insufficient operands for '{}'", op), line);
        };
        operands.push(Expr::binary(op, lhs, rhs));
        Ok(())
    }
}

fn binary_operator(kind: TokenKind) -> ArithmeticOperator {
    match kind {
        TokenKind::Plus => ArithmeticOperator::Add,
        TokenKind::Minus => ArithmeticOperator::Sub,
        TokenKind::Star => ArithmeticOperator::Mul,
        TokenKind::Slash => ArithmeticOperator::Div,
        _ => ArithmeticOperator::Mod,
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::StringLiteral => "a string literal".to_string(),
        _ => format!("'{}'", token.lexeme),
    }
}
