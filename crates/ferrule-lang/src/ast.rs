//! Abstract Syntax Tree
//!
//! Owned trees built once by the parser and only read afterwards.

use crate::types::PrimitiveType;
use std::fmt;

/// A whole compilation unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub globals: Vec<GlobalDecl>,
    pub functions: Vec<FunctionDecl>,
}

/// `let NAME : TYPE = EXPR ;` at the top level
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub name: String,
    pub ty: PrimitiveType,
    pub initializer: Expr,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub is_external: bool,
    pub params: Vec<ParamDecl>,
    pub return_type: PrimitiveType,
    /// `None` for a prototype
    pub body: Option<CompoundStmt>,
    pub line: u64,
}

impl FunctionDecl {
    /// `main` and `extern` functions are visible outside the module.
    pub fn has_external_linkage(&self) -> bool {
        self.is_external || self.name == "main"
    }

    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.is_variadic)
    }

    /// Parameters with a name and type, in order.
    pub fn fixed_params(&self) -> impl Iterator<Item = &ParamDecl> {
        self.params.iter().filter(|p| !p.is_variadic)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: PrimitiveType,
    pub is_variadic: bool,
}

impl ParamDecl {
    pub fn named(name: impl Into<String>, ty: PrimitiveType) -> Self {
        ParamDecl {
            name: name.into(),
            ty,
            is_variadic: false,
        }
    }

    pub fn variadic() -> Self {
        ParamDecl {
            name: String::new(),
            ty: PrimitiveType::Invalid,
            is_variadic: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundStmt {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    LocalDecl(LocalDecl),
    Return(ReturnStmt),
    Call(Call),
    Compound(CompoundStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDecl {
    pub name: String,
    pub ty: PrimitiveType,
    pub initializer: Expr,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Expr,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Identifier(Identifier),
    BinaryOp(BinaryOp),
    Call(Call),
}

impl Expr {
    pub fn literal(ty: PrimitiveType, text: impl Into<String>) -> Self {
        Expr::Literal(Literal {
            ty,
            text: text.into(),
        })
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Identifier(Identifier { name: name.into() })
    }

    pub fn binary(op: ArithmeticOperator, lhs: Expr, rhs: Expr) -> Self {
        Expr::BinaryOp(BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }
}

/// Literal text is kept verbatim; numeric parsing happens during lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub ty: PrimitiveType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub op: ArithmeticOperator,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithmeticOperator {
    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            ArithmeticOperator::Add | ArithmeticOperator::Sub => 12,
            ArithmeticOperator::Mul | ArithmeticOperator::Div | ArithmeticOperator::Mod => 13,
        }
    }

    pub fn is_left_associative(self) -> bool {
        true
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Sub => "-",
            ArithmeticOperator::Mul => "*",
            ArithmeticOperator::Div => "/",
            ArithmeticOperator::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// A call, either as a statement or inside an expression
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: String,
    pub args: Vec<Expr>,
    pub line: u64,
}
