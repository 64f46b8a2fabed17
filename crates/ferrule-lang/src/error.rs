//! Error handling for the ferrule front end

use crate::ast::ArithmeticOperator;
use crate::types::PrimitiveType;
use std::fmt;

/// Result type alias for the front end
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for the front end
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// I/O error
    Io(String),
    /// Lexical error
    Lexical { message: String, line: u64 },
    /// Syntax error
    Syntax { message: String, line: u64 },
    /// Lowering error
    Lower { kind: LowerError, line: u64 },
}

impl Error {
    /// Create an I/O error
    pub fn io_error(message: impl Into<String>) -> Self {
        Error::Io(message.into())
    }

    /// Create a lexical error
    pub fn lexical(message: impl Into<String>, line: u64) -> Self {
        Error::Lexical {
            message: message.into(),
            line,
        }
    }

    /// Create a syntax error
    pub fn syntax(message: impl Into<String>, line: u64) -> Self {
        Error::Syntax {
            message: message.into(),
            line,
        }
    }

    /// Create a lowering error
    pub fn lower(kind: LowerError, line: u64) -> Self {
        Error::Lower { kind, line }
    }

    /// Get the line number where the error occurred
    pub fn line(&self) -> u64 {
        match self {
            Error::Io(_) => 0,
            Error::Lexical { line, .. } => *line,
            Error::Syntax { line, .. } => *line,
            Error::Lower { line, .. } => *line,
        }
    }

    /// The message without its location prefix, as handed to a diagnostic sink.
    pub fn message(&self) -> String {
        match self {
            Error::Io(msg) => msg.clone(),
            Error::Lexical { message, .. } | Error::Syntax { message, .. } => message.clone(),
            Error::Lower { kind, .. } => kind.to_string(),
        }
    }

    /// The lowering failure, if this is one.
    pub fn lower_kind(&self) -> Option<&LowerError> {
        match self {
            Error::Lower { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "I/O error: {}", msg),
            Error::Lexical { message, line } => {
                write!(f, "Lexical error at line {}: {}", line, message)
            }
            Error::Syntax { message, line } => {
                write!(f, "Syntax error at line {}: {}", line, message)
            }
            Error::Lower { kind, line } => {
                write!(f, "Lowering error at line {}: {}", line, kind)
            }
        }
    }
}

impl std::error::Error for Error {}

/// Reasons lowering an AST into IR can fail.
#[derive(Debug, Clone, PartialEq)]
pub enum LowerError {
    UnresolvedIdentifier(String),
    UnresolvedCallee(String),
    /// Global initializers must be integer literals
    UnsupportedGlobalInitializer(String),
    UnsupportedCast {
        from: PrimitiveType,
        to: PrimitiveType,
    },
    UnmappedType(PrimitiveType),
    Redeclaration(String),
    Redefinition(String),
    ConflictingDeclaration(String),
    InvalidLiteral {
        ty: PrimitiveType,
        text: String,
    },
    UnsupportedOperator {
        op: ArithmeticOperator,
        ty: PrimitiveType,
    },
    /// A void value was used where data is required
    VoidValue(String),
    ArgumentCount {
        callee: String,
        expected: usize,
        found: usize,
        variadic: bool,
    },
    ArgumentType {
        callee: String,
        index: usize,
        expected: PrimitiveType,
        found: PrimitiveType,
    },
    NestedBlock,
    MissingReturn(String),
    UnreachableCode,
    InvalidIr(String),
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::UnresolvedIdentifier(name) => {
                write!(f, "use of undeclared identifier '{}'", name)
            }
            LowerError::UnresolvedCallee(name) => {
                write!(f, "call to undeclared function '{}'", name)
            }
            LowerError::UnsupportedGlobalInitializer(name) => write!(
                f,
                "global '{}' must be initialized with an integer literal",
                name
            ),
            LowerError::UnsupportedCast { from, to } => {
                write!(f, "cannot convert {} to {}", from, to)
            }
            LowerError::UnmappedType(ty) => write!(f, "type {} has no IR representation", ty),
            LowerError::Redeclaration(name) => {
                write!(f, "identifier '{}' has been declared twice", name)
            }
            LowerError::Redefinition(name) => {
                write!(f, "function '{}' is defined more than once", name)
            }
            LowerError::ConflictingDeclaration(name) => write!(
                f,
                "function '{}' is redeclared with a different signature",
                name
            ),
            LowerError::InvalidLiteral { ty, text } => {
                write!(f, "'{}' is not a valid {} literal", text, ty)
            }
            LowerError::UnsupportedOperator { op, ty } => {
                write!(f, "operator '{}' is not supported on {} operands", op, ty)
            }
            LowerError::VoidValue(what) => write!(f, "{} cannot have type void", what),
            LowerError::ArgumentCount {
                callee,
                expected,
                found,
                variadic,
            } => {
                let at_least = if *variadic { "at least " } else { "" };
                write!(
                    f,
                    "function '{}' expects {}{} arguments, found {}",
                    callee, at_least, expected, found
                )
            }
            LowerError::ArgumentType {
                callee,
                index,
                expected,
                found,
            } => write!(
                f,
                "argument {} of '{}' has type {}, expected {}",
                index + 1,
                callee,
                found,
                expected
            ),
            LowerError::NestedBlock => write!(f, "nested blocks are not supported"),
            LowerError::MissingReturn(name) => {
                write!(f, "function '{}' does not end with a return", name)
            }
            LowerError::UnreachableCode => write!(f, "statement after return is unreachable"),
            LowerError::InvalidIr(msg) => write!(f, "generated IR is invalid: {}", msg),
        }
    }
}
