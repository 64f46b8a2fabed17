//! Ferrule language front end
//!
//! Lexer, parser and lowering of the ferrule language into `ferrule_ir`.
//! Diagnostics go through a [`DiagnosticSink`]; [`LogSink`] forwards them to
//! the `log` facade.

pub mod ast;
pub mod codegen;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod types;

use std::path::Path;

pub use ast::*;
pub use codegen::{Generator, TypeTable, priority};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, LogSink, Severity};
pub use error::{Error, LowerError, Result};
pub use ferrule_ir::Module;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};
pub use types::PrimitiveType;

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name recorded on the produced module
    pub module_name: String,
    /// Run the IR validator after lowering
    pub validate: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            module_name: "main".to_string(),
            validate: true,
        }
    }
}

/// Tokenize source text
pub fn tokenize(source: &str, sink: &mut dyn DiagnosticSink) -> Result<Vec<Token>> {
    Lexer::new(source).tokenize(sink)
}

/// Parse a token stream ending with `Eof`
pub fn parse(tokens: &[Token], sink: &mut dyn DiagnosticSink) -> Result<Program> {
    Parser::new(tokens, sink).parse_program()
}

/// Lower a parsed program into an IR module
pub fn lower(program: &Program, config: &Config, sink: &mut dyn DiagnosticSink) -> Result<Module> {
    Generator::new(&config.module_name, sink)
        .with_validation(config.validate)
        .lower(program)
}

/// Parse and lower a token stream
pub fn compile_tokens(
    tokens: &[Token],
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<Module> {
    let program = parse(tokens, sink)?;
    lower(&program, config, sink)
}

/// Run the whole pipeline over source text
pub fn compile_source(
    source: &str,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<Module> {
    let tokens = tokenize(source, sink)?;
    log::debug!("{} tokens", tokens.len());
    compile_tokens(&tokens, config, sink)
}

/// Read a source file. A failed read is reported to the sink like any other
/// first error.
pub fn read_source(path: &Path, sink: &mut dyn DiagnosticSink) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        let err = Error::io_error(format!("Failed to read {}: {}", path.display(), e));
        sink.report(Severity::Error, &err.message(), err.line());
        err
    })
}

/// Run the whole pipeline over a source file
pub fn compile_file(path: &Path, config: &Config, sink: &mut dyn DiagnosticSink) -> Result<Module> {
    let source = read_source(path, sink)?;
    compile_source(&source, config, sink)
}
