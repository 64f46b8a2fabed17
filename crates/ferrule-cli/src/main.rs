use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use colored::*;
use ferrule_lang::{Config, DiagnosticSink, LogSink};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source file to compile
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Where to write the IR (defaults to the input with a .fir extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Artifact printed to stdout
    #[arg(long, value_enum, default_value_t = Emit::Ir)]
    emit: Emit,

    /// Skip IR validation after lowering
    #[arg(long)]
    no_validate: bool,

    /// Name recorded on the module (defaults to the input file stem)
    #[arg(long)]
    module_name: Option<String>,

    /// Most verbose log level shown on stderr
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Ir,
}

/// Prints log records to stderr with a colored level tag.
struct Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "[ERROR]".red().bold(),
            Level::Warn => "[WARN]".yellow().bold(),
            Level::Info => "[INFO]".blue().bold(),
            Level::Debug => "[DEBUG]".cyan(),
            Level::Trace => "[TRACE]".dimmed(),
        };
        eprintln!("{} {}", tag, record.args());
    }

    fn flush(&self) {}
}

static LOGGER: Logger = Logger;

/// Produce the requested artifact. Compile errors reach the sink and nowhere
/// else.
fn render(
    input: &Path,
    emit: Emit,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> ferrule_lang::Result<String> {
    if emit == Emit::Ir {
        return ferrule_lang::compile_file(input, config, sink).map(|module| module.to_string());
    }

    let source = ferrule_lang::read_source(input, sink)?;
    let tokens = ferrule_lang::tokenize(&source, sink)?;
    if emit == Emit::Tokens {
        return Ok(tokens
            .iter()
            .map(|token| {
                format!("{:>4}  {:<14} {:?}\n", token.line, token.kind.to_string(), token.lexeme)
            })
            .collect());
    }

    let program = ferrule_lang::parse(&tokens, sink)?;
    Ok(format!("{:#?}\n", program))
}

fn main() -> Result<()> {
    let args = Args::parse();
    log::set_logger(&LOGGER).map_err(|e| anyhow!("failed to install logger: {}", e))?;
    log::set_max_level(args.log_level.into());

    let module_name = args.module_name.clone().unwrap_or_else(|| {
        args.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| Config::default().module_name)
    });
    let config = Config {
        module_name,
        validate: !args.no_validate,
    };

    let Ok(text) = render(&args.input, args.emit, &config, &mut LogSink) else {
        std::process::exit(1);
    };
    print!("{}", text);
    if args.emit != Emit::Ir {
        return Ok(());
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("fir"));
    fs::write(&output, &text).with_context(|| format!("failed to write {}", output.display()))?;
    log::info!("IR saved to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_lang::{CollectingSink, Error, Severity};

    fn source_file(name: &str, source: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ferrulec-{}-{}", std::process::id(), name));
        fs::write(&path, source).unwrap();
        path
    }

    fn render_file(path: &Path, emit: Emit) -> (ferrule_lang::Result<String>, CollectingSink) {
        let mut sink = CollectingSink::new();
        let result = render(path, emit, &Config::default(), &mut sink);
        (result, sink)
    }

    #[test]
    fn test_compile_error_reported_once() {
        let path = source_file("bad.fr", "fn main() -> i32 { return 1 + ; }");
        let (result, sink) = render_file(&path, Emit::Ir);
        fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(Error::Syntax { .. })));
        assert_eq!(sink.diagnostics.len(), 1);
        assert_eq!(sink.diagnostics[0].severity, Severity::Error);
        assert_eq!(sink.diagnostics[0].message, "insufficient operands for '+'");
    }

    #[test]
    fn test_missing_input_reported_once() {
        let path = std::env::temp_dir().join("ferrulec-does-not-exist.fr");
        for emit in [Emit::Tokens, Emit::Ast, Emit::Ir] {
            let (result, sink) = render_file(&path, emit);
            assert!(matches!(result, Err(Error::Io(_))));
            assert_eq!(sink.count(Severity::Error), 1);
        }
    }

    #[test]
    fn test_render_artifacts() {
        let path = source_file("ok.fr", "fn main() -> i32 { return 0; }");
        let (ir, _) = render_file(&path, Emit::Ir);
        let (tokens, _) = render_file(&path, Emit::Tokens);
        let (ast, sink) = render_file(&path, Emit::Ast);
        fs::remove_file(&path).unwrap();

        assert!(ir.unwrap().contains("export function main() -> i32 {"));
        assert!(tokens.unwrap().starts_with("   1  "));
        assert!(ast.unwrap().contains("main"));
        assert!(sink.diagnostics.is_empty());
    }
}
