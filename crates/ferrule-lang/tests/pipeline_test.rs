//! End-to-end tests: source text through lexer, parser and lowering.

use ferrule_ir::{Constant, Linkage, Type};
use ferrule_lang::{
    CollectingSink, Config, Error, LowerError, Severity, compile_file, compile_source,
    compile_tokens, tokenize,
};
use std::path::PathBuf;

const HELLO: &str = r#"
// Prints a float and returns the sum of two globals.
fn extern printf(fmt: i8*, ...) -> i32;

let base : i32 = 40;
let step : i64 = 2;

fn scale(x: f32, by: i32) -> f32 {
    return x * by;
}

fn main() -> i32 {
    let half : f32 = 1.5;
    let ratio : f32 = scale(half, 2);
    printf("ratio = %f\n", ratio);
    let total : i64 = base + step;
    return total;
}
"#;

fn compile(source: &str) -> (Result<ferrule_ir::Module, Error>, CollectingSink) {
    let mut sink = CollectingSink::new();
    let result = compile_source(source, &Config::default(), &mut sink);
    (result, sink)
}

#[test]
fn test_compile_program() {
    let (result, sink) = compile(HELLO);
    let module = result.unwrap();
    assert!(sink.diagnostics.is_empty());
    assert_eq!(module.name, "main");

    assert_eq!(
        module.find_global_by_name("base").and_then(|g| g.init),
        Some(Constant::I32(40))
    );
    let printf = module.find_function_by_name("printf").unwrap();
    assert_eq!(module.get_function(printf).linkage, Linkage::Import);
    assert!(!module.get_function(printf).is_defined());

    let scale = module.find_function_by_name("scale").unwrap();
    let sig = module.get_signature(module.get_function(scale).signature);
    assert_eq!(&*sig.params, &[Type::F32, Type::I32]);
    assert_eq!(sig.ret, Type::F32);
    assert_eq!(module.get_function(scale).linkage, Linkage::Local);

    assert_eq!(module.data.len(), 1);
    assert_eq!(module.data.values().next().unwrap().bytes, b"ratio = %f\n\0".to_vec());
    assert!(module.validate().is_ok());
}

#[test]
fn test_printed_ir() {
    let (result, _) = compile(HELLO);
    let text = result.unwrap().to_string();
    assert!(text.starts_with("; module main\n"));
    assert!(text.contains("global base: i32 = 40 (export)"));
    assert!(text.contains("import function printf(ptr, ...) -> i32\n"));
    assert!(text.contains("local function scale(f32, i32) -> f32 {"));
    assert!(text.contains("export function main() -> i32 {"));
    assert!(text.contains("int_to_float_s"));
    assert!(text.contains("float_promote"));
    assert!(text.contains("global_load base"));
}

#[test]
fn test_module_name_and_validation_toggle() {
    let config = Config {
        module_name: "demo".to_string(),
        validate: false,
    };
    let mut sink = CollectingSink::new();
    let module = compile_source("fn main() -> i32 { return 0; }", &config, &mut sink).unwrap();
    assert_eq!(module.name, "demo");
}

#[test]
fn test_first_error_stops_compilation() {
    let (result, sink) = compile("fn main() -> i32 {\n  let a : i32 = b;\n  return c;\n}");
    let err = result.unwrap_err();
    assert_eq!(
        err,
        Error::lower(LowerError::UnresolvedIdentifier("b".to_string()), 2)
    );
    assert_eq!(sink.count(Severity::Error), 1);
    assert_eq!(sink.errors().next().map(|d| d.line), Some(2));
    assert_eq!(
        err.to_string(),
        "Lowering error at line 2: use of undeclared identifier 'b'"
    );
}

#[test]
fn test_errors_from_each_stage() {
    let (result, _) = compile("fn main() -> i32 { return 1 # 2; }");
    assert!(matches!(result, Err(Error::Lexical { .. })));

    let (result, _) = compile("fn main() -> i32 { return (1; }");
    assert!(matches!(result, Err(Error::Syntax { .. })));

    let (result, _) = compile("fn main() -> i32 { return 1.5 % 2; }");
    assert!(matches!(result, Err(Error::Lower { .. })));
}

#[test]
fn test_compile_from_tokens() {
    let mut sink = CollectingSink::new();
    let tokens = tokenize("let x : i32 = 5;", &mut sink).unwrap();
    let module = compile_tokens(&tokens, &Config::default(), &mut sink).unwrap();
    assert_eq!(module.globals.len(), 1);
    assert!(module.functions.is_empty());
}

#[test]
fn test_string_literal_deduplicated() {
    let (result, _) = compile(
        r#"
        fn extern puts(s: i8*) -> i32;
        fn main() -> i32 {
            puts("same");
            puts("same");
            puts("other");
            return 0;
        }
        "#,
    );
    assert_eq!(result.unwrap().data.len(), 2);
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ferrule-{}-{}", std::process::id(), name))
}

#[test]
fn test_compile_file() {
    let path = temp_path("hello.fr");
    std::fs::write(&path, HELLO).unwrap();
    let mut sink = CollectingSink::new();
    let result = compile_file(&path, &Config::default(), &mut sink);
    std::fs::remove_file(&path).unwrap();

    let module = result.unwrap();
    assert!(module.find_function_by_name("main").is_some());
    assert!(sink.diagnostics.is_empty());
}

#[test]
fn test_missing_file_is_io_error() {
    let path = temp_path("missing.fr");
    let mut sink = CollectingSink::new();
    let err = compile_file(&path, &Config::default(), &mut sink).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert_eq!(err.line(), 0);
    assert_eq!(sink.count(Severity::Error), 1);
    let reported = sink.errors().next().unwrap();
    assert!(reported.message.starts_with("Failed to read "));
    assert!(reported.message.contains("missing.fr"));
}
