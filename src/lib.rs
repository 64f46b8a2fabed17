//! Ferrule: a small C-like language lowered to `ferrule_ir`.

pub use ferrule_ir as ir;
pub use ferrule_lang as lang;

pub use lang::{Config, Error, Result, compile_file, compile_source, read_source};
