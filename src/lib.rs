pub mod ast;
pub mod config;
pub mod functions;
pub mod fuzz_helper;
pub mod lex;
pub mod parser;
pub mod to_spel;


pub use parser::parse;
pub use to_spel::{OperatorMap, OperatorTag, PrinterConfig, render, render_with};

/// Parses [input] and renders it with [config] in one step.
pub fn convert(input: &str, config: &PrinterConfig) -> Result<String, parser::Error> {
    let ast = parse(input)?;
    Ok(render_with(&ast, config))
}
