//! Interpreter for the preview script subset: lexer, parser, evaluator.

pub mod eval;
pub mod lexer;
pub mod parser;

use serde_json::Value as JsonValue;

use crate::error::RuleError;

/// Parses `source` and invokes its `configure` function with the given
/// parameter bag. Any lex, parse, or runtime failure comes back as a
/// [`RuleError::Script`].
pub fn run_source(source: &str, parameters: JsonValue) -> Result<JsonValue, RuleError> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse_program(&tokens)?;
    eval::run_configure(&program, parameters)
}
