//! Code snippets parsed into the shared arena.
//!
//! Synthesized nodes (wrapper imports, type assertions, the legacy `exports`
//! function) are written as source text and parsed once, instead of being
//! assembled node by node.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;

pub(crate) fn module_source_type(typescript: bool) -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(typescript)
}

fn describe_errors(errors: &[oxc_diagnostics::OxcDiagnostic]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parse top-level statements. The snippet text is copied into the arena.
pub(crate) fn statements<'a>(
    allocator: &'a Allocator,
    code: &str,
    typescript: bool,
) -> Result<oxc_allocator::Vec<'a, Statement<'a>>, String> {
    let code: &'a str = allocator.alloc_str(code);
    let ret = Parser::new(allocator, code, module_source_type(typescript)).parse();

    if ret.panicked || !ret.errors.is_empty() {
        return Err(describe_errors(&ret.errors));
    }

    Ok(ret.program.body)
}

/// Parse a single top-level statement.
pub(crate) fn statement<'a>(
    allocator: &'a Allocator,
    code: &str,
    typescript: bool,
) -> Result<Statement<'a>, String> {
    let mut body = statements(allocator, code, typescript)?;
    if body.len() != 1 {
        return Err(format!("expected one statement, found {}", body.len()));
    }
    body.pop()
        .ok_or_else(|| "expected one statement, found none".to_string())
}

/// Parse a single expression.
pub(crate) fn expression<'a>(
    allocator: &'a Allocator,
    code: &str,
    typescript: bool,
) -> Result<Expression<'a>, String> {
    let code: &'a str = allocator.alloc_str(code);
    Parser::new(allocator, code, module_source_type(typescript))
        .parse_expression()
        .map_err(|errors| describe_errors(&errors))
}
